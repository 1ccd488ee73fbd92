use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum DexError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("remote returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("failed to list catalog: {0}")]
    CatalogListing(String),

    #[error("sprite download failed for {url}: {reason}")]
    AssetDownload { url: String, reason: String },

    #[error("entity {0} is already being imported")]
    ImportInFlight(String),

    #[error("invalid entity name: {0}")]
    InvalidName(String),

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("record conflicts with stored entity: {0}")]
    StoreConflict(String),

    #[error("record store at {path} is corrupt: {message}")]
    StoreCorrupt { path: Utf8PathBuf, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl DexError {
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            DexError::Transport(_)
                | DexError::Status { .. }
                | DexError::CatalogListing(_)
                | DexError::AssetDownload { .. }
        )
    }
}
