use std::fs;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::domain::PRIMARY_ID_CEILING;
use crate::error::DexError;

pub const DEFAULT_CONFIG_FILE: &str = "pokedex.json";
pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2/";
pub const DEFAULT_SPRITE_BASE_URL: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub sprite_base_url: Option<String>,
    #[serde(default)]
    pub catalog_limit: Option<u32>,
    #[serde(default)]
    pub catalog_offset: Option<u32>,
    #[serde(default)]
    pub request_interval_ms: Option<u64>,
    #[serde(default)]
    pub asset_interval_ms: Option<u64>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<usize>,
    #[serde(default)]
    pub variant_id_start: Option<u32>,
    #[serde(default)]
    pub form_limit: Option<u32>,
    #[serde(default)]
    pub form_patterns: Option<Vec<String>>,
    #[serde(default)]
    pub store_path: Option<String>,
    #[serde(default)]
    pub store_flush_every: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub base_url: String,
    pub sprite_base_url: String,
    pub catalog_limit: u32,
    pub catalog_offset: u32,
    pub request_interval: Duration,
    pub asset_interval: Duration,
    pub timeout: Duration,
    pub max_retries: usize,
    pub variant_id_start: u32,
    pub form_limit: u32,
    pub form_patterns: Vec<String>,
    pub store_path: Utf8PathBuf,
    pub store_flush_every: usize,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `pokedex.json` from the working directory. A missing
    /// default file is not an error: built-in defaults apply.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, DexError> {
        let config_path = Utf8PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));

        if path.is_none() && !config_path.as_std_path().exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| DexError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| DexError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, DexError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let mut base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let catalog_limit = config.catalog_limit.unwrap_or(PRIMARY_ID_CEILING);
        if catalog_limit == 0 {
            return Err(DexError::ConfigParse(
                "catalog_limit must be greater than zero".to_string(),
            ));
        }

        let form_patterns = config
            .form_patterns
            .unwrap_or_else(default_form_patterns)
            .into_iter()
            .map(|pattern| pattern.trim().to_lowercase())
            .filter(|pattern| !pattern.is_empty())
            .collect();

        let store_path = match config.store_path {
            Some(path) => Utf8PathBuf::from(path),
            None => default_store_path()?,
        };

        Ok(ResolvedConfig {
            schema_version,
            base_url,
            sprite_base_url: config
                .sprite_base_url
                .unwrap_or_else(|| DEFAULT_SPRITE_BASE_URL.to_string()),
            catalog_limit,
            catalog_offset: config.catalog_offset.unwrap_or(0),
            request_interval: Duration::from_millis(config.request_interval_ms.unwrap_or(200)),
            asset_interval: Duration::from_millis(config.asset_interval_ms.unwrap_or(120)),
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(30)),
            max_retries: config.max_retries.unwrap_or(3),
            variant_id_start: config.variant_id_start.unwrap_or(PRIMARY_ID_CEILING + 1),
            form_limit: config.form_limit.unwrap_or(2000),
            form_patterns,
            store_path,
            store_flush_every: config.store_flush_every.unwrap_or(50).max(1),
        })
    }
}

pub fn default_form_patterns() -> Vec<String> {
    [
        "mega", "primal", "origin", "therian", "sky", "unbound", "alola", "galar", "hisui",
        "paldea",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_store_path() -> Result<Utf8PathBuf, DexError> {
    BaseDirs::new()
        .and_then(|dirs| {
            Utf8PathBuf::from_path_buf(
                dirs.data_local_dir()
                    .join("pokedex-ingest")
                    .join("records.json"),
            )
            .ok()
        })
        .ok_or_else(|| DexError::Filesystem("unable to resolve data directory".to_string()))
}
