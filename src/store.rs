use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::EntityRecord;
use crate::error::DexError;

const STORE_SCHEMA_VERSION: u32 = 1;

pub trait RecordStore: Send + Sync {
    fn find_by_identity(&self, id: u32) -> Result<Option<EntityRecord>, DexError>;

    fn find_by_name(&self, name: &str) -> Result<Option<EntityRecord>, DexError>;

    fn find_all_ordered_by_id(&self) -> Result<Vec<EntityRecord>, DexError>;

    fn save(&self, record: EntityRecord) -> Result<(), DexError>;

    /// All-or-nothing: a conflicting record leaves the store unchanged.
    fn save_all(&self, records: Vec<EntityRecord>) -> Result<(), DexError>;

    /// Inserts `record` unless its id or name is already taken, checking and
    /// inserting under a single guard.
    fn insert_new(&self, record: EntityRecord) -> Result<InsertOutcome, DexError>;

    fn sync(&self) -> Result<(), DexError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(EntityRecord),
    Existing(EntityRecord),
}

#[derive(Debug, Clone, Default)]
struct Records {
    by_id: BTreeMap<u32, EntityRecord>,
    by_name: HashMap<String, u32>,
    unsynced: usize,
}

impl Records {
    fn find_by_name(&self, name: &str) -> Option<&EntityRecord> {
        let key = name.trim().to_lowercase();
        self.by_name.get(&key).and_then(|id| self.by_id.get(id))
    }

    fn upsert(&mut self, mut record: EntityRecord) -> Result<(), DexError> {
        record.name = record.name.to_lowercase();
        if let Some(owner) = self.by_name.get(&record.name) {
            if *owner != record.id {
                return Err(DexError::StoreConflict(format!(
                    "name {} already belongs to id {owner}",
                    record.name
                )));
            }
        }
        if let Some(previous) = self.by_id.get(&record.id) {
            // A populated sprite asset never changes once written.
            if previous.has_sprite_asset() {
                record.sprite_base64 = previous.sprite_base64.clone();
            }
            if previous.name != record.name {
                self.by_name.remove(&previous.name);
            }
        }
        self.by_name.insert(record.name.clone(), record.id);
        self.by_id.insert(record.id, record);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    schema_version: u32,
    updated_at: String,
    records: Vec<EntityRecord>,
}

#[derive(Debug)]
pub struct Store {
    path: Option<Utf8PathBuf>,
    records: Mutex<Records>,
    flush_every: usize,
}

impl Store {
    pub fn open(path: &Utf8Path) -> Result<Self, DexError> {
        let mut records = Records::default();
        if path.as_std_path().exists() {
            let content = fs::read_to_string(path.as_std_path())
                .map_err(|err| DexError::Filesystem(format!("read {path}: {err}")))?;
            let file: StoreFile =
                serde_json::from_str(&content).map_err(|err| DexError::StoreCorrupt {
                    path: path.to_path_buf(),
                    message: err.to_string(),
                })?;
            if file.schema_version != STORE_SCHEMA_VERSION {
                return Err(DexError::StoreCorrupt {
                    path: path.to_path_buf(),
                    message: format!("unsupported schema version {}", file.schema_version),
                });
            }
            for record in file.records {
                let id = record.id;
                if records.by_id.contains_key(&id) {
                    return Err(DexError::StoreCorrupt {
                        path: path.to_path_buf(),
                        message: format!("duplicate id {id}"),
                    });
                }
                records.upsert(record).map_err(|err| DexError::StoreCorrupt {
                    path: path.to_path_buf(),
                    message: err.to_string(),
                })?;
            }
        }
        tracing::debug!(path = %path, records = records.by_id.len(), "opened record store");
        Ok(Self {
            path: Some(path.to_path_buf()),
            records: Mutex::new(records),
            flush_every: 1,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: Mutex::new(Records::default()),
            flush_every: 1,
        }
    }

    pub fn with_flush_every(mut self, inserts: usize) -> Self {
        self.flush_every = inserts.max(1);
        self
    }

    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> Result<usize, DexError> {
        Ok(self.lock()?.by_id.len())
    }

    pub fn is_empty(&self) -> Result<bool, DexError> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Records>, DexError> {
        self.records
            .lock()
            .map_err(|_| DexError::Filesystem("record store lock poisoned".to_string()))
    }

    fn flush(&self, records: &mut Records) -> Result<(), DexError> {
        if let Some(path) = self.path.as_deref() {
            let file = StoreFile {
                schema_version: STORE_SCHEMA_VERSION,
                updated_at: chrono::Utc::now().to_rfc3339(),
                records: records.by_id.values().cloned().collect(),
            };
            let content = serde_json::to_vec_pretty(&file)
                .map_err(|err| DexError::Filesystem(err.to_string()))?;
            write_atomic(path, &content)?;
        }
        records.unsynced = 0;
        Ok(())
    }
}

impl RecordStore for Store {
    fn find_by_identity(&self, id: u32) -> Result<Option<EntityRecord>, DexError> {
        Ok(self.lock()?.by_id.get(&id).cloned())
    }

    fn find_by_name(&self, name: &str) -> Result<Option<EntityRecord>, DexError> {
        Ok(self.lock()?.find_by_name(name).cloned())
    }

    fn find_all_ordered_by_id(&self) -> Result<Vec<EntityRecord>, DexError> {
        Ok(self.lock()?.by_id.values().cloned().collect())
    }

    fn save(&self, record: EntityRecord) -> Result<(), DexError> {
        let mut records = self.lock()?;
        records.upsert(record)?;
        self.flush(&mut records)
    }

    fn save_all(&self, batch: Vec<EntityRecord>) -> Result<(), DexError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut records = self.lock()?;
        let mut staged = records.clone();
        for record in batch {
            staged.upsert(record)?;
        }
        self.flush(&mut staged)?;
        *records = staged;
        Ok(())
    }

    fn insert_new(&self, mut record: EntityRecord) -> Result<InsertOutcome, DexError> {
        let mut records = self.lock()?;
        if let Some(existing) = records.by_id.get(&record.id) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }
        if let Some(existing) = records.find_by_name(&record.name) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }
        record.name = record.name.to_lowercase();
        records.upsert(record.clone())?;
        records.unsynced += 1;
        if records.unsynced >= self.flush_every {
            self.flush(&mut records)?;
        }
        Ok(InsertOutcome::Inserted(record))
    }

    fn sync(&self) -> Result<(), DexError> {
        let mut records = self.lock()?;
        if records.unsynced == 0 {
            return Ok(());
        }
        self.flush(&mut records)
    }
}

fn write_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), DexError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| DexError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix("pokedex-records")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| DexError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| DexError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| DexError::Filesystem(err.to_string()))?;
    Ok(())
}
