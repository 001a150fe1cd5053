use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::models::{Course, Material, Task};

/// File name of the JSON store inside the data directory.
pub const STORE_FILE: &str = "rps.json";

/// Everything the tracker persists, kept as one document.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Database {
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub materials: Vec<Material>,
    /// Last identifier handed out. Identifiers are never reused.
    #[serde(default)]
    pub next_id: u64,
}

impl Database {
    /// Allocates a fresh identifier shared by all entity kinds.
    pub fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// A persistence backend with whole-document read and write.
///
/// Callers do read-modify-write per operation; there is no locking between
/// the two steps, so concurrent writers resolve as last-write-wins.
pub trait Storage {
    fn load(&self) -> Result<Database, StorageError>;
    fn save(&self, db: &Database) -> Result<(), StorageError>;
}

/// Pretty-printed JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    /// Store living at `<dir>/rps.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        JsonStorage {
            path: dir.as_ref().join(STORE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl Storage for JsonStorage {
    /// Returns an empty database when the file does not exist yet.
    fn load(&self) -> Result<Database, StorageError> {
        let s = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Database::default()),
            Err(e) => return Err(self.io_err(e)),
        };
        serde_json::from_str(&s).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes to a sibling temp file and renames it over the store.
    fn save(&self, db: &Database) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| self.io_err(e))?;
        }
        let s = serde_json::to_string_pretty(db).map_err(StorageError::Encode)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, s).map_err(|e| self.io_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        tracing::debug!(path = %self.path.display(), "store saved");
        Ok(())
    }
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    db: Mutex<Database>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> Result<Database, StorageError> {
        self.db.lock().map(|db| db.clone()).map_err(|_| StorageError::Poisoned)
    }

    fn save(&self, db: &Database) -> Result<(), StorageError> {
        let mut guard = self.db.lock().map_err(|_| StorageError::Poisoned)?;
        *guard = db.clone();
        Ok(())
    }
}
