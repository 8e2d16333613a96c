use std::fmt::Display;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use redb::{Database, ReadableTable, TableDefinition};

use crate::error::FaceIdError;

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("facecv");

/// Key under which [`RedbSnapshotStore`] keeps its record.
pub const DEFAULT_KEY: &str = "face_db";

/// When an [`IdentityStore`](crate::IdentityStore) writes its snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistPolicy {
    /// Write after this many mutations; 0 defers every write to an explicit
    /// flush.
    pub flush_every: usize,
}

impl Default for PersistPolicy {
    fn default() -> Self {
        Self { flush_every: 1 }
    }
}

/// Holds the single encoded record of one store instance.
///
/// `save` must replace the previous record atomically: a reader sees
/// either the old record or the new one, never a mix.
pub trait SnapshotStore: Send {
    /// Returns the stored record, or `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<Vec<u8>>, FaceIdError>;

    /// Replaces the stored record.
    fn save(&mut self, record: &[u8]) -> Result<(), FaceIdError>;
}

fn storage_err(e: impl Display) -> FaceIdError {
    FaceIdError::PersistenceFailure(e.to_string())
}

/// In-memory [`SnapshotStore`]. Clones share the same record, so a test can
/// keep a clone to inspect what the store wrote.
#[derive(Clone, Default)]
pub struct MemorySnapshotStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    record: Option<Vec<u8>>,
    saves: usize,
    fail_writes: bool,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `record`.
    pub fn with_record(record: Vec<u8>) -> Self {
        let store = Self::new();
        store.inner.lock().record = Some(record);
        store
    }

    pub fn record(&self) -> Option<Vec<u8>> {
        self.inner.lock().record.clone()
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        self.inner.lock().saves
    }

    /// Makes every subsequent save fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<Vec<u8>>, FaceIdError> {
        Ok(self.inner.lock().record.clone())
    }

    fn save(&mut self, record: &[u8]) -> Result<(), FaceIdError> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(storage_err("memory store: writes disabled"));
        }
        inner.record = Some(record.to_vec());
        inner.saves += 1;
        Ok(())
    }
}

/// [`SnapshotStore`] backed by one file. Saves write a sibling temp file and
/// rename it over the target.
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<Vec<u8>>, FaceIdError> {
        match fs::read(&self.path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_err(format!("read {}: {e}", self.path.display()))),
        }
    }

    fn save(&mut self, record: &[u8]) -> Result<(), FaceIdError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .map_err(|e| storage_err(format!("create {}: {e}", dir.display())))?;
        }
        let tmp = self.temp_path();
        let write = || -> std::io::Result<()> {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(record)?;
            f.sync_all()?;
            fs::rename(&tmp, &self.path)
        };
        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            storage_err(format!("write {}: {e}", self.path.display()))
        })
    }
}

/// [`SnapshotStore`] backed by a redb database. Each save is one write
/// transaction on a single key.
pub struct RedbSnapshotStore {
    db: Database,
    key: String,
}

impl RedbSnapshotStore {
    /// Open or create a database at `path`, using [`DEFAULT_KEY`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FaceIdError> {
        Self::open_with_key(path, DEFAULT_KEY)
    }

    pub fn open_with_key<P: AsRef<Path>>(path: P, key: &str) -> Result<Self, FaceIdError> {
        let db = Database::create(path).map_err(storage_err)?;

        // Create the table so reads on a fresh database succeed.
        let tx = db.begin_write().map_err(storage_err)?;
        {
            let _ = tx.open_table(TABLE).map_err(storage_err)?;
        }
        tx.commit().map_err(storage_err)?;

        Ok(Self {
            db,
            key: key.to_string(),
        })
    }
}

impl SnapshotStore for RedbSnapshotStore {
    fn load(&self) -> Result<Option<Vec<u8>>, FaceIdError> {
        let tx = self.db.begin_read().map_err(storage_err)?;
        let table = tx.open_table(TABLE).map_err(storage_err)?;
        let value = table.get(self.key.as_str()).map_err(storage_err)?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn save(&mut self, record: &[u8]) -> Result<(), FaceIdError> {
        let tx = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = tx.open_table(TABLE).map_err(storage_err)?;
            table
                .insert(self.key.as_str(), record)
                .map_err(storage_err)?;
        }
        tx.commit().map_err(storage_err)?;
        Ok(())
    }
}
