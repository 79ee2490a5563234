//! Session-scoped string storage.
//!
//! The tour keeps exactly one record here between page loads: the
//! continuation intent written before a cross-page hand-off.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::to_writer_pretty;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store io error: {0}")]
    Io(#[from] io::Error),
    #[error("session store file is corrupt: {0}")]
    Corrupt(String),
}

/// String key-value storage scoped to one browsing session.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Removes the key, returning the value it held.
    fn remove(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Reads and deletes in one step.
    fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.remove(key)
    }
}

/// Process-local store.
#[derive(Default)]
pub struct InMemorySessionStore {
    entries: DashMap<String, String>,
}

impl InMemorySessionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.remove(key).map(|(_, value)| value))
    }
}

/// Store persisted as a JSON object on disk.
///
/// Lets separate harness invocations share a session the way page loads do.
/// Every mutation rewrites the whole file under the lock, through a temp
/// file renamed over the old one. Memory only changes once the write landed.
pub struct FileSessionStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileSessionStore {
    /// Opens the store, starting empty when the file does not exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|err| StoreError::Corrupt(format!("{}: {err}", path.display())))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        debug!(path = %path.display(), keys = entries.len(), "session store opened");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("tmp")
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp = self.temp_path();
        let mut writer = BufWriter::new(File::create(&temp)?);
        to_writer_pretty(&mut writer, entries)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }

    fn commit(
        &self,
        entries: &mut BTreeMap<String, String>,
        next: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        if let Err(err) = self.flush(&next) {
            warn!(path = %self.path.display(), "session store flush failed: {err}");
            return Err(err);
        }
        *entries = next;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        next.insert(key.to_string(), value);
        self.commit(&mut entries, next)
    }

    fn remove(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock();
        if !entries.contains_key(key) {
            return Ok(None);
        }
        let mut next = entries.clone();
        let removed = next.remove(key);
        self.commit(&mut entries, next)?;
        Ok(removed)
    }
}
