//! Key-value stores for the breakpoint.

use crate::error::{Result, UsageError};
use fs2::FileExt;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::DEFAULT_BREAKPOINT_KEY;

/// Minimal string key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`; `None` removes the key.
    fn set_item(&self, key: &str, value: Option<&str>) -> Result<()>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: Option<&str>) -> Result<()> {
        let mut items = self.items.write();
        match value {
            Some(v) => {
                items.insert(key.to_string(), v.to_string());
            }
            None => {
                items.remove(key);
            }
        }
        Ok(())
    }
}

/// Store backed by a JSON object file.
///
/// Reads take a shared lock and writes an exclusive one, so several
/// processes can point at the same file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_items(file: &mut File) -> Result<BTreeMap<String, String>> {
        let mut text = String::new();
        file.read_to_string(&mut text)?;
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&text)
            .map_err(|e| UsageError::Persistence(format!("corrupt store file: {}", e)))
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut file = File::open(&self.path)?;
        FileExt::lock_shared(&file)?;
        let items = Self::read_items(&mut file);
        FileExt::unlock(&file)?;

        Ok(items?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: Option<&str>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        FileExt::lock_exclusive(&file)?;

        let result = (|| -> Result<()> {
            let mut items = Self::read_items(&mut file)?;
            match value {
                Some(v) => {
                    items.insert(key.to_string(), v.to_string());
                }
                None => {
                    items.remove(key);
                }
            }
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            serde_json::to_writer_pretty(&mut file, &items)?;
            file.sync_all()?;
            Ok(())
        })();

        FileExt::unlock(&file)?;
        result
    }
}

/// The breakpoint's slot in an optional key-value store.
#[derive(Clone)]
pub struct BreakpointStore {
    backend: Option<Arc<dyn KeyValueStore>>,
    key: String,
}

impl BreakpointStore {
    pub fn new(backend: Option<Arc<dyn KeyValueStore>>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// A slot with no backing store.
    pub fn unavailable() -> Self {
        Self::new(None, DEFAULT_BREAKPOINT_KEY)
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the stored breakpoint. Empty values count as cleared.
    pub fn try_load(&self) -> Result<Option<String>> {
        let backend = self
            .backend
            .as_ref()
            .ok_or(UsageError::PersistenceUnavailable)?;
        Ok(backend.get_item(&self.key)?.filter(|p| !p.is_empty()))
    }

    /// Read the stored breakpoint, treating every failure as "none".
    pub fn load(&self) -> Option<String> {
        match self.try_load() {
            Ok(path) => path,
            Err(UsageError::PersistenceUnavailable) => None,
            Err(e) => {
                warn!(key = %self.key, error = %e, "could not read breakpoint");
                None
            }
        }
    }

    /// Persist `path`, or clear the slot with `None` or an empty string.
    /// Without a backing store this does nothing.
    pub fn save(&self, path: Option<&str>) -> Result<()> {
        let Some(backend) = &self.backend else {
            debug!(key = %self.key, "no key-value store; breakpoint not persisted");
            return Ok(());
        };
        backend.set_item(&self.key, path.filter(|p| !p.is_empty()))
    }
}
