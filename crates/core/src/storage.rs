//! Local key-value persistence.
//!
//! [`KeyValueStore`] is the storage port the garment catalog writes user
//! uploads through. [`FileStore`] keeps one JSON file per key in the user's
//! data directory (e.g. `~/.local/share/virtual-mirror/` on Linux);
//! [`MemoryStore`] keeps everything in memory and can simulate a full disk.

use crate::error::{AppError, Result};
use directories::ProjectDirs;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Port for a flat string key-value store.
pub trait KeyValueStore {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Opens the store in the platform data directory.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] if no home directory can be determined.
    pub fn in_data_dir() -> Result<Self> {
        ProjectDirs::from("", "virtual-mirror", "virtual-mirror")
            .map(|dirs| Self::new(dirs.data_dir()))
            .ok_or_else(|| AppError::config("Could not determine a data directory"))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)
                .map_err(|e| AppError::storage(format!("Failed to create {}: {}", self.dir.display(), e)))?;
        }
        fs::write(self.path_for(key), value)
            .map_err(|e| AppError::storage(format!("Failed to write {}: {}", key, e)))
    }
}

/// In-memory store with an optional total size limit in bytes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses writes once keys and values exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota: Some(bytes),
        }
    }

    fn size_with(&self, key: &str, value: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum::<usize>()
            + key.len()
            + value.len()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if let Some(quota) = self.quota {
            let needed = self.size_with(key, value);
            if needed > quota {
                return Err(AppError::storage(format!(
                    "Quota exceeded: {} of {} bytes",
                    needed, quota
                )));
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_store_round_trips_and_reports_absence() {
        let tmp = TempDir::new().unwrap();
        let mut store = FileStore::new(tmp.path().join("nested"));

        assert_eq!(store.get("user_garments").unwrap(), None);
        store.set("user_garments", "[]").unwrap();
        assert_eq!(store.get("user_garments").unwrap().as_deref(), Some("[]"));
        assert!(tmp.path().join("nested/user_garments.json").exists());
    }

    #[test]
    fn memory_store_enforces_quota() {
        let mut store = MemoryStore::with_quota(10);
        store.set("k", "12345").unwrap();
        assert!(matches!(
            store.set("k", "0123456789"),
            Err(AppError::StoragePersist(_))
        ));
        assert_eq!(store.get("k").unwrap().as_deref(), Some("12345"));
    }
}
