//! Persistent key/value storage.
//!
//! The portal keeps a handful of string values between runs: auth tokens,
//! the signed-in user, the pending `PayPal` donation and today's cached
//! liturgical color. [`Storage`] is the port every service writes through;
//! [`FileStorage`] persists to a JSON file and [`MemoryStorage`] backs tests.
//!
//! Writes are not transactional and two processes sharing one file are not
//! coordinated: the last writer wins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::debug;

/// Well-known storage keys.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "accessToken";
    /// Legacy alias of [`ACCESS_TOKEN`], still read by older pages.
    pub const TOKEN: &str = "token";
    pub const USER: &str = "user";
    pub const PARISHIONER_ID: &str = "parishionerId";
    pub const PENDING_DONATION_ID: &str = "pendingDonationId";
    pub const LITURGICAL_COLOR: &str = "liturgicalColor";
    pub const LITURGICAL_COLOR_DATE: &str = "liturgicalColorDate";

    /// Every key that belongs to the signed-in session.
    pub const AUTH: [&str; 4] = [ACCESS_TOKEN, TOKEN, USER, PARISHIONER_ID];
}

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("storage file {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// String key/value store shared by all services.
pub trait Storage: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot persist the change.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot persist the change.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Delete several values.
    ///
    /// # Errors
    ///
    /// Returns the first `StorageError` encountered.
    fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process storage, lost when the value is dropped.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored value.
    #[must_use]
    pub fn entries(&self) -> BTreeMap<String, String> {
        lock(&self.values).clone()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock(&self.values).insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.values).remove(key);
        Ok(())
    }
}

/// Storage persisted as a flat JSON object, rewritten on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the storage file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|source| StorageError::Corrupt {
                    path: path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        debug!(path = %path.display(), entries = values.len(), "Opened storage file");

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(values).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let staging = self.staging_path();
        std::fs::write(&staging, json)
            .and_then(|()| std::fs::rename(&staging, &self.path))
            .map_err(|source| StorageError::Io {
                path: self.path.clone(),
                source,
            })
    }

    /// Sibling file each write is staged in before being renamed over `path`.
    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = lock(&self.values);
        values.insert(key.to_owned(), value.to_owned());
        self.persist(&values)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = lock(&self.values);
        if values.remove(key).is_some() {
            self.persist(&values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("parish-storage-{}-{name}.json", std::process::id()))
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get(keys::TOKEN), None);

        storage.set(keys::TOKEN, "abc").unwrap();
        assert_eq!(storage.get(keys::TOKEN).as_deref(), Some("abc"));

        storage.remove(keys::TOKEN).unwrap();
        storage.remove(keys::TOKEN).unwrap();
        assert_eq!(storage.get(keys::TOKEN), None);
    }

    #[test]
    fn test_remove_all_clears_auth_keys() {
        let storage = MemoryStorage::new();
        for key in keys::AUTH {
            storage.set(key, "x").unwrap();
        }
        storage.set(keys::PENDING_DONATION_ID, "d1").unwrap();

        storage.remove_all(&keys::AUTH).unwrap();

        assert_eq!(storage.entries().len(), 1);
        assert_eq!(storage.get(keys::PENDING_DONATION_ID).as_deref(), Some("d1"));
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let path = temp_path("reopen");
        let _ = std::fs::remove_file(&path);

        let storage = FileStorage::open(&path).unwrap();
        storage.set(keys::LITURGICAL_COLOR_DATE, "2026-10-16").unwrap();
        storage.set(keys::PENDING_DONATION_ID, "don_1").unwrap();
        storage.remove(keys::PENDING_DONATION_ID).unwrap();
        drop(storage);

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(
            reopened.get(keys::LITURGICAL_COLOR_DATE).as_deref(),
            Some("2026-10-16")
        );
        assert_eq!(reopened.get(keys::PENDING_DONATION_ID), None);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_file_storage_ignores_interrupted_write() {
        let path = temp_path("staged");
        let _ = std::fs::remove_file(&path);
        let storage = FileStorage::open(&path).unwrap();
        storage.set(keys::ACCESS_TOKEN, "t-1").unwrap();
        let staging = storage.staging_path();
        assert!(!staging.exists());

        // A write cut off before its rename leaves the committed file intact.
        std::fs::write(&staging, "{\"accessToken\": \"t-").unwrap();
        drop(storage);

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get(keys::ACCESS_TOKEN).as_deref(), Some("t-1"));

        reopened.set(keys::ACCESS_TOKEN, "t-2").unwrap();
        assert!(!staging.exists());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_file_storage_rejects_corrupt_file() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            FileStorage::open(&path),
            Err(StorageError::Corrupt { .. })
        ));

        std::fs::remove_file(&path).unwrap();
    }
}
