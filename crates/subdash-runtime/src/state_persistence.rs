#![forbid(unsafe_code)]

//! Key-value storage backends for persisted UI state.
//!
//! The settings manager stores one JSON blob under one key, so the contract
//! is intentionally tiny: [`StorageBackend::get`] and [`StorageBackend::set`].
//!
//! | Backend         | Durability     | Use                             |
//! |-----------------|----------------|---------------------------------|
//! | [`MemoryStorage`] | process only | tests, headless hosts, fallback |
//! | `FileStorage`   | across restarts | desktop hosts (`file-storage`) |
//!
//! # Atomic Writes
//!
//! `FileStorage` writes to a temp file and renames it over the target, so a
//! crash mid-write never leaves a truncated blob behind.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::rc::Rc;

use thiserror::Error;

/// Errors surfaced by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("storage quota exceeded writing {key}: {needed} bytes > {limit} bytes")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Named-blob storage.
pub trait StorageBackend {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Read the blob stored under `key`, or `None` when absent.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous blob.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
}

// ============================================================================
// MemoryStorage
// ============================================================================

/// In-memory storage. Clones share the same entries.
///
/// An optional per-value quota makes oversized writes fail with
/// [`StorageError::QuotaExceeded`], mirroring browser storage limits.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<HashMap<String, String>>>,
    quota_bytes: Option<usize>,
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("entries", &self.entries.borrow().len())
            .field("quota_bytes", &self.quota_bytes)
            .finish()
    }
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any single value larger than `quota_bytes`.
    #[must_use]
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Rc::default(),
            quota_bytes: Some(quota_bytes),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Raw blob for `key`, bypassing the trait.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl StorageBackend for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if let Some(limit) = self.quota_bytes
            && value.len() > limit
        {
            return Err(StorageError::QuotaExceeded {
                key: key.to_owned(),
                needed: value.len(),
                limit,
            });
        }
        self.entries
            .borrow_mut()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

// ============================================================================
// FileStorage
// ============================================================================

#[cfg(feature = "file-storage")]
pub use file::FileStorage;

#[cfg(feature = "file-storage")]
mod file {
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};

    use super::{StorageBackend, StorageResult};

    /// One `<key>.json` file per key inside a directory.
    #[derive(Debug, Clone)]
    pub struct FileStorage {
        dir: PathBuf,
    }

    impl FileStorage {
        /// Store blobs under `dir`. The directory is created on first write.
        pub fn new(dir: impl Into<PathBuf>) -> Self {
            Self { dir: dir.into() }
        }

        #[must_use]
        pub fn dir(&self) -> &Path {
            &self.dir
        }

        /// File backing `key`. Characters outside `[A-Za-z0-9._-]` become `_`.
        #[must_use]
        pub fn path_for(&self, key: &str) -> PathBuf {
            let file_name: String = key
                .chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                        c
                    } else {
                        '_'
                    }
                })
                .collect();
            self.dir.join(format!("{file_name}.json"))
        }
    }

    impl StorageBackend for FileStorage {
        fn name(&self) -> &'static str {
            "file"
        }

        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            match fs::read_to_string(self.path_for(key)) {
                Ok(contents) => Ok(Some(contents)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        }

        fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            fs::create_dir_all(&self.dir)?;
            let path = self.path_for(key);
            // Atomic write: temp file then rename
            let temp = path.with_extension("json.tmp");
            fs::write(&temp, value)?;
            fs::rename(&temp, &path)?;
            Ok(())
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_round_trip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("k").unwrap(), None);
        storage.set("k", "{\"a\":1}").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("{\"a\":1}"));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn memory_clones_share_entries() {
        let storage = MemoryStorage::new();
        let view = storage.clone();
        storage.set("k", "v").unwrap();
        assert_eq!(view.raw("k").as_deref(), Some("v"));
    }

    #[test]
    fn memory_quota_rejects_large_values() {
        let storage = MemoryStorage::with_quota(4);
        storage.set("k", "1234").unwrap();
        let err = storage.set("k", "12345").unwrap_err();
        assert!(matches!(
            err,
            StorageError::QuotaExceeded { needed: 5, limit: 4, .. }
        ));
        assert_eq!(storage.raw("k").as_deref(), Some("1234"));
    }

    #[cfg(feature = "file-storage")]
    #[test]
    fn file_round_trip_and_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));

        assert_eq!(storage.get("settings").unwrap(), None);
        storage.set("settings", "{}").unwrap();
        assert_eq!(storage.get("settings").unwrap().as_deref(), Some("{}"));
        assert!(!storage.path_for("settings").with_extension("json.tmp").exists());
    }

    #[cfg(feature = "file-storage")]
    #[test]
    fn file_key_is_sanitized() {
        let storage = FileStorage::new("/tmp/subdash");
        let path = storage.path_for("../user settings");
        assert_eq!(path.file_name().unwrap(), ".._user_settings.json");
        assert_eq!(path.parent().unwrap(), storage.dir());
    }
}
