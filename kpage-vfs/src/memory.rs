//! In-memory file system implementation

use crate::error::{VfsError, VfsResult};
use crate::path::normalize;
use crate::FileProvider;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// An in-memory file provider.
///
/// All files are stored in memory using a `BTreeMap` keyed by normalized
/// virtual path. Clones share the same storage, so a host can keep editing
/// files while a compiler holds another clone.
///
/// # Example
/// ```
/// use kpage_vfs::{FileProvider, MemoryFileSystem};
///
/// let fs = MemoryFileSystem::new();
/// fs.insert("~/pages/index.kpage", "hello");
/// assert_eq!(fs.read_file("/pages/index.kpage").unwrap(), b"hello");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    files: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryFileSystem {
    /// Create a new empty memory file system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new memory file system pre-populated with files.
    ///
    /// # Arguments
    /// * `files` - Iterator of (path, content) tuples
    pub fn with_files<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: AsRef<str>,
    {
        let fs = Self::new();
        for (path, content) in files {
            fs.insert(path.as_ref(), content);
        }
        fs
    }

    /// Add or replace a file.
    pub fn insert(&self, path: &str, content: impl Into<Vec<u8>>) {
        let key = Self::key(path);
        self.write().insert(key, content.into());
    }

    /// Remove a file, returning its previous content.
    pub fn remove(&self, path: &str) -> Option<Vec<u8>> {
        let key = Self::key(path);
        self.write().remove(&key)
    }

    /// Number of stored files.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether no file is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A writer that panicked leaves whole entries behind, never a torn one.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.files.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.files.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn key(path: &str) -> String {
        normalize(path).unwrap_or_else(|_| path.replace('\\', "/"))
    }
}

impl FileProvider for MemoryFileSystem {
    fn read_file(&self, path: &str) -> VfsResult<Vec<u8>> {
        let key = Self::key(path);
        self.read()
            .get(&key)
            .cloned()
            .ok_or(VfsError::NotFound { path: key })
    }

    fn exists(&self, path: &str) -> bool {
        self.read().contains_key(&Self::key(path))
    }
}
