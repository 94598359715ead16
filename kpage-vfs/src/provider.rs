//! FileProvider trait definition

use crate::error::VfsResult;
use std::sync::Arc;

/// Read-only source of markup files
///
/// Paths are virtual: forward-slash separated and rooted at `/`
/// (see [`crate::path::normalize`]). Implementations decide what a virtual
/// path maps to.
///
/// # Implementations
/// - `MemoryFileSystem`: In-memory files
/// - `NativeFileSystem`: A directory on the OS file system
/// - `LoggedFileSystem`: Tracing wrapper around another provider
pub trait FileProvider: Send + Sync {
    /// Read file contents
    ///
    /// # Arguments
    /// * `path` - Virtual file path
    ///
    /// # Returns
    /// File contents as bytes, or VfsError
    fn read_file(&self, path: &str) -> VfsResult<Vec<u8>>;

    /// Check if path exists
    fn exists(&self, path: &str) -> bool;

    /// Check if path is a file
    fn is_file(&self, path: &str) -> bool {
        self.exists(path)
    }
}

impl<T: FileProvider + ?Sized> FileProvider for Arc<T> {
    fn read_file(&self, path: &str) -> VfsResult<Vec<u8>> {
        (**self).read_file(path)
    }

    fn exists(&self, path: &str) -> bool {
        (**self).exists(path)
    }

    fn is_file(&self, path: &str) -> bool {
        (**self).is_file(path)
    }
}

impl<T: FileProvider + ?Sized> FileProvider for &T {
    fn read_file(&self, path: &str) -> VfsResult<Vec<u8>> {
        (**self).read_file(path)
    }

    fn exists(&self, path: &str) -> bool {
        (**self).exists(path)
    }

    fn is_file(&self, path: &str) -> bool {
        (**self).is_file(path)
    }
}
