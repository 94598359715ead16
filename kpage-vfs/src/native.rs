//! Native file system implementation

use crate::error::VfsResult;
use crate::path::normalize;
use crate::{FileProvider, VfsError};
use std::path::{Path, PathBuf};

/// A directory on the OS file system exposed as a file provider.
///
/// Virtual paths are resolved below `root`; normalization rejects any path
/// that would climb above it.
///
/// # Example
/// ```
/// use kpage_vfs::NativeFileSystem;
///
/// let fs = NativeFileSystem::new("/srv/site");
/// assert_eq!(
///     fs.physical_path("/pages/index.kpage").unwrap(),
///     std::path::Path::new("/srv/site/pages/index.kpage"),
/// );
/// ```
#[derive(Debug, Clone)]
pub struct NativeFileSystem {
    root: PathBuf,
}

impl NativeFileSystem {
    /// Create a provider rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory virtual paths are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a virtual path to the OS path it designates.
    pub fn physical_path(&self, path: &str) -> VfsResult<PathBuf> {
        let normalized = normalize(path)?;
        let mut physical = self.root.clone();
        for segment in normalized.split('/').filter(|s| !s.is_empty()) {
            physical.push(segment);
        }
        Ok(physical)
    }
}

impl FileProvider for NativeFileSystem {
    fn read_file(&self, path: &str) -> VfsResult<Vec<u8>> {
        let physical = self.physical_path(path)?;
        if physical.is_dir() {
            return Err(VfsError::InvalidPath {
                path: path.to_string(),
                reason: "is a directory".to_string(),
            });
        }
        std::fs::read(&physical).map_err(|e| VfsError::from_io(path, e))
    }

    fn exists(&self, path: &str) -> bool {
        self.physical_path(path)
            .map(|p| p.exists())
            .unwrap_or(false)
    }

    fn is_file(&self, path: &str) -> bool {
        self.physical_path(path)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kpage_vfs_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_native_read() {
        let root = temp_root("read");
        std::fs::create_dir_all(root.join("pages")).unwrap();
        std::fs::write(root.join("pages/index.kpage"), b"hello native").unwrap();

        let fs = NativeFileSystem::new(&root);
        assert!(fs.exists("/pages/index.kpage"));
        assert!(fs.is_file("~/pages/index.kpage"));
        assert_eq!(fs.read_file("/pages/index.kpage").unwrap(), b"hello native");

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_native_read_nonexistent() {
        let root = temp_root("missing");
        let fs = NativeFileSystem::new(&root);

        let result = fs.read_file("/nope.kpage");
        assert!(matches!(result, Err(VfsError::NotFound { .. })));
        assert!(!fs.exists("/nope.kpage"));

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_native_directory_is_not_a_file() {
        let root = temp_root("dir");
        std::fs::create_dir_all(root.join("pages")).unwrap();
        let fs = NativeFileSystem::new(&root);

        assert!(fs.exists("/pages"));
        assert!(!fs.is_file("/pages"));
        assert!(matches!(fs.read_file("/pages"), Err(VfsError::InvalidPath { .. })));

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_native_rejects_escape() {
        let fs = NativeFileSystem::new("/srv/site");
        assert!(fs.physical_path("/../etc/passwd").is_err());
        assert!(!fs.exists("/../etc/passwd"));
    }
}
