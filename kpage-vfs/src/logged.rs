//! Tracing wrapper for file providers

use crate::{FileProvider, VfsResult};
use tracing::{debug, trace};

/// Provider that logs every operation of the wrapped provider on the
/// `kpage::vfs` target.
#[derive(Debug, Clone)]
pub struct LoggedFileSystem<F> {
    inner: F,
}

impl<F: FileProvider> LoggedFileSystem<F> {
    /// Wrap `inner`.
    pub fn new(inner: F) -> Self {
        Self { inner }
    }

    /// The wrapped provider.
    pub fn inner(&self) -> &F {
        &self.inner
    }
}

impl<F: FileProvider> FileProvider for LoggedFileSystem<F> {
    fn read_file(&self, path: &str) -> VfsResult<Vec<u8>> {
        let result = self.inner.read_file(path);
        match &result {
            Ok(bytes) => debug!(target: "kpage::vfs", path, bytes = bytes.len(), "read_file ok"),
            Err(e) => debug!(target: "kpage::vfs", path, error = %e, "read_file failed"),
        }
        result
    }

    fn exists(&self, path: &str) -> bool {
        let result = self.inner.exists(path);
        trace!(target: "kpage::vfs", path, result, "exists");
        result
    }

    fn is_file(&self, path: &str) -> bool {
        let result = self.inner.is_file(path);
        trace!(target: "kpage::vfs", path, result, "is_file");
        result
    }
}
