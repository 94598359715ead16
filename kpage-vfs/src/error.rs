//! VFS Error Types

use std::fmt;

/// Result type for VFS operations
pub type VfsResult<T> = Result<T, VfsError>;

/// Error type for VFS operations
#[derive(Debug, Clone, PartialEq)]
pub enum VfsError {
    /// File not found
    NotFound { path: String },

    /// Permission denied
    PermissionDenied { path: String },

    /// Invalid path (malformed, or escaping the provider root)
    InvalidPath { path: String, reason: String },

    /// IO error, possibly transient (file locked, interrupted, busy device)
    Io { path: String, message: String },
}

impl VfsError {
    /// Map a `std::io::Error` raised while accessing `path`.
    pub fn from_io(path: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => VfsError::NotFound {
                path: path.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => VfsError::PermissionDenied {
                path: path.to_string(),
            },
            _ => VfsError::Io {
                path: path.to_string(),
                message: err.to_string(),
            },
        }
    }

    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, VfsError::Io { .. })
    }
}

impl fmt::Display for VfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VfsError::NotFound { path } => write!(f, "Path not found: {}", path),
            VfsError::PermissionDenied { path } => write!(f, "Permission denied: {}", path),
            VfsError::InvalidPath { path, reason } => {
                write!(f, "Invalid path '{}': {}", path, reason)
            }
            VfsError::Io { path, message } => write!(f, "IO error on '{}': {}", path, message),
        }
    }
}

impl std::error::Error for VfsError {}
