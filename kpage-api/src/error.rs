//! API error types
//!
//! [`PageError`] is what aborts a `compile` call outright. Expected,
//! user-triggerable outcomes (bad markup, compiler errors) are not errors
//! here; they travel on the handle as a [`PageFailure`].
//!
//! [`PageFailure`]: crate::handle::PageFailure

use kpage_core::{Cancelled, LoadError, RuntimeError};
use kpage_vfs::VfsError;
use thiserror::Error;

/// Result type for page operations
pub type PageResult<T> = Result<T, PageError>;

#[derive(Error, Debug)]
pub enum PageError {
    /// The cancellation token fired
    #[error("operation was cancelled")]
    Cancelled,

    /// The provider refused the path; retrying would not help
    #[error("could not read '{path}': {source}")]
    File {
        path: String,
        #[source]
        source: VfsError,
    },

    /// Every read attempt failed with a transient error
    #[error("could not open file '{path}' after {attempts} attempts: {source}")]
    FileUnavailable {
        path: String,
        attempts: u32,
        #[source]
        source: VfsError,
    },

    #[error("'{path}' is not valid UTF-8")]
    InvalidEncoding { path: String },

    /// Another compilation holds the gate
    #[error("compilation cannot be parallel")]
    CompilationInProgress,

    /// An entry point from another execution unit was handed to a loader
    #[error("entry point belongs to execution unit '{entry_unit}', not to '{unit}'")]
    ForeignModule { unit: String, entry_unit: String },

    #[error("could not load compiled page: {0}")]
    Load(#[from] LoadError),

    /// The execution unit behind an entry point is gone
    #[error("execution unit '{0}' has been unloaded")]
    Unloaded(String),

    #[error("page rendering failed: {0}")]
    Runtime(#[from] RuntimeError),
}

impl From<Cancelled> for PageError {
    fn from(_: Cancelled) -> Self {
        PageError::Cancelled
    }
}

impl PageError {
    /// Wrap a provider error raised for `path`.
    pub fn file(path: &str, source: VfsError) -> Self {
        PageError::File {
            path: path.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            PageError::CompilationInProgress.to_string(),
            "compilation cannot be parallel"
        );
        let error = PageError::FileUnavailable {
            path: "/a.kpage".to_string(),
            attempts: 5,
            source: VfsError::Io {
                path: "/a.kpage".to_string(),
                message: "busy".to_string(),
            },
        };
        assert!(error.to_string().starts_with("could not open file '/a.kpage'"));
    }

    #[test]
    fn test_from_cancelled() {
        assert!(matches!(PageError::from(Cancelled), PageError::Cancelled));
    }
}
