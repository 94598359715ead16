//! Resilient file reader
//!
//! Reads markup through a [`FileProvider`], retrying transient failures with
//! a fixed backoff. The backoff wait is interruptible by the cancel token.

use crate::error::{PageError, PageResult};
use kpage_config::ReadRetryConfig;
use kpage_core::CancelToken;
use kpage_vfs::FileProvider;
use tracing::{trace, warn};

/// A markup file as read: path and trimmed content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupFile {
    pub path: String,
    pub content: String,
}

pub struct ResilientFileReader<'a> {
    provider: &'a dyn FileProvider,
    retry: &'a ReadRetryConfig,
}

impl<'a> ResilientFileReader<'a> {
    pub fn new(provider: &'a dyn FileProvider, retry: &'a ReadRetryConfig) -> Self {
        Self { provider, retry }
    }

    /// Read the whole of `path` as UTF-8 text.
    ///
    /// The token is checked before every attempt. Non-transient provider
    /// errors fail at once; transient ones are retried until
    /// `max_attempts` is reached, then surface as
    /// [`PageError::FileUnavailable`].
    pub fn read(&self, path: &str, cancel: &CancelToken) -> PageResult<String> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            cancel.check()?;
            attempt += 1;
            match self.provider.read_file(path) {
                Ok(bytes) => {
                    trace!(target: "kpage::reader", path, attempt, bytes = bytes.len(), "file read");
                    return String::from_utf8(bytes).map_err(|_| PageError::InvalidEncoding {
                        path: path.to_string(),
                    });
                }
                Err(error) if !error.is_transient() => return Err(PageError::file(path, error)),
                Err(error) if attempt >= max_attempts => {
                    warn!(target: "kpage::reader", path, attempt, %error, "giving up");
                    return Err(PageError::FileUnavailable {
                        path: path.to_string(),
                        attempts: attempt,
                        source: error,
                    });
                }
                Err(error) => {
                    warn!(
                        target: "kpage::reader",
                        path,
                        attempt,
                        max_attempts,
                        %error,
                        "transient read failure, retrying"
                    );
                    cancel.sleep(self.retry.backoff())?;
                }
            }
        }
    }

    /// Read `path` and trim surrounding whitespace.
    pub fn read_markup(&self, path: &str, cancel: &CancelToken) -> PageResult<MarkupFile> {
        let content = self.read(path, cancel)?;
        Ok(MarkupFile {
            path: path.to_string(),
            content: content.trim().to_string(),
        })
    }
}
