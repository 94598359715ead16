//! Kpage Virtual File System
//!
//! The page compiler never touches `std::fs` directly. Every markup file is
//! resolved through a [`FileProvider`], which makes virtualized or versioned
//! sources possible.
//!
//! # Usage
//! ```rust
//! use kpage_vfs::{FileProvider, MemoryFileSystem};
//!
//! let fs = MemoryFileSystem::with_files([("/index.kpage", b"<h1>hi</h1>".to_vec())]);
//! let content = fs.read_file("/index.kpage").unwrap();
//! assert_eq!(content, b"<h1>hi</h1>");
//! ```

mod error;
mod logged;
mod memory;
mod native;
pub mod path;
mod provider;

pub use error::{VfsError, VfsResult};
pub use logged::LoggedFileSystem;
pub use memory::MemoryFileSystem;
pub use native::NativeFileSystem;
pub use provider::FileProvider;

/// Create a new memory-based file system.
pub fn memory_fs() -> MemoryFileSystem {
    MemoryFileSystem::new()
}

/// Create a new native file system rooted at `root`.
pub fn native_fs(root: impl Into<std::path::PathBuf>) -> NativeFileSystem {
    NativeFileSystem::new(root)
}
