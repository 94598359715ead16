//! Kpage API - dynamic page compilation
//!
//! Turns a tree of markup files into a loaded, renderable page at run time:
//! - Resilient file reading through a `kpage_vfs::FileProvider`
//! - Reference catalog over the modules registered with the host
//! - Breadth-first source projection through a [`MarkupGenerator`]
//! - Compilation with `kpage-core`, loading into an isolated execution unit
//! - [`CompiledPageHandle`]: entry point or error payload, unloaded on drop
//!
//! For application use, [`PageCompiler::new`] works on the process-wide
//! host, catalog, gate and config. Tests and embedders inject their own.
//!
//! ```ignore
//! let compiler = PageCompiler::new(Arc::new(fs), Arc::new(generator));
//! let handle = compiler.compile("/index.kpage", &CancelToken::new())?;
//! match handle.entry_point() {
//!     Some(entry) => println!("{}", entry.render()?),
//!     None => eprintln!("{:?}", handle.failure()),
//! }
//! ```

pub mod backend;
pub mod catalog;
pub mod compiler;
pub mod config;
pub mod error;
pub mod gate;
pub mod generator;
pub mod handle;
pub mod loader;
pub mod logging;
pub mod projector;
pub mod reader;

pub use backend::{CompilationBackend, CompiledArtifact};
pub use catalog::{CatalogSnapshot, ComponentMetadata, ReferenceCatalog, ReferenceEntry};
pub use compiler::PageCompiler;
pub use config::{config as get_config, init as init_config, is_initialized};
pub use error::{PageError, PageResult};
pub use gate::{CompileGate, GateGuard};
pub use generator::{GeneratedSource, MarkupGenerator};
pub use handle::{CompiledPageHandle, PageFailure, TYPE_NOT_FOUND};
pub use loader::{EntryPoint, ExecutionUnit, IsolatedModuleLoader, UnitId};
pub use projector::{GeneratedPage, GenerationResult, Projection, SourceProjector, MISSING_DIRECTIVE};
pub use reader::{MarkupFile, ResilientFileReader};

// Re-export config types from kpage_config
pub use kpage_config::{
    BuildMode, CompilerConfig, ConcurrencyPolicy, LimitConfig, LogConfig, LogLevel, PageConfig, Phase,
    ReadRetryConfig,
};

// Re-export core types callers need alongside the API
pub use kpage_core::{CancelToken, Diagnostic, ModuleBuilder, ModuleHost, SourceLocation};
pub use kpage_config;
pub use kpage_core;
pub use kpage_vfs;
