//! Kpage Core - page-script compiler and runtime (pure logic, no IO)
//!
//! Contains the page-script lexer and parser, the binder and bytecode
//! emitter, the binary image and debug-symbol formats, the module host
//! registry, and the executor that renders a loaded class.
//! Only operates on in-memory data structures; file access belongs to
//! `kpage-vfs`, orchestration to `kpage-api`.
//!
//! Configuration is passed explicitly via parameters, not via global state.

pub mod binary;
pub mod bytecode;
pub mod cancel;
pub mod compiler;
pub mod diagnostic;
pub mod naming;
pub mod runtime;
pub mod syntax;

// Re-export common types
pub use cancel::{CancelToken, Cancelled};
pub use compiler::{compile, CompileError, CompileInput, CompiledModule, ModuleSymbols, ReferenceSet, SourceText, TypeSymbol};
pub use diagnostic::{Diagnostic, Severity, SourceLocation};
pub use runtime::{
    Component, ComponentDescriptor, ComponentFactory, Executor, HostModule, LoadError, LoadedModule,
    ModuleBuilder, ModuleHost, ModuleId, PropertyDescriptor, PropertyKind, RuntimeError,
};

// Re-export config types from kpage-config
pub use kpage_config::{BuildMode, CompilerConfig, LimitConfig, Phase};
