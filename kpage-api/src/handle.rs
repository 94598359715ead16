//! Compiled page handle
//!
//! What `compile` returns: a live entry point, or a failure with its byte
//! payload. Either way the handle records the resolved path and every file
//! the compilation read, so callers can watch them for changes.

use crate::error::PageResult;
use crate::loader::{EntryPoint, IsolatedModuleLoader};
use kpage_core::diagnostic::to_payload;
use kpage_core::Diagnostic;
use tracing::debug;

/// Payload message when the compiled module lacks the entry class
pub const TYPE_NOT_FOUND: &str = "type not found";

/// Expected, user-visible reasons a page did not load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageFailure {
    /// The markup generator reported problems
    Markup(Vec<Diagnostic>),
    /// Generation could not proceed (for example, no page directive)
    Fatal(String),
    /// The generated page script did not compile
    Compilation(Vec<Diagnostic>),
    /// The compiled module does not define the derived entry class
    TypeNotFound { class: String },
}

impl PageFailure {
    /// Byte payload: diagnostic lists as JSON, messages as UTF-8 text.
    pub fn payload(&self) -> Vec<u8> {
        match self {
            PageFailure::Markup(diagnostics) | PageFailure::Compilation(diagnostics) => to_payload(diagnostics),
            PageFailure::Fatal(message) => message.as_bytes().to_vec(),
            PageFailure::TypeNotFound { .. } => TYPE_NOT_FOUND.as_bytes().to_vec(),
        }
    }

    /// Diagnostics carried by the failure, if it is a diagnostic list.
    pub fn diagnostics(&self) -> Option<&[Diagnostic]> {
        match self {
            PageFailure::Markup(diagnostics) | PageFailure::Compilation(diagnostics) => Some(diagnostics),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum Outcome {
    Loaded(EntryPoint),
    Failed { failure: PageFailure, payload: Vec<u8> },
}

#[derive(Debug)]
pub struct CompiledPageHandle {
    path: String,
    dependencies: Vec<String>,
    outcome: Outcome,
    warnings: Vec<Diagnostic>,
    loader: Option<IsolatedModuleLoader>,
}

impl CompiledPageHandle {
    pub(crate) fn loaded(
        path: String,
        dependencies: Vec<String>,
        entry_point: EntryPoint,
        loader: IsolatedModuleLoader,
    ) -> Self {
        Self {
            path,
            dependencies,
            outcome: Outcome::Loaded(entry_point),
            warnings: Vec::new(),
            loader: Some(loader),
        }
    }

    /// `loader` is the unit created before the failure was detected, if any.
    pub(crate) fn failed(
        path: String,
        dependencies: Vec<String>,
        failure: PageFailure,
        loader: Option<IsolatedModuleLoader>,
    ) -> Self {
        let payload = failure.payload();
        Self {
            path,
            dependencies,
            outcome: Outcome::Failed { failure, payload },
            warnings: Vec::new(),
            loader,
        }
    }

    pub(crate) fn with_warnings(mut self, warnings: Vec<Diagnostic>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Entry point of the compiled page, absent on failure
    pub fn entry_point(&self) -> Option<&EntryPoint> {
        match &self.outcome {
            Outcome::Loaded(entry_point) => Some(entry_point),
            Outcome::Failed { .. } => None,
        }
    }

    /// Non-empty failure payload, absent on success
    pub fn error_payload(&self) -> Option<&[u8]> {
        match &self.outcome {
            Outcome::Loaded(_) => None,
            Outcome::Failed { payload, .. } => Some(payload),
        }
    }

    pub fn failure(&self) -> Option<&PageFailure> {
        match &self.outcome {
            Outcome::Loaded(_) => None,
            Outcome::Failed { failure, .. } => Some(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Loaded(_))
    }

    /// Non-fatal compiler diagnostics of a module that did compile
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    /// Resolved root path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Root path followed by every discovered file
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Unload the execution unit, if one was created. Later calls, and
    /// calls on handles that never loaded, do nothing.
    pub fn dispose(&mut self) -> PageResult<()> {
        let Some(mut loader) = self.loader.take() else {
            return Ok(());
        };
        let entry_point = match &self.outcome {
            Outcome::Loaded(entry_point) => Some(entry_point),
            Outcome::Failed { .. } => None,
        };
        if let Err(error) = loader.unload(entry_point) {
            self.loader = Some(loader);
            return Err(error);
        }
        debug!(target: "kpage::loader", path = %self.path, "handle disposed");
        Ok(())
    }
}
