//! Markup generator seam
//!
//! The markup grammar lives outside this crate. A [`MarkupGenerator`] turns
//! one markup file into page script and reports the files it depends on.
//! The page script it produces must name the entry class
//! [`kpage_core::naming::class_name_for`] derives from the root path.

use crate::catalog::ComponentMetadata;
use kpage_core::Diagnostic;
use std::sync::Arc;

/// What a generator produced for one markup file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedSource {
    /// Page script for this file
    pub source: String,
    /// A page-level directive was recognized
    pub has_directive: bool,
    /// Further markup files this one references, as written in the file
    pub dependencies: Vec<String>,
    /// Parse problems; a non-empty list stops the compilation
    pub diagnostics: Vec<Diagnostic>,
}

impl GeneratedSource {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn with_directive(mut self) -> Self {
        self.has_directive = true;
        self
    }

    pub fn depends_on(mut self, path: impl Into<String>) -> Self {
        self.dependencies.push(path.into());
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: Diagnostic) -> Self {
        self.diagnostics.push(diagnostic);
        self
    }
}

pub trait MarkupGenerator: Send + Sync {
    /// Generate page script for the markup file at `path`.
    ///
    /// `text` is the trimmed file content.
    fn generate(&self, path: &str, text: &str, components: &[ComponentMetadata]) -> GeneratedSource;
}

impl<T: MarkupGenerator + ?Sized> MarkupGenerator for Arc<T> {
    fn generate(&self, path: &str, text: &str, components: &[ComponentMetadata]) -> GeneratedSource {
        (**self).generate(path, text, components)
    }
}

impl<T: MarkupGenerator + ?Sized> MarkupGenerator for &T {
    fn generate(&self, path: &str, text: &str, components: &[ComponentMetadata]) -> GeneratedSource {
        (**self).generate(path, text, components)
    }
}
