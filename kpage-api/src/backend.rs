//! Compilation backend
//!
//! Drives the page-script compiler over a [`GeneratedPage`] and hands back
//! the image and symbol stream as readable in-memory streams.

use crate::projector::GeneratedPage;
use kpage_core::binary::BuildId;
use kpage_core::naming::module_name_for;
use kpage_core::{compile, CancelToken, CompileError, CompileInput, CompilerConfig, Diagnostic, ReferenceSet};
use std::io::Cursor;
use tracing::info;

/// Output of one successful compilation, consumed by the loader
#[derive(Debug)]
pub struct CompiledArtifact {
    pub module_name: String,
    pub image: Cursor<Vec<u8>>,
    /// Absent when debug symbols are disabled
    pub symbols: Option<Cursor<Vec<u8>>>,
    pub build_id: BuildId,
    pub warnings: Vec<Diagnostic>,
}

pub struct CompilationBackend<'a> {
    config: &'a CompilerConfig,
}

impl<'a> CompilationBackend<'a> {
    pub fn new(config: &'a CompilerConfig) -> Self {
        Self { config }
    }

    /// Compile every unit of `page` into one module.
    pub fn compile(
        &self,
        page: &GeneratedPage,
        references: &ReferenceSet,
        cancel: &CancelToken,
    ) -> Result<CompiledArtifact, CompileError> {
        let module_name = module_name_for(&page.class_name);
        let input = CompileInput {
            module_name: &module_name,
            generated: &page.generated,
            markup: &page.markup,
            references,
            config: self.config,
        };
        let compiled = match compile(&input, cancel) {
            Ok(compiled) => compiled,
            Err(CompileError::Diagnostics(diagnostics)) => {
                info!(
                    target: "kpage::compiler",
                    path = %page.path,
                    diagnostics = diagnostics.len(),
                    "compilation failed"
                );
                return Err(CompileError::Diagnostics(diagnostics));
            }
            Err(error) => return Err(error),
        };

        Ok(CompiledArtifact {
            module_name,
            image: Cursor::new(compiled.image),
            symbols: compiled.symbols.map(Cursor::new),
            build_id: compiled.build_id,
            warnings: compiled.warnings,
        })
    }
}
