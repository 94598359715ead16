//! Page-script compiler
//!
//! Pipeline: parse every generated unit, bind them as one module against the
//! reference set, emit the image and symbol stream. The cancellation token
//! is checked between phases.

pub mod binder;
pub mod emit;
pub mod references;

pub use binder::{bind, BoundModule, TypeRef};
pub use emit::{emit, EmitOptions};
pub use references::{ModuleSymbols, ReferenceSet, TypeSymbol};

use crate::binary::BuildId;
use crate::cancel::{CancelToken, Cancelled};
use crate::diagnostic::{has_errors, Diagnostic};
use crate::syntax::parse_unit;
use kpage_config::CompilerConfig;
use tracing::{debug, info};

/// A named piece of text: generated page script or original markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub path: String,
    pub text: String,
}

impl SourceText {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// Everything one compilation consumes
#[derive(Debug, Clone, Copy)]
pub struct CompileInput<'a> {
    pub module_name: &'a str,
    /// Generated page script, one unit per markup file
    pub generated: &'a [SourceText],
    /// Original markup, embedded as debug documents
    pub markup: &'a [SourceText],
    pub references: &'a ReferenceSet,
    pub config: &'a CompilerConfig,
}

/// Successful compilation output
#[derive(Debug, Clone)]
pub struct CompiledModule {
    pub image: Vec<u8>,
    /// Present when debug symbols were requested
    pub symbols: Option<Vec<u8>>,
    pub build_id: BuildId,
    pub warnings: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error("compilation failed with {} diagnostic(s)", .0.len())]
    Diagnostics(Vec<Diagnostic>),
}

/// Compile `input` into a module image.
pub fn compile(input: &CompileInput<'_>, cancel: &CancelToken) -> Result<CompiledModule, CompileError> {
    cancel.check()?;
    debug!(
        target: "kpage::compiler",
        module = input.module_name,
        units = input.generated.len(),
        references = input.references.len(),
        "compiling"
    );

    let mut units = Vec::with_capacity(input.generated.len());
    let mut diagnostics = Vec::new();
    for source in input.generated {
        let (unit, unit_diagnostics) = parse_unit(&source.path, &source.text);
        units.push(unit);
        diagnostics.extend(unit_diagnostics);
    }
    if has_errors(&diagnostics) {
        return Err(CompileError::Diagnostics(diagnostics));
    }

    cancel.check()?;
    let bound = bind(&units, input.references).map_err(|mut errors| {
        diagnostics.append(&mut errors);
        CompileError::Diagnostics(std::mem::take(&mut diagnostics))
    })?;

    diagnostics.extend(bound.warnings.iter().cloned());

    cancel.check()?;
    let options = EmitOptions {
        module_name: input.module_name.to_string(),
        build_mode: input.config.build_mode,
        emit_symbols: input.config.emit_debug_symbols,
        embed_markup: input.config.embed_markup_sources,
    };
    let (image, mut symbols) = emit(&bound, input.generated, input.markup, &options);
    let (image_bytes, build_id) = image.encode();
    symbols.build_id = build_id;
    let symbol_bytes = input.config.emit_debug_symbols.then(|| symbols.encode());

    info!(
        target: "kpage::compiler",
        module = input.module_name,
        classes = image.classes.len(),
        bytes = image_bytes.len(),
        %build_id,
        "module emitted"
    );

    Ok(CompiledModule {
        image: image_bytes,
        symbols: symbol_bytes,
        build_id,
        warnings: diagnostics,
    })
}
