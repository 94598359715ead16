//! Page compiler: the `compile(path, cancel)` entry operation
//!
//! Order: gate → catalog snapshot → projection → backend → loader. Read
//! failures, cancellation and gate rejection abort with `Err`; everything a
//! page author can cause ends up on the returned handle.

use crate::backend::CompilationBackend;
use crate::catalog::ReferenceCatalog;
use crate::config;
use crate::error::{PageError, PageResult};
use crate::gate::CompileGate;
use crate::generator::MarkupGenerator;
use crate::handle::{CompiledPageHandle, PageFailure};
use crate::loader::IsolatedModuleLoader;
use crate::projector::{GenerationResult, Projection, SourceProjector};
use crate::reader::ResilientFileReader;
use kpage_config::PageConfig;
use kpage_core::{CancelToken, CompileError, ModuleHost};
use kpage_vfs::{path as vpath, FileProvider};
use std::sync::Arc;
use tracing::{debug, info};

pub struct PageCompiler {
    provider: Arc<dyn FileProvider>,
    generator: Arc<dyn MarkupGenerator>,
    host: Arc<ModuleHost>,
    catalog: Arc<ReferenceCatalog>,
    gate: Arc<CompileGate>,
    config: PageConfig,
}

impl PageCompiler {
    /// A compiler on the process-wide host, catalog and gate, configured
    /// from the global config.
    pub fn new(provider: Arc<dyn FileProvider>, generator: Arc<dyn MarkupGenerator>) -> Self {
        Self {
            provider,
            generator,
            host: ModuleHost::global(),
            catalog: ReferenceCatalog::global(),
            gate: CompileGate::global(),
            config: config::config().clone(),
        }
    }

    pub fn with_host(mut self, host: Arc<ModuleHost>) -> Self {
        self.host = host;
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<ReferenceCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_gate(mut self, gate: Arc<CompileGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_config(mut self, config: PageConfig) -> Self {
        self.config = config;
        self
    }

    pub fn host(&self) -> &Arc<ModuleHost> {
        &self.host
    }

    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    /// Compile the page rooted at `path`.
    pub fn compile(&self, path: &str, cancel: &CancelToken) -> PageResult<CompiledPageHandle> {
        cancel.check()?;
        let path = vpath::normalize(path).map_err(|e| PageError::file(path, e))?;
        let _guard = self.gate.acquire(&path, cancel)?;
        info!(target: "kpage::compiler", path = %path, "compiling page");

        let snapshot = self.catalog.snapshot(&self.host);
        let reader = ResilientFileReader::new(self.provider.as_ref(), &self.config.retry);
        let projector = SourceProjector::new(reader, self.generator.as_ref());
        let Projection { dependencies, result } = projector.project(&path, &snapshot.components, cancel)?;

        let page = match result {
            GenerationResult::Fatal(message) => {
                return Ok(CompiledPageHandle::failed(path, dependencies, PageFailure::Fatal(message), None));
            }
            GenerationResult::Diagnostics(diagnostics) => {
                return Ok(CompiledPageHandle::failed(
                    path,
                    dependencies,
                    PageFailure::Markup(diagnostics),
                    None,
                ));
            }
            GenerationResult::Success(page) => page,
        };

        let backend = CompilationBackend::new(&self.config.compiler);
        let mut artifact = match backend.compile(&page, &snapshot.references, cancel) {
            Ok(artifact) => artifact,
            Err(CompileError::Cancelled(cancelled)) => return Err(cancelled.into()),
            Err(CompileError::Diagnostics(diagnostics)) => {
                return Ok(CompiledPageHandle::failed(
                    page.path,
                    dependencies,
                    PageFailure::Compilation(diagnostics),
                    None,
                ));
            }
        };
        cancel.check()?;

        let warnings = std::mem::take(&mut artifact.warnings);
        for warning in &warnings {
            debug!(target: "kpage::compiler", path = %page.path, %warning, "compiler warning");
        }

        let mut loader = IsolatedModuleLoader::new(Arc::clone(&self.host), self.config.limits.clone());
        let handle = match loader.load(&page.path, artifact, &page.class_name)? {
            Some(entry_point) => {
                info!(
                    target: "kpage::compiler",
                    path = %page.path,
                    unit = entry_point.unit_name(),
                    files = dependencies.len(),
                    "page compiled"
                );
                CompiledPageHandle::loaded(page.path, dependencies, entry_point, loader)
            }
            None => CompiledPageHandle::failed(
                page.path,
                dependencies,
                PageFailure::TypeNotFound {
                    class: page.class_name,
                },
                Some(loader),
            ),
        };
        Ok(handle.with_warnings(warnings))
    }
}

impl std::fmt::Debug for PageCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCompiler")
            .field("gate", &self.gate.policy())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
