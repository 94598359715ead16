//! Test helpers: a line-based markup generator, a component library, and
//! providers and generators that misbehave on purpose

#![allow(dead_code)]

use kpage_api::{
    CompileGate, ComponentMetadata, ConcurrencyPolicy, GeneratedSource, MarkupGenerator, PageCompiler, PageConfig,
    ReferenceCatalog,
};
use kpage_core::naming::class_name_for;
use kpage_core::{Component, ComponentDescriptor, Diagnostic, ModuleBuilder, ModuleHost, ModuleId, PropertyDescriptor};
use kpage_vfs::{path, FileProvider, MemoryFileSystem, VfsError, VfsResult};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

pub struct Label {
    text: String,
}

impl Component for Label {
    fn set_property(&mut self, name: &str, value: &str) -> Result<(), String> {
        match name {
            "Text" => {
                self.text = value.to_string();
                Ok(())
            }
            other => Err(format!("Label has no property {}", other)),
        }
    }

    fn render(&self, out: &mut String) {
        out.push_str(&format!("<span>{}</span>", self.text));
    }
}

/// Ids of the two component-library modules
pub struct Library {
    pub ui: ModuleId,
    pub controls: ModuleId,
}

/// Host with `web.ui` (plain `Page`) and `web.controls` (`Label`).
pub fn host() -> (Arc<ModuleHost>, Library) {
    let host = Arc::new(ModuleHost::new());
    let ui = host.register(ModuleBuilder::new("web.ui").plain_type("Page"));
    let controls = host.register(ModuleBuilder::new("web.controls").component(
        ComponentDescriptor::new("Label")
            .default_property("Text")
            .property(PropertyDescriptor::string("Text").with_default("")),
        || Box::new(Label { text: String::new() }),
    ));
    (host, Library { ui, controls })
}

/// Dynamic modules currently registered, i.e. loaded pages
pub fn loaded_units(host: &ModuleHost) -> usize {
    host.modules().iter().filter(|m| m.is_dynamic()).count()
}

/// Markup, one instruction per line:
/// - `@page` marks the page directive
/// - `@class NAME` overrides the emitted class name
/// - `label: TEXT` renders a Label through its default property
/// - `include PATH` includes another markup file
/// - `new: TYPE` instantiates an arbitrary type
/// - `!error MESSAGE` reports a markup diagnostic
/// - anything else is written verbatim
pub struct ScriptGenerator;

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

impl MarkupGenerator for ScriptGenerator {
    fn generate(&self, file: &str, text: &str, components: &[ComponentMetadata]) -> GeneratedSource {
        let mut output = GeneratedSource::default();
        let mut class = class_name_for(file);
        let mut body = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            let number = index as u32 + 1;
            if line == "@page" {
                output.has_directive = true;
                body.push(String::new());
            } else if let Some(name) = line.strip_prefix("@class ") {
                class = name.to_string();
                body.push(String::new());
            } else if let Some(reference) = line.strip_prefix("include ") {
                match path::resolve(file, reference) {
                    Ok(resolved) => {
                        body.push(format!("include {};", class_name_for(&resolved)));
                        output.dependencies.push(reference.to_string());
                    }
                    Err(error) => output.diagnostics.push(Diagnostic::error("MK0002", error.to_string())),
                }
            } else if let Some(text) = line.strip_prefix("label: ") {
                match components.iter().find(|c| c.name == "Label") {
                    Some(label) => {
                        let property = label.default_property.as_deref().unwrap_or("Text");
                        body.push(format!(
                            "let c{n} = new {ty}; set c{n}.{p} = {v}; render c{n};",
                            n = number,
                            ty = label.qualified_name(),
                            p = property,
                            v = quote(text)
                        ));
                    }
                    None => output
                        .diagnostics
                        .push(Diagnostic::error("MK0001", "unknown component Label")),
                }
            } else if let Some(ty) = line.strip_prefix("new: ") {
                body.push(format!("let c{} = new {};", number, ty));
            } else if let Some(message) = line.strip_prefix("!error ") {
                output.diagnostics.push(Diagnostic::error("MK0100", message));
            } else {
                body.push(format!("write {};", quote(line)));
            }
        }

        let mut source = String::from("use web.ui;\n");
        source.push_str(&format!("class {} : Page {{\n", class));
        source.push_str(&format!("#line 1 {}\n", quote(file)));
        for statement in body {
            source.push_str(&statement);
            source.push('\n');
        }
        source.push_str("#line default\n}\n");
        output.source = source;
        output
    }
}

/// Serves a [`MemoryFileSystem`], failing the first `failures` reads of
/// `path` with a transient error.
pub struct FlakyProvider {
    pub inner: MemoryFileSystem,
    pub path: String,
    pub failures: u32,
    pub reads: AtomicU32,
}

impl FlakyProvider {
    pub fn new(inner: MemoryFileSystem, path: &str, failures: u32) -> Self {
        Self {
            inner,
            path: path.to_string(),
            failures,
            reads: AtomicU32::new(0),
        }
    }
}

impl FileProvider for FlakyProvider {
    fn read_file(&self, path: &str) -> VfsResult<Vec<u8>> {
        if path == self.path && self.reads.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(VfsError::Io {
                path: path.to_string(),
                message: "file is locked".to_string(),
            });
        }
        self.inner.read_file(path)
    }

    fn exists(&self, path: &str) -> bool {
        self.inner.exists(path)
    }
}

/// Counts every read
#[derive(Default)]
pub struct CountingProvider {
    pub inner: MemoryFileSystem,
    pub reads: AtomicU32,
}

impl FileProvider for CountingProvider {
    fn read_file(&self, path: &str) -> VfsResult<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_file(path)
    }

    fn exists(&self, path: &str) -> bool {
        self.inner.exists(path)
    }
}

/// Parks the first generation of `path` until released
pub struct BlockingGenerator {
    path: String,
    armed: AtomicBool,
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

/// Test side of a [`BlockingGenerator`]
pub struct BlockControl {
    pub entered: Receiver<()>,
    pub release: Sender<()>,
}

impl BlockingGenerator {
    pub fn new(path: &str) -> (Self, BlockControl) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        (
            Self {
                path: path.to_string(),
                armed: AtomicBool::new(true),
                entered: Mutex::new(entered_tx),
                release: Mutex::new(release_rx),
            },
            BlockControl {
                entered: entered_rx,
                release: release_tx,
            },
        )
    }
}

impl MarkupGenerator for BlockingGenerator {
    fn generate(&self, path: &str, text: &str, components: &[ComponentMetadata]) -> GeneratedSource {
        if path == self.path && self.armed.swap(false, Ordering::SeqCst) {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
        }
        ScriptGenerator.generate(path, text, components)
    }
}

/// Retry without meaningful waits
pub fn fast_config() -> PageConfig {
    let mut config = PageConfig::default();
    config.retry.backoff_ms = 1;
    config
}

/// A compiler isolated from the process-wide host, catalog and gate
pub struct Fixture {
    pub host: Arc<ModuleHost>,
    pub library: Library,
    pub catalog: Arc<ReferenceCatalog>,
    pub gate: Arc<CompileGate>,
}

impl Fixture {
    pub fn new(policy: ConcurrencyPolicy) -> Self {
        let (host, library) = host();
        Self {
            host,
            library,
            catalog: Arc::new(ReferenceCatalog::new()),
            gate: Arc::new(CompileGate::new(policy)),
        }
    }

    pub fn compiler(&self, provider: Arc<dyn FileProvider>, generator: Arc<dyn MarkupGenerator>) -> PageCompiler {
        PageCompiler::new(provider, generator)
            .with_host(Arc::clone(&self.host))
            .with_catalog(Arc::clone(&self.catalog))
            .with_gate(Arc::clone(&self.gate))
            .with_config(fast_config())
    }

    /// Compiler over in-memory `files` with the [`ScriptGenerator`]
    pub fn compiler_for(&self, files: &[(&str, &str)]) -> PageCompiler {
        let fs = MemoryFileSystem::new();
        for (path, text) in files {
            fs.insert(path, *text);
        }
        self.compiler(Arc::new(fs), Arc::new(ScriptGenerator))
    }
}
