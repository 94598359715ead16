//! Test helpers: a small component library and a compile-load-render runner

use kpage_core::{
    compile, CancelToken, CompileError, CompileInput, Component, ComponentDescriptor, LoadedModule,
    ModuleBuilder, ModuleHost, ModuleSymbols, PropertyDescriptor, ReferenceSet, SourceText,
};
use kpage_core::{CompilerConfig, LimitConfig};
use std::sync::Arc;

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

/// Host with `web.ui` (plain `Page`) and `web.controls` (`Label`).
pub fn host() -> ModuleHost {
    let host = ModuleHost::new();
    host.register(ModuleBuilder::new("web.ui").plain_type("Page"));
    host.register(ModuleBuilder::new("web.controls").component(
        ComponentDescriptor::new("Label")
            .default_property("Text")
            .property(PropertyDescriptor::string("Text").with_default("")),
        || Box::new(Label { text: String::new() }),
    ));
    host
}

pub fn references(host: &ModuleHost) -> ReferenceSet {
    host.modules()
        .iter()
        .filter(|m| !m.is_dynamic())
        .map(|m| Arc::new(ModuleSymbols::from_module(m)))
        .collect()
}

/// Compile `generated` (path, text) units with `config`.
pub fn compile_units(
    host: &ModuleHost,
    generated: &[(&str, &str)],
    config: &CompilerConfig,
) -> Result<kpage_core::CompiledModule, CompileError> {
    let generated: Vec<SourceText> = generated
        .iter()
        .map(|(path, text)| SourceText::new(*path, *text))
        .collect();
    let references = references(host);
    compile(
        &CompileInput {
            module_name: "Compiled.Test",
            generated: &generated,
            markup: &[],
            references: &references,
            config,
        },
        &CancelToken::new(),
    )
}

/// Compile, load and render `class`.
pub fn render(generated: &[(&str, &str)], class: &str, config: &CompilerConfig) -> Result<String, String> {
    let host = host();
    let compiled = compile_units(&host, generated, config).map_err(|e| format!("{:?}", e))?;
    let module = LoadedModule::from_bytes(compiled.image, compiled.symbols.as_deref())
        .map_err(|e| e.to_string())?;
    let index = module
        .find_class(class)
        .ok_or_else(|| format!("class {} not found", class))?;
    let limits = LimitConfig::default();
    kpage_core::Executor::new(&module, &host, &limits)
        .render(index)
        .map_err(|e| e.to_string())
}
