//! Executor
//!
//! Runs one class of a [`LoadedModule`], instantiating components through
//! the [`ModuleHost`] and appending output to a string.

use super::component::Component;
use super::error::RuntimeError;
use super::host::ModuleHost;
use super::module::LoadedModule;
use crate::bytecode::Instruction;
use kpage_config::LimitConfig;
use tracing::trace;

pub struct Executor<'a> {
    module: &'a LoadedModule,
    host: &'a ModuleHost,
    limits: &'a LimitConfig,
}

impl<'a> Executor<'a> {
    pub fn new(module: &'a LoadedModule, host: &'a ModuleHost, limits: &'a LimitConfig) -> Self {
        Self {
            module,
            host,
            limits,
        }
    }

    /// Render `class` and return its output.
    pub fn render(&self, class: usize) -> Result<String, RuntimeError> {
        let mut out = String::new();
        self.run(class, &mut out, 0)?;
        Ok(out)
    }

    fn run(&self, class: usize, out: &mut String, depth: usize) -> Result<(), RuntimeError> {
        let module = self.module;
        let image = module.image();
        let mut slots: Vec<Option<Box<dyn Component>>> =
            (0..module.slot_count(class)).map(|_| None).collect();

        trace!(
            target: "kpage::runtime",
            class = module.class_name(class)?,
            depth,
            "enter class"
        );

        for (ip, instruction) in module.instructions(class).iter().enumerate() {
            match *instruction {
                Instruction::Write { text } => out.push_str(image.string(text)?),
                Instruction::New { type_ref, slot } => {
                    let (module_name, type_name) = image.type_ref(type_ref)?;
                    let component = self.host.instantiate(module_name, type_name).ok_or_else(|| {
                        RuntimeError::TypeUnavailable {
                            type_name: format!("{}.{}", module_name, type_name),
                            location: module.locate(class, ip),
                        }
                    })?;
                    slots[slot as usize] = Some(component);
                }
                Instruction::Set {
                    slot,
                    property,
                    value,
                } => {
                    let property = image.string(property)?;
                    let value = image.string(value)?;
                    let component = slots[slot as usize].as_mut().ok_or_else(|| {
                        RuntimeError::UninitializedSlot {
                            slot,
                            location: module.locate(class, ip),
                        }
                    })?;
                    component
                        .set_property(property, value)
                        .map_err(|message| RuntimeError::Property {
                            property: property.to_string(),
                            message,
                            location: module.locate(class, ip),
                        })?;
                }
                Instruction::Render { slot } => {
                    let component = slots[slot as usize].as_ref().ok_or_else(|| {
                        RuntimeError::UninitializedSlot {
                            slot,
                            location: module.locate(class, ip),
                        }
                    })?;
                    component.render(out);
                }
                Instruction::Include { class: included } => {
                    let included = included as usize;
                    if depth + 1 > self.limits.max_include_depth {
                        return Err(RuntimeError::IncludeDepth {
                            class: module.class_name(included)?.to_string(),
                            limit: self.limits.max_include_depth,
                            location: module.locate(class, ip),
                        });
                    }
                    self.run(included, out, depth + 1)?;
                }
                Instruction::Return => break,
            }
        }
        Ok(())
    }
}
