//! Module host registry
//!
//! Every module the process knows about is registered here: component
//! libraries (static) and loaded page modules (dynamic). The compiler takes
//! its references from the static ones; the executor instantiates
//! components through them.

use super::component::{Component, ComponentDescriptor, ComponentFactory};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

static GLOBAL_HOST: Lazy<Arc<ModuleHost>> = Lazy::new(|| Arc::new(ModuleHost::new()));

/// Identity of one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u64);

impl ModuleId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A component type together with its factory
#[derive(Clone)]
pub struct RegisteredComponent {
    pub descriptor: ComponentDescriptor,
    factory: ComponentFactory,
}

impl RegisteredComponent {
    pub fn instantiate(&self) -> Box<dyn Component> {
        (self.factory)()
    }
}

impl fmt::Debug for RegisteredComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredComponent")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Describes a module before it is registered
#[derive(Debug, Clone)]
pub struct ModuleBuilder {
    name: String,
    dynamic: bool,
    components: Vec<RegisteredComponent>,
    plain_types: Vec<String>,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dynamic: false,
            components: Vec::new(),
            plain_types: Vec::new(),
        }
    }

    /// Dynamic modules are produced at run time and never serve as
    /// compile references.
    pub fn dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }

    pub fn component<F>(mut self, descriptor: ComponentDescriptor, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Component> + Send + Sync + 'static,
    {
        self.components.push(RegisteredComponent {
            descriptor,
            factory: Arc::new(factory),
        });
        self
    }

    /// A type without the component capability.
    pub fn plain_type(mut self, name: impl Into<String>) -> Self {
        self.plain_types.push(name.into());
        self
    }
}

/// A registered module
#[derive(Debug)]
pub struct HostModule {
    id: ModuleId,
    name: String,
    dynamic: bool,
    generation: u64,
    components: Vec<RegisteredComponent>,
    plain_types: Vec<String>,
}

impl HostModule {
    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Host generation at which the module was registered
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn components(&self) -> &[RegisteredComponent] {
        &self.components
    }

    pub fn plain_types(&self) -> &[String] {
        &self.plain_types
    }

    pub fn find_component(&self, name: &str) -> Option<&RegisteredComponent> {
        self.components.iter().find(|c| c.descriptor.name == name)
    }
}

/// Process-wide registry of modules
#[derive(Debug, Default)]
pub struct ModuleHost {
    modules: RwLock<BTreeMap<ModuleId, Arc<HostModule>>>,
    next_id: AtomicU64,
    generation: AtomicU64,
}

impl ModuleHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared host used when no explicit host is injected.
    pub fn global() -> Arc<ModuleHost> {
        Arc::clone(&GLOBAL_HOST)
    }

    /// Register a module. A module already registered under the same name
    /// is replaced.
    pub fn register(&self, builder: ModuleBuilder) -> ModuleId {
        let id = ModuleId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let module = Arc::new(HostModule {
            id,
            name: builder.name,
            dynamic: builder.dynamic,
            generation,
            components: builder.components,
            plain_types: builder.plain_types,
        });

        let mut modules = self.write();
        let replaced: Vec<ModuleId> = modules
            .values()
            .filter(|m| m.name == module.name)
            .map(|m| m.id)
            .collect();
        for old in &replaced {
            modules.remove(old);
        }
        debug!(
            target: "kpage::runtime",
            module = %module.name,
            %id,
            dynamic = module.dynamic,
            generation,
            replaced = replaced.len(),
            "module registered"
        );
        modules.insert(id, module);
        id
    }

    /// Remove a module. Returns `false` when it was not registered.
    pub fn unregister(&self, id: ModuleId) -> bool {
        let removed = self.write().remove(&id);
        if let Some(module) = &removed {
            self.generation.fetch_add(1, Ordering::SeqCst);
            debug!(target: "kpage::runtime", module = %module.name, %id, "module unregistered");
        }
        removed.is_some()
    }

    /// Snapshot of every registered module, ordered by registration.
    pub fn modules(&self) -> Vec<Arc<HostModule>> {
        self.read().values().cloned().collect()
    }

    pub fn get(&self, id: ModuleId) -> Option<Arc<HostModule>> {
        self.read().get(&id).cloned()
    }

    pub fn find(&self, name: &str) -> Option<Arc<HostModule>> {
        self.read().values().find(|m| m.name == name).cloned()
    }

    pub fn contains(&self, id: ModuleId) -> bool {
        self.read().contains_key(&id)
    }

    /// Bumped on every registration change
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Create an instance of `module.type_name`, if that component exists.
    pub fn instantiate(&self, module: &str, type_name: &str) -> Option<Box<dyn Component>> {
        let module = self.find(module)?;
        let component = module.find_component(type_name)?;
        Some(component.instantiate())
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<ModuleId, Arc<HostModule>>> {
        self.modules.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<ModuleId, Arc<HostModule>>> {
        self.modules.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::component::PropertyDescriptor;

    struct Literal(String);

    impl Component for Literal {
        fn set_property(&mut self, name: &str, value: &str) -> Result<(), String> {
            match name {
                "Text" => {
                    self.0 = value.to_string();
                    Ok(())
                }
                _ => Err(format!("unknown property {}", name)),
            }
        }

        fn render(&self, out: &mut String) {
            out.push_str(&self.0);
        }
    }

    fn controls() -> ModuleBuilder {
        ModuleBuilder::new("web.controls")
            .component(
                ComponentDescriptor::new("Literal").property(PropertyDescriptor::string("Text")),
                || Box::new(Literal(String::new())),
            )
            .plain_type("Unit")
    }

    #[test]
    fn test_register_and_instantiate() {
        let host = ModuleHost::new();
        let id = host.register(controls());

        let module = host.get(id).unwrap();
        assert_eq!(module.name(), "web.controls");
        assert!(!module.is_dynamic());
        assert_eq!(module.plain_types(), ["Unit".to_string()]);

        let mut literal = host.instantiate("web.controls", "Literal").unwrap();
        literal.set_property("Text", "hi").unwrap();
        let mut out = String::new();
        literal.render(&mut out);
        assert_eq!(out, "hi");

        assert!(host.instantiate("web.controls", "Unit").is_none());
        assert!(host.instantiate("other", "Literal").is_none());
    }

    #[test]
    fn test_generation_and_replacement() {
        let host = ModuleHost::new();
        let first = host.register(controls());
        let g1 = host.generation();

        let second = host.register(controls());
        assert_ne!(first, second);
        assert!(host.generation() > g1);
        assert!(!host.contains(first));
        assert_eq!(host.modules().len(), 1);

        assert!(host.unregister(second));
        assert!(!host.unregister(second));
        assert!(host.modules().is_empty());
    }
}
