//! Component seam
//!
//! Component libraries register their types with the [`ModuleHost`] as a
//! descriptor plus a factory. The compiler reads descriptors; the executor
//! calls factories.
//!
//! [`ModuleHost`]: super::host::ModuleHost

use std::sync::Arc;

/// A renderable UI component instance
pub trait Component: Send {
    /// Assign a string value to a property. `Err` carries a reason.
    fn set_property(&mut self, name: &str, value: &str) -> Result<(), String>;

    /// Append the component's output to `out`.
    fn render(&self, out: &mut String);
}

/// Creates fresh component instances
pub type ComponentFactory = Arc<dyn Fn() -> Box<dyn Component> + Send + Sync>;

/// Declared type of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Event,
    String,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub kind: PropertyKind,
    pub public: bool,
    pub settable: bool,
    pub default_value: Option<String>,
}

impl PropertyDescriptor {
    fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            public: true,
            settable: true,
            default_value: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::String)
    }

    pub fn event(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Event)
    }

    pub fn other(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Other)
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.settable = false;
        self
    }

    pub fn internal(mut self) -> Self {
        self.public = false;
        self
    }

    /// Public and settable: assignable from page script.
    pub fn is_assignable(&self) -> bool {
        self.public && self.settable
    }
}

/// Facts a component type declares about itself
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComponentDescriptor {
    pub name: String,
    pub default_property: Option<String>,
    pub validation_property: Option<String>,
    pub default_event: Option<String>,
    pub supports_event_validation: bool,
    pub properties: Vec<PropertyDescriptor>,
}

impl ComponentDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn default_property(mut self, name: impl Into<String>) -> Self {
        self.default_property = Some(name.into());
        self
    }

    pub fn validation_property(mut self, name: impl Into<String>) -> Self {
        self.validation_property = Some(name.into());
        self
    }

    pub fn default_event(mut self, name: impl Into<String>) -> Self {
        self.default_event = Some(name.into());
        self
    }

    pub fn event_validation(mut self, supported: bool) -> Self {
        self.supports_event_validation = supported;
        self
    }

    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    pub fn find_property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }
}
