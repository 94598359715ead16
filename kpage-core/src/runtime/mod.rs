//! Runtime: host registry, component seam, loaded modules and the executor

pub mod component;
pub mod error;
pub mod executor;
pub mod host;
pub mod module;

pub use component::{Component, ComponentDescriptor, ComponentFactory, PropertyDescriptor, PropertyKind};
pub use error::RuntimeError;
pub use executor::Executor;
pub use host::{HostModule, ModuleBuilder, ModuleHost, ModuleId, RegisteredComponent};
pub use module::{LoadError, LoadedModule};
