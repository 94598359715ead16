//! Reference catalog
//!
//! Turns the non-dynamic modules registered with a [`ModuleHost`] into the
//! compiler's reference set plus the component metadata markup generators
//! consume.
//!
//! Reference entries are cached by module id and stamped with the
//! registration generation; entries of modules that are gone are evicted on
//! the next scan. Metadata is never cached: it always reflects the modules
//! registered right now.

use kpage_core::{ComponentDescriptor, ModuleHost, ModuleId, ModuleSymbols, PropertyKind, ReferenceSet};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use tracing::debug;

static GLOBAL_CATALOG: Lazy<Arc<ReferenceCatalog>> = Lazy::new(|| Arc::new(ReferenceCatalog::new()));

/// Facts about one component type, as seen by markup generators
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ComponentMetadata {
    /// Name of the module that registered the type
    pub namespace: String,
    pub name: String,
    pub default_property: Option<String>,
    pub validation_property: Option<String>,
    pub default_event: Option<String>,
    pub supports_event_validation: bool,
    pub event_properties: Vec<String>,
    pub string_properties: Vec<String>,
    pub other_properties: Vec<String>,
}

impl ComponentMetadata {
    /// Harvest metadata from a descriptor. Only public, settable
    /// properties with a declared default are listed.
    pub fn from_descriptor(namespace: &str, descriptor: &ComponentDescriptor) -> Self {
        let mut metadata = ComponentMetadata {
            namespace: namespace.to_string(),
            name: descriptor.name.clone(),
            default_property: descriptor.default_property.clone(),
            validation_property: descriptor.validation_property.clone(),
            default_event: descriptor.default_event.clone(),
            supports_event_validation: descriptor.supports_event_validation,
            ..Self::default()
        };
        for property in descriptor
            .properties
            .iter()
            .filter(|p| p.is_assignable() && p.default_value.is_some())
        {
            let bucket = match property.kind {
                PropertyKind::Event => &mut metadata.event_properties,
                PropertyKind::String => &mut metadata.string_properties,
                PropertyKind::Other => &mut metadata.other_properties,
            };
            bucket.push(property.name.clone());
        }
        metadata
    }

    /// `namespace.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

/// A cached compile-time reference to one registered module
#[derive(Debug, Clone)]
pub struct ReferenceEntry {
    generation: u64,
    symbols: Arc<ModuleSymbols>,
}

impl ReferenceEntry {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn symbols(&self) -> &Arc<ModuleSymbols> {
        &self.symbols
    }
}

/// Result of one scan
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub references: ReferenceSet,
    pub components: Vec<ComponentMetadata>,
}

#[derive(Debug, Default)]
pub struct ReferenceCatalog {
    entries: RwLock<HashMap<ModuleId, ReferenceEntry>>,
}

impl ReferenceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared catalog used when no explicit catalog is injected.
    pub fn global() -> Arc<ReferenceCatalog> {
        Arc::clone(&GLOBAL_CATALOG)
    }

    /// Scan every non-dynamic module registered with `host`.
    pub fn snapshot(&self, host: &ModuleHost) -> CatalogSnapshot {
        let modules: Vec<_> = host.modules().into_iter().filter(|m| !m.is_dynamic()).collect();
        let live: HashSet<ModuleId> = modules.iter().map(|m| m.id()).collect();

        let mut references = ReferenceSet::new();
        let mut components = Vec::new();
        let mut reused = 0usize;

        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|id, _| live.contains(id));
        let evicted = before - entries.len();

        for module in &modules {
            let symbols = match entries.get(&module.id()) {
                Some(entry) if entry.generation == module.generation() => {
                    reused += 1;
                    Arc::clone(&entry.symbols)
                }
                _ => {
                    let symbols = Arc::new(ModuleSymbols::from_module(module));
                    entries.insert(
                        module.id(),
                        ReferenceEntry {
                            generation: module.generation(),
                            symbols: Arc::clone(&symbols),
                        },
                    );
                    symbols
                }
            };
            references.push(symbols);
            components.extend(
                module
                    .components()
                    .iter()
                    .map(|c| ComponentMetadata::from_descriptor(module.name(), &c.descriptor)),
            );
        }
        drop(entries);

        debug!(
            target: "kpage::catalog",
            modules = modules.len(),
            reused,
            evicted,
            components = components.len(),
            "reference snapshot"
        );
        CatalogSnapshot {
            references,
            components,
        }
    }

    /// Cached entry for `id`, if any.
    pub fn entry(&self, id: ModuleId) -> Option<ReferenceEntry> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&id)
            .cloned()
    }

    /// Drop every cached entry.
    pub fn invalidate(&self) {
        let mut entries = self.write();
        debug!(target: "kpage::catalog", dropped = entries.len(), "reference cache invalidated");
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ModuleId, ReferenceEntry>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
