//! Compile-time references
//!
//! A [`ModuleSymbols`] is the compiler's view of one registered module: the
//! type names it exports and which properties page script may assign.

use crate::runtime::HostModule;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSymbol {
    pub name: String,
    /// Instantiable with `new`
    pub is_component: bool,
    /// Public settable properties
    pub assignable: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSymbols {
    pub name: String,
    types: BTreeMap<String, TypeSymbol>,
}

impl ModuleSymbols {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: BTreeMap::new(),
        }
    }

    /// Symbols exported by a registered module.
    pub fn from_module(module: &HostModule) -> Self {
        let mut symbols = Self::new(module.name());
        for component in module.components() {
            let descriptor = &component.descriptor;
            symbols.add_type(TypeSymbol {
                name: descriptor.name.clone(),
                is_component: true,
                assignable: descriptor
                    .properties
                    .iter()
                    .filter(|p| p.is_assignable())
                    .map(|p| p.name.clone())
                    .collect(),
            });
        }
        for name in module.plain_types() {
            symbols.add_type(TypeSymbol {
                name: name.clone(),
                is_component: false,
                assignable: BTreeSet::new(),
            });
        }
        symbols
    }

    pub fn add_type(&mut self, symbol: TypeSymbol) {
        self.types.insert(symbol.name.clone(), symbol);
    }

    pub fn get(&self, name: &str) -> Option<&TypeSymbol> {
        self.types.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeSymbol> {
        self.types.values()
    }
}

/// The set of modules a compilation may reference
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    modules: Vec<Arc<ModuleSymbols>>,
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, module: Arc<ModuleSymbols>) {
        self.modules.push(module);
    }

    pub fn find(&self, name: &str) -> Option<&ModuleSymbols> {
        self.modules
            .iter()
            .map(Arc::as_ref)
            .find(|m| m.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleSymbols> {
        self.modules.iter().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl FromIterator<Arc<ModuleSymbols>> for ReferenceSet {
    fn from_iter<I: IntoIterator<Item = Arc<ModuleSymbols>>>(iter: I) -> Self {
        Self {
            modules: iter.into_iter().collect(),
        }
    }
}
