//! Name binding
//!
//! Resolves every type, local and class name of the parsed units against the
//! reference set and the module's own classes. Produces a [`BoundModule`]
//! only when no error was reported; warnings ride along on the module and are
//! dropped when binding fails.

use super::references::{ModuleSymbols, ReferenceSet, TypeSymbol};
use crate::diagnostic::{Diagnostic, SourceLocation};
use crate::syntax::{ClassDecl, Coordinate, QualifiedName, StmtKind, SyntaxUnit};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A type of a referenced module
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef {
    pub module: String,
    pub name: String,
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundOp {
    Write(String),
    New { ty: TypeRef, slot: u32 },
    Set { slot: u32, property: String, value: String },
    Render { slot: u32 },
    Include { class: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundStmt {
    pub op: BoundOp,
    /// Mapped through `#line`, so usually a markup position
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct BoundClass {
    pub name: String,
    pub base: TypeRef,
    pub slot_count: u32,
    pub body: Vec<BoundStmt>,
    /// Index of the unit declaring the class
    pub unit: usize,
}

#[derive(Debug, Clone, Default)]
pub struct BoundModule {
    pub classes: Vec<BoundClass>,
    /// Non-fatal diagnostics, such as locals that are never rendered
    pub warnings: Vec<Diagnostic>,
}

/// Bind `units` against `references`.
pub fn bind(units: &[SyntaxUnit], references: &ReferenceSet) -> Result<BoundModule, Vec<Diagnostic>> {
    let mut binder = Binder {
        references,
        diagnostics: Vec::new(),
    };
    let module = binder.bind_units(units);
    if binder.diagnostics.iter().any(Diagnostic::is_error) {
        let errors: Vec<Diagnostic> = binder.diagnostics.into_iter().filter(Diagnostic::is_error).collect();
        debug!(target: "kpage::compiler", errors = errors.len(), "binding failed");
        return Err(errors);
    }
    Ok(BoundModule {
        warnings: binder.diagnostics,
        ..module
    })
}

struct Binder<'a> {
    references: &'a ReferenceSet,
    diagnostics: Vec<Diagnostic>,
}

/// Per-unit context
struct Scope<'u, 'a> {
    unit: &'u SyntaxUnit,
    uses: Vec<&'a ModuleSymbols>,
}

impl Scope<'_, '_> {
    fn locate(&self, at: Coordinate) -> SourceLocation {
        self.unit.line_map.locate(&self.unit.path, at)
    }
}

struct Local<'a> {
    slot: u32,
    ty: Option<&'a TypeSymbol>,
    type_ref: Option<TypeRef>,
    declared_at: SourceLocation,
    rendered: bool,
}

impl<'a> Binder<'a> {
    fn error(&mut self, id: &str, message: String, location: SourceLocation) {
        self.diagnostics.push(Diagnostic::error(id, message).at(location));
    }

    fn bind_units(&mut self, units: &[SyntaxUnit]) -> BoundModule {
        let class_names = self.declare_classes(units);
        let mut module = BoundModule::default();

        for (index, unit) in units.iter().enumerate() {
            let scope = self.unit_scope(unit);
            for class in unit.classes() {
                if let Some(bound) = self.bind_class(&scope, class, &class_names, index) {
                    module.classes.push(bound);
                }
            }
        }
        module
    }

    fn declare_classes(&mut self, units: &[SyntaxUnit]) -> HashSet<String> {
        let mut names = HashSet::new();
        for unit in units {
            for class in unit.classes() {
                if !names.insert(class.name.clone()) {
                    let location = unit.line_map.locate(&unit.path, class.start);
                    self.error(
                        "KP0101",
                        format!("The module already contains a definition for '{}'", class.name),
                        location,
                    );
                }
            }
        }
        names
    }

    fn unit_scope<'u>(&mut self, unit: &'u SyntaxUnit) -> Scope<'u, 'a> {
        let mut scope = Scope {
            unit,
            uses: Vec::new(),
        };
        for decl in unit.uses() {
            let name = decl.module.to_string();
            match self.references.find(&name) {
                Some(module) => {
                    if !scope.uses.iter().any(|m| m.name == module.name) {
                        scope.uses.push(module);
                    }
                }
                None => {
                    let location = scope.locate(decl.module.start);
                    self.error("KP0246", missing_type_message(&name), location);
                }
            }
        }
        scope
    }

    fn resolve_type(&mut self, scope: &Scope<'_, 'a>, name: &QualifiedName) -> Option<(TypeRef, &'a TypeSymbol)> {
        let location = scope.locate(name.start);

        if let Some(qualifier) = name.qualifier() {
            let Some(module) = self.references.find(&qualifier) else {
                self.error("KP0246", missing_type_message(&name.to_string()), location);
                return None;
            };
            let Some(symbol) = module.get(name.name()) else {
                self.error(
                    "KP0234",
                    format!(
                        "The type name '{}' does not exist in the namespace '{}' (are you missing a reference?)",
                        name.name(),
                        qualifier
                    ),
                    location,
                );
                return None;
            };
            return Some((type_ref_of(module, symbol), symbol));
        }

        let candidates: Vec<(&'a ModuleSymbols, &'a TypeSymbol)> = scope
            .uses
            .iter()
            .copied()
            .filter_map(|module| module.get(name.name()).map(|symbol| (module, symbol)))
            .collect();
        match candidates.as_slice() {
            [] => {
                self.error("KP0246", missing_type_message(name.name()), location);
                None
            }
            [(module, symbol)] => Some((type_ref_of(module, symbol), *symbol)),
            [(first, _), (second, _), ..] => {
                self.error(
                    "KP0104",
                    format!(
                        "'{0}' is an ambiguous reference between '{1}.{0}' and '{2}.{0}'",
                        name.name(),
                        first.name,
                        second.name
                    ),
                    location,
                );
                None
            }
        }
    }

    fn bind_class(
        &mut self,
        scope: &Scope<'_, 'a>,
        class: &ClassDecl,
        class_names: &HashSet<String>,
        unit: usize,
    ) -> Option<BoundClass> {
        let base = self.resolve_type(scope, &class.base).map(|(r, _)| r);
        let mut locals: HashMap<String, Local<'a>> = HashMap::new();
        let mut body = Vec::with_capacity(class.body.len());

        for stmt in &class.body {
            let location = scope.locate(stmt.start);
            let op = match &stmt.kind {
                StmtKind::Write(text) => Some(BoundOp::Write(text.clone())),
                StmtKind::Let { name, ty } => {
                    let resolved = self.resolve_type(scope, ty);
                    if let Some((type_ref, symbol)) = &resolved {
                        if !symbol.is_component {
                            self.error(
                                "KP0144",
                                format!("Cannot create an instance of the non-component type '{}'", type_ref),
                                location.clone(),
                            );
                        }
                    }
                    if locals.contains_key(name) {
                        self.error(
                            "KP0128",
                            format!("A local variable named '{}' is already defined in this scope", name),
                            location.clone(),
                        );
                        None
                    } else {
                        let slot = locals.len() as u32;
                        let (type_ref, ty) = match resolved {
                            Some((type_ref, symbol)) => (Some(type_ref), Some(symbol)),
                            None => (None, None),
                        };
                        locals.insert(
                            name.clone(),
                            Local {
                                slot,
                                ty,
                                type_ref: type_ref.clone(),
                                declared_at: location.clone(),
                                rendered: false,
                            },
                        );
                        type_ref.map(|ty| BoundOp::New { ty, slot })
                    }
                }
                StmtKind::Set {
                    target,
                    property,
                    value,
                } => match locals.get(target) {
                    Some(local) => {
                        if let (Some(ty), Some(type_ref)) = (local.ty, &local.type_ref) {
                            if !ty.assignable.contains(property) {
                                self.error(
                                    "KP0117",
                                    format!("'{}' does not contain a settable property named '{}'", type_ref, property),
                                    location.clone(),
                                );
                            }
                        }
                        Some(BoundOp::Set {
                            slot: local.slot,
                            property: property.clone(),
                            value: value.clone(),
                        })
                    }
                    None => {
                        self.error("KP0103", missing_name_message(target), location.clone());
                        None
                    }
                },
                StmtKind::Render(target) => match locals.get_mut(target) {
                    Some(local) => {
                        local.rendered = true;
                        Some(BoundOp::Render { slot: local.slot })
                    }
                    None => {
                        self.error("KP0103", missing_name_message(target), location.clone());
                        None
                    }
                },
                StmtKind::Include(class_name) => {
                    if class_names.contains(class_name) {
                        Some(BoundOp::Include {
                            class: class_name.clone(),
                        })
                    } else {
                        self.error("KP0103", missing_name_message(class_name), location.clone());
                        None
                    }
                }
            };
            if let Some(op) = op {
                body.push(BoundStmt { op, location });
            }
        }

        let mut unrendered: Vec<(&String, &Local<'a>)> = locals.iter().filter(|(_, l)| !l.rendered).collect();
        unrendered.sort_by_key(|(_, l)| l.slot);
        for (name, local) in unrendered {
            self.diagnostics.push(
                Diagnostic::warning(
                    "KP0168",
                    format!("The variable '{}' is declared but never rendered", name),
                )
                .at(local.declared_at.clone()),
            );
        }

        Some(BoundClass {
            name: class.name.clone(),
            base: base?,
            slot_count: locals.len() as u32,
            body,
            unit,
        })
    }
}

fn type_ref_of(module: &ModuleSymbols, symbol: &TypeSymbol) -> TypeRef {
    TypeRef {
        module: module.name.clone(),
        name: symbol.name.clone(),
    }
}

fn missing_type_message(name: &str) -> String {
    format!(
        "The type or namespace name '{}' could not be found (are you missing a reference?)",
        name
    )
}

fn missing_name_message(name: &str) -> String {
    format!("The name '{}' does not exist in the current context", name)
}
