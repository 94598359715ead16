//! Page-script syntax tree

use super::line_map::LineMap;
use super::token::Coordinate;
use std::fmt;

/// One parsed generated-source file
#[derive(Debug, Clone)]
pub struct SyntaxUnit {
    /// Path the generated source is tagged with
    pub path: String,
    pub items: Vec<Item>,
    pub line_map: LineMap,
}

impl SyntaxUnit {
    pub fn uses(&self) -> impl Iterator<Item = &UseDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Use(decl) => Some(decl),
            _ => None,
        })
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Class(decl) => Some(decl),
            _ => None,
        })
    }
}

#[derive(Debug, Clone)]
pub enum Item {
    Use(UseDecl),
    Class(ClassDecl),
}

/// `use web.controls;`
#[derive(Debug, Clone)]
pub struct UseDecl {
    pub module: QualifiedName,
}

/// Dotted name such as `web.controls.Label`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub segments: Vec<String>,
    pub start: Coordinate,
}

impl QualifiedName {
    /// Last segment
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Everything before the last segment, joined with dots
    pub fn qualifier(&self) -> Option<String> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(self.segments[..self.segments.len() - 1].join("."))
    }

    pub fn is_qualified(&self) -> bool {
        self.segments.len() > 1
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// `class Name : Base { ... }`
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub base: QualifiedName,
    pub body: Vec<Stmt>,
    pub start: Coordinate,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub start: Coordinate,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// `write "text";`
    Write(String),
    /// `let name = new Type;`
    Let { name: String, ty: QualifiedName },
    /// `set target.Property = "value";`
    Set {
        target: String,
        property: String,
        value: String,
    },
    /// `render name;`
    Render(String),
    /// `include ClassName;`
    Include(String),
}
