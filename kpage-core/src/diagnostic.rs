//! Diagnostics shared by the markup generator contract and the compiler

use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A position in a markup or generated file (1-based)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub path: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({},{})", self.path, self.line, self.column)
    }
}

/// One reported problem: a stable identifier plus a human-readable message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub id: String,
    pub message: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    pub fn error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            severity: Severity::Error,
            location: None,
        }
    }

    pub fn warning(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(id, message)
        }
    }

    /// Attach a location.
    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match &self.location {
            Some(location) => write!(f, "{}: {} {}: {}", location, severity, self.id, self.message),
            None => write!(f, "{} {}: {}", severity, self.id, self.message),
        }
    }
}

/// Serialize a diagnostic list into the JSON byte payload carried by handles.
pub fn to_payload(diagnostics: &[Diagnostic]) -> Vec<u8> {
    // A Vec of plain structs with string keys cannot fail to serialize.
    serde_json::to_vec(diagnostics).unwrap_or_default()
}

/// Parse a payload produced by [`to_payload`].
pub fn from_payload(bytes: &[u8]) -> Result<Vec<Diagnostic>, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Whether any diagnostic in the list is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}
