//! Runtime errors

use crate::binary::ReadError;
use crate::diagnostic::SourceLocation;

fn at(location: &Option<SourceLocation>) -> String {
    match location {
        Some(location) => format!(" at {}", location),
        None => String::new(),
    }
}

/// Failure while rendering a loaded class
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("component type '{type_name}' is not registered with the host{}", at(.location))]
    TypeUnavailable {
        type_name: String,
        location: Option<SourceLocation>,
    },

    #[error("cannot set property '{property}': {message}{}", at(.location))]
    Property {
        property: String,
        message: String,
        location: Option<SourceLocation>,
    },

    #[error("local slot {slot} used before initialization{}", at(.location))]
    UninitializedSlot {
        slot: u32,
        location: Option<SourceLocation>,
    },

    #[error("include depth limit {limit} exceeded while entering '{class}'{}", at(.location))]
    IncludeDepth {
        class: String,
        limit: usize,
        location: Option<SourceLocation>,
    },

    #[error("corrupted module: {0}")]
    Corrupt(#[from] ReadError),
}

impl RuntimeError {
    /// Markup position the error was raised at, when symbols were loaded
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            RuntimeError::TypeUnavailable { location, .. }
            | RuntimeError::Property { location, .. }
            | RuntimeError::UninitializedSlot { location, .. }
            | RuntimeError::IncludeDepth { location, .. } => location.as_ref(),
            RuntimeError::Corrupt(_) => None,
        }
    }
}
