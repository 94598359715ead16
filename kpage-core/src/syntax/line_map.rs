//! `#line` remapping
//!
//! Generated source carries `#line N "path"` directives pointing back at the
//! markup it was produced from. The map turns a generated line into the
//! markup path and line it stands for.

use super::token::Coordinate;
use crate::diagnostic::SourceLocation;

#[derive(Debug, Clone, PartialEq, Eq)]
struct LineRemap {
    /// First generated line the remap applies to
    from_line: u32,
    /// `None` restores the generated file's own numbering (`#line default`)
    target: Option<(String, u32)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineMap {
    remaps: Vec<LineRemap>,
}

impl LineMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `#line line "path"` found on `directive_line`.
    pub fn push_remap(&mut self, directive_line: u32, path: String, line: u32) {
        self.remaps.push(LineRemap {
            from_line: directive_line + 1,
            target: Some((path, line)),
        });
    }

    /// Record `#line default` found on `directive_line`.
    pub fn push_default(&mut self, directive_line: u32) {
        self.remaps.push(LineRemap {
            from_line: directive_line + 1,
            target: None,
        });
    }

    /// Map a generated line. `None` means the line is not remapped.
    pub fn map(&self, line: u32) -> Option<(&str, u32)> {
        let remap = self.remaps.iter().rev().find(|r| r.from_line <= line)?;
        let (path, target_line) = remap.target.as_ref()?;
        Some((path.as_str(), target_line + (line - remap.from_line)))
    }

    /// Location reported for `at` in the generated file `generated_path`.
    pub fn locate(&self, generated_path: &str, at: Coordinate) -> SourceLocation {
        let (path, line) = self.map(at.line).unwrap_or((generated_path, at.line));
        SourceLocation {
            path: path.to_string(),
            line,
            column: at.column,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.remaps.is_empty()
    }
}
