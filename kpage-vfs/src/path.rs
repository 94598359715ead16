//! Virtual path helpers
//!
//! Virtual paths always use `/`, always start with `/`, and never contain
//! `.` or `..` segments once normalized. `~/` is accepted as an alias for the
//! application root.

use crate::error::{VfsError, VfsResult};

/// Normalize a virtual path.
///
/// ```rust
/// use kpage_vfs::path::normalize;
///
/// assert_eq!(normalize("~/pages/./a.kpage").unwrap(), "/pages/a.kpage");
/// assert_eq!(normalize("pages\\b.kpage").unwrap(), "/pages/b.kpage");
/// assert!(normalize("/../secret").is_err());
/// ```
pub fn normalize(path: &str) -> VfsResult<String> {
    let unified = path.replace('\\', "/");
    let trimmed = unified.strip_prefix('~').unwrap_or(&unified);

    let mut segments: Vec<&str> = Vec::new();
    for segment in trimmed.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(VfsError::InvalidPath {
                        path: path.to_string(),
                        reason: "escapes the provider root".to_string(),
                    });
                }
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Err(VfsError::InvalidPath {
            path: path.to_string(),
            reason: "does not name a file".to_string(),
        });
    }

    Ok(format!("/{}", segments.join("/")))
}

/// Resolve `reference`, as written inside the file at `from`, to a normalized
/// virtual path. Rooted references (`/x`, `~/x`) ignore `from`.
///
/// ```rust
/// use kpage_vfs::path::resolve;
///
/// assert_eq!(resolve("/pages/a.kpage", "parts/b.kpart").unwrap(), "/pages/parts/b.kpart");
/// assert_eq!(resolve("/pages/a.kpage", "../c.kpart").unwrap(), "/c.kpart");
/// assert_eq!(resolve("/pages/a.kpage", "~/d.kpart").unwrap(), "/d.kpart");
/// ```
pub fn resolve(from: &str, reference: &str) -> VfsResult<String> {
    let reference = reference.trim();
    if reference.starts_with('/') || reference.starts_with('~') || reference.starts_with('\\') {
        return normalize(reference);
    }
    normalize(&format!("{}/{}", parent(from), reference))
}

/// Directory part of a virtual path (`/` for top-level files).
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

/// Last segment of a virtual path.
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_segments() {
        assert_eq!(normalize("/a//b/./c/../d.kpage").unwrap(), "/a/b/d.kpage");
        assert_eq!(normalize("a.kpage").unwrap(), "/a.kpage");
    }

    #[test]
    fn test_normalize_rejects_root_and_escape() {
        assert!(matches!(normalize("/"), Err(VfsError::InvalidPath { .. })));
        assert!(matches!(normalize("/a/../../b"), Err(VfsError::InvalidPath { .. })));
    }

    #[test]
    fn test_resolve_relative_to_top_level_file() {
        assert_eq!(resolve("/index.kpage", "header.kpart").unwrap(), "/header.kpart");
    }

    #[test]
    fn test_parent_and_file_name() {
        assert_eq!(parent("/a/b/c.kpage"), "/a/b");
        assert_eq!(parent("/c.kpage"), "/");
        assert_eq!(file_name("/a/b/c.kpage"), "c.kpage");
    }
}
