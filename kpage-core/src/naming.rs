//! Deterministic names derived from markup paths
//!
//! Markup generators and the compiler must agree on these, otherwise the
//! loader reports "type not found" after a successful compile.

use sha2::{Digest, Sha256};

/// Entry-class name for the markup file at `path`.
///
/// The readable part maps every non-alphanumeric character to `_`, so
/// `/a/b.kpart` and `/a_b.kpart` would meet; the suffix is the first four
/// bytes of the path's SHA-256 and keeps them apart.
///
/// ```rust
/// use kpage_core::naming::class_name_for;
///
/// let class = class_name_for("/pages/Index.kpage");
/// assert!(class.starts_with("Page_pages_Index_kpage_"));
/// assert_ne!(class_name_for("/my-page.kpage"), class_name_for("/my_page.kpage"));
/// ```
pub fn class_name_for(path: &str) -> String {
    let sanitized: String = path
        .trim_start_matches('/')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let digest = Sha256::digest(path.as_bytes());
    let suffix: String = digest[..4].iter().map(|b| format!("{:02x}", b)).collect();
    format!("Page_{}_{}", sanitized, suffix)
}

/// Name of the compiled module that hosts `class`.
pub fn module_name_for(class: &str) -> String {
    format!("Compiled.{}", class)
}

/// Path the generated page script of `markup_path` is tagged with.
pub fn generated_path_for(markup_path: &str) -> String {
    format!("{}.g.kps", markup_path)
}
