//! API layer configuration
//!
//! Global [`PageConfig`] singleton used by the default-constructed
//! [`PageCompiler`](crate::PageCompiler), the global gate and the logger.
//! Library users who need several configurations inject one explicitly with
//! `PageCompiler::with_config`.

use kpage_config::PageConfig;
use once_cell::sync::{Lazy, OnceCell};

static GLOBAL_CONFIG: OnceCell<PageConfig> = OnceCell::new();
static DEFAULT_CONFIG: Lazy<PageConfig> = Lazy::new(PageConfig::default);

/// Initialize the global configuration.
///
/// Only the first call wins; later calls get their config back as `Err`.
pub fn init(config: PageConfig) -> Result<(), PageConfig> {
    GLOBAL_CONFIG.set(config)
}

/// The global configuration, or the defaults when [`init`] was never called.
pub fn config() -> &'static PageConfig {
    GLOBAL_CONFIG.get().unwrap_or(&DEFAULT_CONFIG)
}

/// Check if config is initialized
pub fn is_initialized() -> bool {
    GLOBAL_CONFIG.get().is_some()
}
