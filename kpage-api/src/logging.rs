//! Logging initialization
//!
//! Built on `tracing` and `tracing-subscriber` with per-phase filtering:
//! every pipeline phase logs on its own target (`kpage::reader`,
//! `kpage::compiler`, ...) and [`LogConfig`] assigns each a level.
//!
//! # Usage
//! ```ignore
//! use kpage_api::{config, logging};
//!
//! config::init(kpage_config::PageConfig::default()).ok();
//! logging::init().ok();
//! ```

use crate::config;
use kpage_config::{LogConfig, LogLevel, Phase};
use std::io;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, layer::SubscriberExt, Layer, Registry};

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Colored multi-line output for development
    #[default]
    Pretty,
    /// One line per event
    Compact,
    /// JSON lines for tooling
    Json,
}

/// Initialize logging from the global configuration.
pub fn init() -> Result<(), TryInitError> {
    init_with_format(LogFormat::default())
}

/// Initialize logging from the global configuration with `format`.
///
/// Fails when a global subscriber is already installed.
pub fn init_with_format(format: LogFormat) -> Result<(), TryInitError> {
    let layer = create_format_layer(format, io::stdout).with_filter(targets(&config::config().log));
    tracing_subscriber::registry().with(layer).try_init()
}

/// Target filter for `config`: the global level as default, one entry per
/// phase.
pub fn targets(config: &LogConfig) -> Targets {
    Phase::ALL.iter().fold(
        Targets::new()
            .with_default(level_filter(config.global))
            .with_target("kpage::vfs", level_filter(config.global)),
        |targets, phase| targets.with_target(phase.target(), level_filter(config.level_for(*phase))),
    )
}

fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Trace => LevelFilter::TRACE,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Error => LevelFilter::ERROR,
    }
}

fn create_format_layer<W, F>(format: LogFormat, make_writer: F) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: io::Write + Send + Sync + 'static,
    F: Fn() -> W + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(true)
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .without_time()
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(make_writer)
            .boxed(),
    }
}

/// Simple console logging for tests; a no-op when a subscriber exists.
pub fn init_test_logger() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tracing::Level;

    #[test]
    fn test_log_format_default() {
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
    }

    #[test]
    fn test_targets_apply_phase_overrides() {
        let config = LogConfig {
            global: LogLevel::Warn,
            phases: BTreeMap::from([(Phase::Loader, LogLevel::Trace)]),
        };
        let targets = targets(&config);
        assert!(targets.would_enable("kpage::loader", &Level::TRACE));
        assert!(!targets.would_enable("kpage::reader", &Level::INFO));
        assert!(targets.would_enable("kpage::reader", &Level::WARN));
        assert!(!targets.would_enable("other", &Level::DEBUG));
    }
}
