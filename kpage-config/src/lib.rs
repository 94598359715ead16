//! Kpage Config - Pure configuration data structures
//!
//! This crate contains only data structures, no logic or global state.
//! It serves as the shared configuration vocabulary across all Kpage crates.
//! Loading these values from disk is left to the host application; every
//! type derives serde so a host can deserialize it from whatever format it uses.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Optimization level requested from the compilation backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    /// No instruction merging, full sequence points
    #[default]
    Debug,
    /// Adjacent text writes are merged
    Release,
}

impl BuildMode {
    /// Byte tag used in the binary image header
    pub fn as_u8(self) -> u8 {
        match self {
            BuildMode::Debug => 0,
            BuildMode::Release => 1,
        }
    }

    /// Inverse of [`BuildMode::as_u8`]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(BuildMode::Debug),
            1 => Some(BuildMode::Release),
            _ => None,
        }
    }
}

/// Configuration for compiler behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Optimization level
    pub build_mode: BuildMode,
    /// Whether to produce a debug-symbol stream at all
    pub emit_debug_symbols: bool,
    /// Whether original markup is embedded in the symbol stream
    pub embed_markup_sources: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            build_mode: BuildMode::Debug,
            emit_debug_symbols: true,
            embed_markup_sources: true,
        }
    }
}

/// Retry policy for reading markup files through a file provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadRetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Fixed wait between two attempts, in milliseconds
    pub backoff_ms: u64,
}

impl ReadRetryConfig {
    /// Backoff as a [`Duration`]
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for ReadRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_ms: 100,
        }
    }
}

/// Configuration for execution limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    /// Maximum nesting of `include` while rendering a page
    pub max_include_depth: usize,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_include_depth: 32,
        }
    }
}

/// How concurrent `compile` calls are arbitrated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyPolicy {
    /// One compilation in flight per process; others fail immediately
    #[default]
    Exclusive,
    /// One compilation in flight per root path; others wait their turn
    PerPath,
}

/// Log verbosity, mirrors `tracing::Level` without depending on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// Pipeline phase, used for phase-specific log filtering
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Reader,
    Catalog,
    Projector,
    Compiler,
    Loader,
    Runtime,
}

impl Phase {
    /// All phases, in pipeline order
    pub const ALL: [Phase; 6] = [
        Phase::Reader,
        Phase::Catalog,
        Phase::Projector,
        Phase::Compiler,
        Phase::Loader,
        Phase::Runtime,
    ];

    /// Get the string name of the phase
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Reader => "reader",
            Phase::Catalog => "catalog",
            Phase::Projector => "projector",
            Phase::Compiler => "compiler",
            Phase::Loader => "loader",
            Phase::Runtime => "runtime",
        }
    }

    /// Get the log target name for this phase
    pub fn target(&self) -> String {
        format!("kpage::{}", self.as_str())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level for every target
    pub global: LogLevel,
    /// Per-phase overrides
    pub phases: BTreeMap<Phase, LogLevel>,
}

impl LogConfig {
    /// Effective level of a phase: its override, or the global level
    pub fn level_for(&self, phase: Phase) -> LogLevel {
        self.phases.get(&phase).copied().unwrap_or(self.global)
    }
}

/// Everything the page compiler can be tuned with
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub compiler: CompilerConfig,
    pub retry: ReadRetryConfig,
    pub limits: LimitConfig,
    pub concurrency: ConcurrencyPolicy,
    pub log: LogConfig,
}
