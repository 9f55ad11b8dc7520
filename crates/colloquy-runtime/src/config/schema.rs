//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use colloquy_framework::{DEFAULT_MAX_FORWARDS, DEFAULT_NOT_FOUND_TEXT};
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColloquyConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub access: AccessConfig,

    #[serde(default)]
    pub callbacks: CallbackConfig,

    #[serde(default)]
    pub worker: WorkerConfig,
}

// =============================================================================
// Logging
// =============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` without it.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// File rotation policy for [`LogOutput::File`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Target file when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub rotation: LogRotation,

    /// Per-module levels, e.g. `colloquy_framework = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include file and line of each event.
    #[serde(default)]
    pub file_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            rotation: LogRotation::Never,
            filters: HashMap::new(),
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Dialog engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Ceiling on forward re-entries within one handling pass.
    #[serde(default = "default_max_forwards")]
    pub max_forwards: usize,

    /// Name of the built-in command listing; empty disables it.
    #[serde(default = "default_start_command")]
    pub start_command: String,

    /// Suggest similar commands when a command is not found.
    #[serde(default)]
    pub suggest_commands: bool,

    #[serde(default = "default_not_found_text")]
    pub not_found_text: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_forwards: default_max_forwards(),
            start_command: default_start_command(),
            suggest_commands: false,
            not_found_text: default_not_found_text(),
        }
    }
}

fn default_max_forwards() -> usize {
    DEFAULT_MAX_FORWARDS
}

fn default_start_command() -> String {
    "start".to_string()
}

fn default_not_found_text() -> String {
    DEFAULT_NOT_FOUND_TEXT.to_string()
}

/// State storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Commands whose state goes to the priority store.
    #[serde(default)]
    pub priority_commands: Vec<String>,
}

/// Access control and user-facing error texts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Chats allowed to talk to the bot; empty means everyone.
    #[serde(default)]
    pub allowed_chats: Vec<String>,

    #[serde(default)]
    pub denied_text: Option<String>,

    /// Enables the "please repeat" answer on internal errors.
    #[serde(default)]
    pub retry_text: Option<String>,
}

// =============================================================================
// Background work
// =============================================================================

/// Button callback registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackConfig {
    /// Age after which an unanswered callback is swept.
    #[serde(default = "default_callback_ttl")]
    pub ttl_secs: u64,

    #[serde(default = "default_clean_interval")]
    pub clean_interval_secs: u64,

    /// Capacity of the deletion queue.
    #[serde(default = "default_callback_queue")]
    pub queue_size: usize,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_callback_ttl(),
            clean_interval_secs: default_clean_interval(),
            queue_size: default_callback_queue(),
        }
    }
}

impl CallbackConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn clean_interval(&self) -> Duration {
        Duration::from_secs(self.clean_interval_secs)
    }
}

fn default_callback_ttl() -> u64 {
    3600
}

fn default_clean_interval() -> u64 {
    60
}

fn default_callback_queue() -> usize {
    1000
}

/// Message worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Capacity of the inbound message channel.
    #[serde(default = "default_worker_queue")]
    pub queue_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_size: default_worker_queue(),
        }
    }
}

fn default_worker_queue() -> usize {
    256
}
