//! Configuration module for the Colloquy runtime.
//!
//! Layered loading through figment, schema with per-section defaults, and
//! validation of the loaded values.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    AccessConfig, CallbackConfig, ColloquyConfig, EngineConfig, LogFormat, LogLevel, LogOutput,
    LogRotation, LoggingConfig, SpanEventConfig, StorageConfig, WorkerConfig,
};
pub use validation::validate_config;
