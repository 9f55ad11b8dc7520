//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{CallbackConfig, ColloquyConfig, EngineConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &ColloquyConfig) -> ConfigResult<()> {
    validate_logging(&config.logging)?;
    validate_engine(&config.engine)?;
    validate_callbacks(&config.callbacks)?;

    if config.worker.queue_size == 0 {
        return Err(ConfigError::validation(
            "worker.queue_size must be greater than 0",
        ));
    }

    if config.storage.priority_commands.iter().any(|c| c.is_empty()) {
        return Err(ConfigError::validation(
            "storage.priority_commands cannot contain empty names",
        ));
    }

    if config.access.allowed_chats.iter().any(|c| c.is_empty()) {
        return Err(ConfigError::validation(
            "access.allowed_chats cannot contain empty ids",
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is \"file\"",
        ));
    }

    if let Some(module) = logging.filters.keys().find(|m| m.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "invalid logging filter module: {module:?}"
        )));
    }

    Ok(())
}

fn validate_engine(engine: &EngineConfig) -> ConfigResult<()> {
    if engine.max_forwards == 0 {
        return Err(ConfigError::validation(
            "engine.max_forwards must be greater than 0",
        ));
    }

    if engine.start_command.contains(char::is_whitespace) {
        return Err(ConfigError::validation(
            "engine.start_command cannot contain whitespace",
        ));
    }

    Ok(())
}

fn validate_callbacks(callbacks: &CallbackConfig) -> ConfigResult<()> {
    if callbacks.ttl_secs == 0 {
        return Err(ConfigError::validation("callbacks.ttl_secs must be greater than 0"));
    }

    if callbacks.clean_interval_secs == 0 {
        return Err(ConfigError::validation(
            "callbacks.clean_interval_secs must be greater than 0",
        ));
    }

    if callbacks.queue_size == 0 {
        return Err(ConfigError::validation(
            "callbacks.queue_size must be greater than 0",
        ));
    }

    Ok(())
}
