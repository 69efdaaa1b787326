//! Configuration module for the Courier runtime.
//!
//! This module provides figment-based configuration loading and validation
//! for the bot identity, the outbound API and logging.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    ApiConfig, BotConfig, CourierConfig, LogFormat, LogLevel, LogOutput, LogRotation,
    LoggingConfig, RuntimeConfig, SpanEventConfig,
};
pub use validation::{validate_config, validate_token};
