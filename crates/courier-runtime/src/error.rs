//! Runtime error types.

use thiserror::Error;

use courier_core::TransportError;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The transport could not be built.
    #[error("Failed to create transport: {0}")]
    Transport(#[from] TransportError),

    /// No bot token configured for the HTTP transport.
    #[error("Missing bot token: set `bot.token` or COURIER_BOT__TOKEN")]
    MissingToken,

    /// An inbound payload is not a JSON object.
    #[error("Update payload must be a JSON object, got {0}")]
    InvalidPayload(&'static str),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
