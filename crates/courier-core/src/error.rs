//! Unified error types for the Courier core.
//!
//! This module provides the error taxonomy used by the API handle, the RPC
//! method invoker and the transport seam. Dispatch-level failures are carried
//! as [`BoxError`] so that handlers may fail with any error type.

use std::time::Duration;

use thiserror::Error;

use crate::retry::Retryable;

/// Type-erased error returned by handlers, middleware and plugins.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur while moving a request over the wire.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The request could not be delivered.
    #[error("request to '{method}' failed: {reason}")]
    RequestFailed {
        /// The remote method being called.
        method: String,
        /// Reason for failure.
        reason: String,
    },

    /// The response body could not be decoded as an envelope.
    #[error("malformed response from '{method}': {reason}")]
    MalformedResponse {
        /// The remote method being called.
        method: String,
        /// Reason for failure.
        reason: String,
    },

    /// Transport not available.
    #[error("transport '{transport}' not available")]
    NotAvailable {
        /// The transport type that's not available.
        transport: &'static str,
    },

    /// Invalid configuration.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),
}

// =============================================================================
// API Errors
// =============================================================================

/// Error type for outbound API calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The platform asked us to slow down. This is the only retryable kind.
    #[error("rate limited, retry after {}s: {description}", retry_after.as_secs())]
    RateLimited {
        /// Server-suggested wait before the next attempt.
        retry_after: Duration,
        /// Description returned by the platform.
        description: String,
    },

    /// The platform does not know the method.
    #[error("trying to call undefined method [{method}]")]
    UnknownMethod {
        /// The method name as called.
        method: String,
    },

    /// The bot credential was rejected.
    #[error("you must provide a valid token")]
    Unauthorized,

    /// The platform refused the call with a code that has no dedicated kind.
    #[error("platform rejected the call ({code}): {description}")]
    Api {
        /// Platform error code.
        code: i64,
        /// Description returned by the platform.
        description: String,
    },

    /// Call arguments could not be normalized into a single mapping.
    #[error("invalid call arguments: {0}")]
    InvalidArguments(String),

    /// Failed to serialize/deserialize.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ApiError {
    /// Returns `true` if this is a rate-limit failure.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

impl Retryable for ApiError {
    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;
