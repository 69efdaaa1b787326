//! Interpretation of response envelopes.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use super::methods::{MethodSpec, ResponseKind};
use crate::error::{ApiError, ApiResult};
use crate::transport::RpcEnvelope;

/// Wait assumed when a 429 envelope carries no `retry_after`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Result of one remote call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// A primitive result (`true`, a number, a string, `null`).
    Scalar(Value),
    /// An object result of a registered type.
    Object {
        /// Registered response type for the method.
        kind: ResponseKind,
        /// Raw result.
        value: Value,
    },
    /// Anything the method table has no type for.
    Fallback(FallbackResponse),
}

/// Generic carrier for unregistered or anomalous responses.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackResponse {
    /// Method that produced this response.
    pub method: String,
    /// Envelope `ok` flag.
    pub ok: bool,
    /// Envelope result, if any.
    pub result: Option<Value>,
    /// Platform error code, if the call failed.
    pub error_code: Option<i64>,
    /// Platform description, if any.
    pub description: Option<String>,
}

impl ApiResponse {
    /// Registered response type, if the result was an object of a known type.
    pub fn kind(&self) -> Option<ResponseKind> {
        match self {
            Self::Object { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Returns `true` if no typed response was available.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    /// Borrowed raw result.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) | Self::Object { value, .. } => Some(value),
            Self::Fallback(fallback) => fallback.result.as_ref(),
        }
    }

    /// Decodes the result into `T`.
    ///
    /// A fallback produced by a failed call yields [`ApiError::Api`].
    pub fn deserialize<T: DeserializeOwned>(self) -> ApiResult<T> {
        let value = match self {
            Self::Scalar(value) | Self::Object { value, .. } => value,
            Self::Fallback(FallbackResponse {
                ok: false,
                error_code,
                description,
                ..
            }) => {
                return Err(ApiError::Api {
                    code: error_code.unwrap_or_default(),
                    description: description.unwrap_or_default(),
                });
            }
            Self::Fallback(FallbackResponse { result, .. }) => result.unwrap_or(Value::Null),
        };
        Ok(serde_json::from_value(value)?)
    }
}

/// Maps an envelope onto a response or a classified failure.
pub(crate) fn interpret(
    method: &str,
    spec: MethodSpec,
    envelope: RpcEnvelope,
) -> ApiResult<ApiResponse> {
    if !envelope.ok {
        return match envelope.error_code {
            Some(429) => Err(ApiError::RateLimited {
                retry_after: std::time::Duration::from_secs(
                    envelope.retry_after().unwrap_or(DEFAULT_RETRY_AFTER_SECS),
                ),
                description: envelope.description.unwrap_or_default(),
            }),
            Some(404) => Err(ApiError::UnknownMethod {
                method: method.to_owned(),
            }),
            Some(401) => Err(ApiError::Unauthorized),
            code => {
                warn!(
                    method,
                    error_code = ?code,
                    description = envelope.description.as_deref().unwrap_or(""),
                    "Remote call failed without a dedicated error kind"
                );
                Ok(fallback(method, envelope))
            }
        };
    }

    let Some(value) = envelope.result.as_ref() else {
        return Ok(fallback(method, envelope));
    };
    if is_scalar(value) {
        return Ok(ApiResponse::Scalar(value.clone()));
    }
    match spec.response {
        Some(kind) => Ok(ApiResponse::Object {
            kind,
            value: value.clone(),
        }),
        None => Ok(fallback(method, envelope)),
    }
}

fn fallback(method: &str, envelope: RpcEnvelope) -> ApiResponse {
    ApiResponse::Fallback(FallbackResponse {
        method: method.to_owned(),
        ok: envelope.ok,
        result: envelope.result,
        error_code: envelope.error_code,
        description: envelope.description,
    })
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}
