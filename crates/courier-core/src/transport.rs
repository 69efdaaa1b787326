//! Transport seam between the API handle and the network.
//!
//! A [`Transport`] performs one HTTP round trip and decodes the JSON
//! [`RpcEnvelope`]. It knows nothing about retrying or interpreting error
//! codes; that belongs to [`Api`](crate::api::Api).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TransportResult;

/// Response envelope returned by every remote method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcEnvelope {
    /// Whether the call succeeded.
    #[serde(default)]
    pub ok: bool,
    /// Call result on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Platform error code on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    /// Human-readable failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Extra failure parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ResponseParameters>,
}

impl RpcEnvelope {
    /// A successful envelope carrying `result`.
    pub fn success(result: Value) -> Self {
        Self {
            ok: true,
            result: Some(result),
            ..Default::default()
        }
    }

    /// A failed envelope with the given code and description.
    pub fn failure(error_code: i64, description: impl Into<String>) -> Self {
        Self {
            ok: false,
            error_code: Some(error_code),
            description: Some(description.into()),
            ..Default::default()
        }
    }

    /// A `429 Too Many Requests` envelope.
    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            parameters: Some(ResponseParameters {
                retry_after: Some(retry_after),
                ..Default::default()
            }),
            ..Self::failure(429, format!("Too Many Requests: retry after {retry_after}"))
        }
    }

    /// Server-suggested wait in seconds, if present.
    pub fn retry_after(&self) -> Option<u64> {
        self.parameters.as_ref().and_then(|p| p.retry_after)
    }
}

/// `parameters` section of a failed envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseParameters {
    /// Seconds to wait before repeating the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    /// Chat migrated to a supergroup with this id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrate_to_chat_id: Option<i64>,
}

/// Performs one remote call: `method name + JSON body → envelope`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Posts `body` to `method` and decodes the response envelope.
    async fn post(&self, method: &str, body: &Map<String, Value>) -> TransportResult<RpcEnvelope>;
}

/// Shared transport handle.
pub type BoxedTransport = Arc<dyn Transport>;
