//! HTTP client transport.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use courier_core::{RpcEnvelope, Transport, TransportError, TransportResult};

/// Default Bot API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// API root, without the `/bot<token>` part.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl HttpConfig {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Posts JSON bodies to `{base_url}/bot{token}/{method}`.
///
/// Non-2xx statuses are not errors by themselves: the Bot API answers them
/// with a regular envelope (`ok: false`), which is handed back for the API
/// handle to interpret. Only undeliverable requests and undecodable bodies
/// become [`TransportError`]s.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    /// Creates a transport for the bot identified by `token`.
    pub fn new(token: &str, config: HttpConfig) -> TransportResult<Self> {
        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::InvalidConfig(e.to_string()))?;

        Ok(Self::with_client(client, token, &config.base_url))
    }

    /// Creates a transport on an existing `reqwest` client.
    pub fn with_client(client: Client, token: &str, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/bot{token}", base_url.trim_end_matches('/')),
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.endpoint)
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The endpoint embeds the bot token.
        f.debug_struct("HttpTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, method: &str, body: &Map<String, Value>) -> TransportResult<RpcEnvelope> {
        trace!(method = %method, "Posting API request");

        let response = self
            .client
            .post(self.url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::RequestFailed {
                method: method.to_owned(),
                reason: e.without_url().to_string(),
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::RequestFailed {
                method: method.to_owned(),
                reason: e.without_url().to_string(),
            })?;

        let envelope = serde_json::from_slice::<RpcEnvelope>(&bytes).map_err(|e| {
            TransportError::MalformedResponse {
                method: method.to_owned(),
                reason: format!("HTTP {}: {e}", status.as_u16()),
            }
        })?;

        debug!(method = %method, status = status.as_u16(), ok = envelope.ok, "API response");
        Ok(envelope)
    }
}
