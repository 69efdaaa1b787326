//! The API service handle and the RPC method invoker.
//!
//! [`Api::call`] shapes the arguments, sends them through the configured
//! [`Transport`](crate::transport::Transport) under a [`Retry`] budget and
//! interprets the response envelope:
//!
//! ```rust,ignore
//! let api = Api::new(transport, ApiSettings::new(BotIdentity::new(42)));
//! let sent = api.call("sendMessage", json!({ "chat_id": "me", "text": "hi" })).await?;
//! let me = api.get_me().await?;
//! ```

mod args;
mod attributes;
pub mod markup;
mod methods;
mod response;

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult, TransportError};
use crate::retry::{Retry, Retryable};
use crate::transport::{BoxedTransport, Transport};
use crate::types::{Chat, Message, User};

pub use args::{CallArgs, IntoCallArgs};
pub use attributes::SELF_ALIAS;
pub use methods::{MethodSpec, MethodTable, ResponseKind, Shape};
pub use response::{ApiResponse, FallbackResponse};

// =============================================================================
// Settings
// =============================================================================

/// Who the bot is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotIdentity {
    /// Bot user id, if known.
    pub user_id: Option<i64>,
    /// Bot username without the leading `@`.
    pub username: Option<String>,
}

impl BotIdentity {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            username: None,
        }
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        let username = username.into();
        self.username = Some(username.trim_start_matches('@').to_owned());
        self
    }
}

/// Configuration lookups consumed by the API handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    /// Bot identity used for the `"me"` alias and mention detection.
    pub identity: BotIdentity,
    /// Default `parse_mode` added to standard-shaped calls.
    pub parse_mode: Option<String>,
    /// Attempt budget of every call.
    pub retry_attempts: u32,
}

impl ApiSettings {
    pub const DEFAULT_PARSE_MODE: &'static str = "html";
    pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

    pub fn new(identity: BotIdentity) -> Self {
        Self {
            identity,
            ..Self::default()
        }
    }

    pub fn parse_mode(mut self, parse_mode: Option<String>) -> Self {
        self.parse_mode = parse_mode;
        self
    }

    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            identity: BotIdentity::default(),
            parse_mode: Some(Self::DEFAULT_PARSE_MODE.to_owned()),
            retry_attempts: Self::DEFAULT_RETRY_ATTEMPTS,
        }
    }
}

// =============================================================================
// Api
// =============================================================================

/// Cheaply cloneable handle to the remote platform.
#[derive(Clone)]
pub struct Api {
    inner: Arc<ApiInner>,
}

struct ApiInner {
    transport: BoxedTransport,
    settings: ApiSettings,
    methods: MethodTable,
}

impl Api {
    /// Creates a handle over `transport` using the standard method table.
    pub fn new(transport: impl Transport + 'static, settings: ApiSettings) -> Self {
        Self::from_boxed(Arc::new(transport), settings, MethodTable::default())
    }

    /// Creates a handle from a shared transport and a custom method table.
    pub fn from_boxed(transport: BoxedTransport, settings: ApiSettings, methods: MethodTable) -> Self {
        Self {
            inner: Arc::new(ApiInner {
                transport,
                settings,
                methods,
            }),
        }
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.inner.settings
    }

    pub fn identity(&self) -> &BotIdentity {
        &self.inner.settings.identity
    }

    pub fn methods(&self) -> &MethodTable {
        &self.inner.methods
    }

    /// Calls a remote method.
    ///
    /// `args` may be a mapping, a list of mappings merged left to right, or a
    /// [`CallArgs`]; anything else fails with [`ApiError::InvalidArguments`]
    /// before a request is sent.
    ///
    /// Rate-limited attempts are retried up to the configured budget, waiting
    /// for the server-suggested delay in between. Every other failure is
    /// returned on the first attempt.
    pub async fn call(&self, method: &str, args: impl IntoCallArgs) -> ApiResult<ApiResponse> {
        let spec = self.inner.methods.lookup(method);
        let args = args.into_call_args()?;
        let body = attributes::shape(args, spec.shape, &self.inner.settings)?.into_map();
        let bot_id = self.inner.settings.identity.user_id;

        Retry::new(self.inner.settings.retry_attempts)
            .run_with(
                |attempt| self.attempt(method, spec, &body, attempt),
                |_, err: &ApiError| {
                    let wait = err.retry_after().unwrap_or_default();
                    warn!(
                        bot_id = ?bot_id,
                        method,
                        "Waiting {} seconds before continuing",
                        wait.as_secs()
                    );
                    wait
                },
            )
            .await
    }

    async fn attempt(
        &self,
        method: &str,
        spec: MethodSpec,
        body: &Map<String, Value>,
        attempt: u32,
    ) -> ApiResult<ApiResponse> {
        debug!(method, attempt, "Calling remote method");
        let envelope = self
            .inner
            .transport
            .post(method, body)
            .await
            .map_err(|err: TransportError| {
                debug!(method, error = %err, "Transport failed");
                err
            })?;
        response::interpret(method, spec, envelope)
    }

    // ─── Typed helpers ───

    /// `getMe`
    pub async fn get_me(&self) -> ApiResult<User> {
        self.call("getMe", CallArgs::new()).await?.deserialize()
    }

    /// `sendMessage` with only a target chat and text.
    pub async fn send_message(&self, chat_id: impl Into<Value>, text: impl Into<String>) -> ApiResult<Message> {
        let args = CallArgs::new()
            .arg("chat_id", chat_id)
            .arg("text", text.into());
        self.call("sendMessage", args).await?.deserialize()
    }

    /// `answerCallbackQuery`, optionally showing `text` to the user.
    pub async fn answer_callback_query(&self, callback_query_id: &str, text: Option<&str>) -> ApiResult<bool> {
        let mut args = CallArgs::new().arg("callback_query_id", callback_query_id);
        if let Some(text) = text {
            args = args.arg("text", text);
        }
        self.call("answerCallbackQuery", args).await?.deserialize()
    }

    /// `getChat`
    pub async fn get_chat(&self, chat_id: impl Into<Value>) -> ApiResult<Chat> {
        self.call("getChat", CallArgs::new().arg("chat_id", chat_id))
            .await?
            .deserialize()
    }
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedTransport;
    use crate::transport::RpcEnvelope;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::Instant;

    fn api(transport: &ScriptedTransport) -> Api {
        let settings = ApiSettings::new(BotIdentity::new(42).username("courier_bot"));
        Api::new(transport.clone(), settings)
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_fails_without_retry() {
        let transport = ScriptedTransport::new([RpcEnvelope::failure(401, "Unauthorized")]);
        let start = Instant::now();

        let err = api(&transport).get_me().await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized));
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_then_succeeds() {
        let transport = ScriptedTransport::new([
            RpcEnvelope::rate_limited(5),
            RpcEnvelope::success(json!("done")),
        ]);
        let start = Instant::now();

        let response = api(&transport)
            .call("setChatTitle", json!({ "chat_id": 1, "title": "t" }))
            .await
            .unwrap();

        assert_eq!(response, ApiResponse::Scalar(json!("done")));
        assert_eq!(transport.requests().len(), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_exhausts_budget() {
        let transport = ScriptedTransport::new([
            RpcEnvelope::rate_limited(1),
            RpcEnvelope::rate_limited(1),
            RpcEnvelope::rate_limited(1),
            RpcEnvelope::success(json!(true)),
        ]);

        let err = api(&transport)
            .call("sendChatAction", json!({ "chat_id": 1, "action": "typing" }))
            .await
            .unwrap_err();

        assert!(err.is_rate_limited());
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_method_is_fatal() {
        let transport = ScriptedTransport::new([RpcEnvelope::failure(404, "Not Found")]);
        let err = api(&transport).call("sendTelepathy", CallArgs::new()).await.unwrap_err();

        assert!(matches!(err, ApiError::UnknownMethod { method } if method == "sendTelepathy"));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_positional_list_is_merged_into_the_body() {
        let transport = ScriptedTransport::new([RpcEnvelope::success(json!(true))]);

        api(&transport)
            .call(
                "setChatTitle",
                json!([{ "chat_id": 1, "title": "old" }, { "title": "new" }]),
            )
            .await
            .unwrap();

        let (_, body) = transport.requests().remove(0);
        assert_eq!(body["chat_id"], json!(1));
        assert_eq!(body["title"], json!("new"));
    }

    #[tokio::test]
    async fn test_scalar_arguments_are_rejected_before_sending() {
        let transport = ScriptedTransport::new([RpcEnvelope::success(json!(true))]);

        let err = api(&transport).call("getChat", json!(17)).await.unwrap_err();

        assert!(matches!(err, ApiError::InvalidArguments(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_request_body_is_shaped() {
        let transport = ScriptedTransport::new([RpcEnvelope::success(json!({
            "message_id": 5,
            "chat": { "id": 42, "type": "private" },
            "date": 0,
            "text": "hi"
        }))]);

        let message = api(&transport).send_message("me", "hi").await.unwrap();
        assert_eq!(message.message_id, 5);

        let (method, body) = transport.requests().remove(0);
        assert_eq!(method, "sendMessage");
        assert_eq!(body["chat_id"], json!(42));
        assert_eq!(body["parse_mode"], json!("html"));
    }

    #[tokio::test]
    async fn test_bare_methods_get_no_parse_mode() {
        let transport = ScriptedTransport::new([RpcEnvelope::success(json!({
            "id": 42, "is_bot": true, "first_name": "Courier"
        }))]);

        let me = api(&transport).get_me().await.unwrap();
        assert_eq!(me.id, 42);
        assert!(transport.requests()[0].1.is_empty());
    }
}
