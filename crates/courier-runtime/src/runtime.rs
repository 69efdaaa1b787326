//! Runtime glue: configuration in, dispatched updates out.
//!
//! [`CourierRuntime`] owns the [`Api`] handle and the [`Dispatcher`]. It turns
//! raw JSON payloads (from long polling, a webhook, a queue, a test) into
//! [`Update`]s and dispatches them. Where payloads come from is up to the
//! caller.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use courier_runtime::CourierRuntime;
//!
//! let mut runtime = CourierRuntime::builder()
//!     .config_file("courier.toml")
//!     .build()?;
//!
//! runtime.registry_mut().on("message", echo);
//!
//! runtime.run(payloads).await;
//! ```

use std::sync::Arc;

use futures::{Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, info, warn};

use courier_core::{Api, FieldRegistry, Transport, Update};
use courier_framework::{Dispatcher, Registry};

use crate::config::{ConfigLoader, CourierConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// Owns the API handle and the dispatcher for one bot.
pub struct CourierRuntime {
    config: CourierConfig,
    api: Api,
    fields: Arc<FieldRegistry>,
    dispatcher: Dispatcher,
}

impl CourierRuntime {
    /// Creates a runtime builder that loads configuration from the usual places.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime calling the Bot API over HTTP.
    ///
    /// Initializes logging from `config.logging` unless a subscriber is
    /// already installed.
    #[cfg(feature = "http-client")]
    pub fn new(config: CourierConfig) -> RuntimeResult<Self> {
        use courier_transport::{HttpConfig, HttpTransport};

        let token = config.bot.token.as_deref().ok_or(RuntimeError::MissingToken)?;
        let http = HttpConfig::default()
            .base_url(config.api.base_url.as_str())
            .timeout(config.api.timeout());
        let transport = HttpTransport::new(token, http)?;

        Ok(Self::with_transport(config, transport))
    }

    /// Creates a runtime over any transport.
    pub fn with_transport(config: CourierConfig, transport: impl Transport + 'static) -> Self {
        logging::init_from_config(&config.logging);

        let settings = config.api_settings();
        info!(
            bot_id = ?settings.identity.user_id,
            username = ?settings.identity.username,
            retry_attempts = settings.retry_attempts,
            "Runtime initialized from configuration"
        );

        Self {
            api: Api::new(transport, settings),
            fields: FieldRegistry::shared(),
            dispatcher: Dispatcher::new(),
            config,
        }
    }

    /// Replaces the field registry used to type update fields.
    pub fn with_fields(mut self, fields: FieldRegistry) -> Self {
        self.fields = Arc::new(fields);
        self
    }

    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Registration point for middleware, plugins, listeners and handlers.
    pub fn registry_mut(&mut self) -> &mut Registry {
        self.dispatcher.registry_mut()
    }

    /// Wraps `payload` into an [`Update`] bound to this runtime's API handle.
    ///
    /// Only the outer shape is checked; fields are decoded lazily by whoever
    /// asks for them.
    pub fn update_from(&self, payload: Value) -> RuntimeResult<Update> {
        match payload {
            Value::Object(map) => Ok(Update::with_fields(
                map,
                Arc::clone(&self.fields),
                self.api.clone(),
            )),
            other => Err(RuntimeError::InvalidPayload(json_kind(&other))),
        }
    }

    /// Dispatches one raw payload.
    ///
    /// Fails only if the payload is not an object. Failures inside handlers
    /// are contained by the dispatcher.
    pub async fn handle_payload(&self, payload: Value) -> RuntimeResult<()> {
        let update = self.update_from(payload)?;
        self.dispatcher.dispatch(update).await;
        Ok(())
    }

    /// Dispatches every payload of `payloads`, up to
    /// `runtime.max_concurrency` at a time, until the stream ends.
    pub async fn run<S>(&self, payloads: S)
    where
        S: Stream<Item = Value>,
    {
        let limit = self.config.runtime.max_concurrency;
        debug!(max_concurrency = limit, "Dispatching update stream");

        payloads
            .for_each_concurrent(limit, |payload| async move {
                if let Err(err) = self.handle_payload(payload).await {
                    warn!(error = %err, "Dropping update payload");
                }
            })
            .await;

        info!("Update stream finished");
    }
}

impl std::fmt::Debug for CourierRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CourierRuntime")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`CourierRuntime`] from loaded configuration.
///
/// ```rust,ignore
/// let runtime = CourierRuntime::builder()
///     .config_file("config/production.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder searching the current directory.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: CourierConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Loads the configuration only.
    pub fn load_config(self) -> RuntimeResult<CourierConfig> {
        Ok(self.config_loader.load()?)
    }

    /// Loads the configuration and builds an HTTP-backed runtime.
    #[cfg(feature = "http-client")]
    pub fn build(self) -> RuntimeResult<CourierRuntime> {
        CourierRuntime::new(self.load_config()?)
    }

    /// Loads the configuration and builds a runtime over `transport`.
    pub fn build_with_transport(
        self,
        transport: impl Transport + 'static,
    ) -> RuntimeResult<CourierRuntime> {
        Ok(CourierRuntime::with_transport(self.load_config()?, transport))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
