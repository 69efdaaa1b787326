//! Shared fixtures for unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};

use courier_core::api::{ApiSettings, BotIdentity};
use courier_core::error::TransportResult;
use courier_core::{Api, ContextBag, RpcEnvelope, Transport, Update};

use crate::context::{HandlerContext, Scope};

/// Answers every call with `true` and records it.
#[derive(Clone, Default)]
pub(crate) struct RecordingTransport {
    calls: Arc<Mutex<Vec<(String, Map<String, Value>)>>>,
}

impl RecordingTransport {
    pub(crate) fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn post(&self, method: &str, body: &Map<String, Value>) -> TransportResult<RpcEnvelope> {
        self.calls.lock().push((method.to_owned(), body.clone()));
        Ok(RpcEnvelope::success(json!(true)))
    }
}

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
pub(crate) struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    /// Installs a plain-text subscriber writing here for the current thread.
    pub(crate) fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub(crate) fn api_with(transport: RecordingTransport) -> Api {
    Api::new(
        transport,
        ApiSettings::new(BotIdentity::new(42).username("courier_bot")),
    )
}

pub(crate) fn update_with(payload: Value, api: Api) -> Update {
    let Value::Object(map) = payload else {
        panic!("update payload must be an object");
    };
    Update::new(map, api)
}

pub(crate) fn update(payload: Value) -> Update {
    update_with(payload, api_with(RecordingTransport::default()))
}

pub(crate) fn scope(update: Update) -> Scope {
    let update = Arc::new(update);
    let bag = ContextBag::new(update.api().clone());
    Scope::new(update, bag)
}

pub(crate) fn handler_context(update: Update) -> HandlerContext {
    let scope = scope(update);
    HandlerContext::new(Arc::clone(scope.update()), scope.bag().clone())
}

/// A scope with a handler context sharing its bag, as the dispatcher builds it.
pub(crate) fn handler_scope(update: Update) -> (Scope, HandlerContext) {
    let scope = scope(update);
    let ctx = HandlerContext::new(Arc::clone(scope.update()), scope.bag().clone());
    (scope.with_handler(ctx.clone()), ctx)
}
