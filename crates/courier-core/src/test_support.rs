//! Transport fakes for unit tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::api::{Api, ApiSettings, BotIdentity};
use crate::error::{TransportError, TransportResult};
use crate::transport::{RpcEnvelope, Transport};

/// Replays a fixed queue of envelopes and records every request.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    responses: Arc<Mutex<VecDeque<RpcEnvelope>>>,
    requests: Arc<Mutex<Vec<(String, Map<String, Value>)>>>,
}

impl ScriptedTransport {
    pub(crate) fn new(responses: impl IntoIterator<Item = RpcEnvelope>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().collect())),
            requests: Arc::default(),
        }
    }

    pub(crate) fn requests(&self) -> Vec<(String, Map<String, Value>)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(&self, method: &str, body: &Map<String, Value>) -> TransportResult<RpcEnvelope> {
        self.requests.lock().push((method.to_owned(), body.clone()));
        self.responses
            .lock()
            .pop_front()
            .ok_or(TransportError::NotAvailable { transport: "scripted" })
    }
}

/// An API handle whose transport has nothing to say.
pub(crate) fn offline_api() -> Api {
    Api::new(
        ScriptedTransport::default(),
        ApiSettings::new(BotIdentity::new(42).username("courier_bot")),
    )
}
