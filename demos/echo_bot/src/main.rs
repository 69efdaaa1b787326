//! Echo Bot Example
//!
//! A small bot wired through every registration point of the dispatcher:
//!
//! - a middleware stamping each update with its arrival time;
//! - a plugin that drops messages from other bots before anything else sees them;
//! - listeners for `message` and `callback_query`;
//! - an event handler that greets on start-up and answers mentions.
//!
//! Updates come from `getUpdates` long polling.
//!
//! # Usage
//!
//! ```bash
//! COURIER_BOT__TOKEN=123456789:AAH... cargo run --package echo-bot
//! ```

use std::time::{Duration, Instant};

use anyhow::Result;
use courier::prelude::*;
use futures::{Stream, StreamExt, stream};
use serde_json::{Value, json};
use tracing::{info, warn};

/// Server-side wait of one `getUpdates` call.
const POLL_TIMEOUT_SECS: u64 = 25;
/// Pause after a failed poll.
const POLL_BACKOFF: Duration = Duration::from_secs(3);

// ============================================================================
// Handler Functions
// ============================================================================

/// Middleware: records when the update arrived.
async fn stamp(bag: ContextBag) {
    bag.insert("received_at", Instant::now());
}

/// Plugin: stops bot-authored messages from reaching the rest of the plugins.
async fn ignore_bots(message: Message) -> Propagation {
    if message.from.as_ref().is_some_and(|user| user.is_bot) {
        Propagation::Stop
    } else {
        Propagation::Next
    }
}

/// Echoes plain text back to the chat.
async fn echo(ctx: HandlerContext, Current(message): Current<Message>, bag: ContextBag) -> ApiResult<()> {
    let Some(text) = message.text.filter(|text| !text.starts_with('/')) else {
        return Ok(());
    };

    ctx.reply(text).await?;

    if let Some(received_at) = bag.get::<Instant>("received_at") {
        info!(elapsed = ?received_at.elapsed(), "Echoed message");
    }
    Ok(())
}

/// Acknowledges inline button presses with the button payload.
async fn answer_button(api: Api, Current(query): Current<CallbackQuery>) -> ApiResult<()> {
    api.answer_callback_query(&query.id, query.data.as_deref())
        .await
        .map(drop)
}

// ============================================================================
// Event Handler
// ============================================================================

struct Greeter;

#[async_trait]
impl EventHandler for Greeter {
    fn name(&self) -> &str {
        "greeter"
    }

    fn on_start(&self) -> Option<Callback<()>> {
        Some(Callback::new(|api: Api| async move {
            let me = api.get_me().await?;
            info!(id = me.id, username = ?me.username, "Bot is up");
            Ok::<_, ApiError>(())
        }))
    }

    async fn handle(&self, ctx: &HandlerContext) -> Result<(), BoxError> {
        if ctx.is_mention() {
            ctx.reply("You called? Send me any text and I will echo it.")
                .await?;
        }
        Ok(())
    }
}

// ============================================================================
// Long Polling
// ============================================================================

async fn fetch(api: &Api, offset: i64) -> ApiResult<Vec<Value>> {
    api.call(
        "getUpdates",
        json!({ "offset": offset, "timeout": POLL_TIMEOUT_SECS }),
    )
    .await?
    .deserialize()
}

/// Endless stream of raw update payloads.
fn long_poll(api: Api) -> impl Stream<Item = Value> {
    stream::unfold((api, 0_i64), |(api, offset)| async move {
        loop {
            match fetch(&api, offset).await {
                Ok(batch) => {
                    let next = batch
                        .iter()
                        .filter_map(|update| update.get("update_id").and_then(Value::as_i64))
                        .max()
                        .map_or(offset, |id| id + 1);
                    return Some((stream::iter(batch), (api, next)));
                }
                Err(err) => {
                    warn!(error = %err, "Polling failed, retrying");
                    tokio::time::sleep(POLL_BACKOFF).await;
                }
            }
        }
    })
    .flatten()
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let mut runtime = CourierRuntime::builder().build()?;

    runtime
        .registry_mut()
        .middleware("stamp", stamp)
        .plugin(Plugin::new("ignore-bots", ignore_bots).requires("message").with_priority(100))
        .on("message", echo)
        .on("callback_query", answer_button)
        .handler(Greeter);

    let updates = long_poll(runtime.api().clone());

    tokio::select! {
        () = runtime.run(updates) => {}
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}
