//! Update dispatcher for the Courier framework.
//!
//! This module provides the [`Dispatcher`], which runs one update through the
//! [`Registry`]:
//!
//! 1. a fresh [`ContextBag`] is created for the update;
//! 2. every middleware runs, concurrently, and all of them finish;
//! 3. a [`HandlerContext`] is created over the update and the bag;
//! 4. the plugin run, every matching listener and every stateful handler's
//!    cycle start together and are joined;
//! 5. the bag is cleared.
//!
//! The whole sequence is one failure boundary: whatever fails, panics
//! included, is logged once at critical severity and `dispatch` still returns
//! normally. A panicking listener does not stop its siblings.
//!
//! ```rust,ignore
//! use courier_framework::{Current, Dispatcher, Message};
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher
//!     .registry_mut()
//!     .on("message", |ctx: HandlerContext, Current(message): Current<Message>| async move {
//!         ctx.reply(message.text.unwrap_or_default()).await?;
//!         Ok::<_, ApiError>(())
//!     });
//!
//! dispatcher.dispatch(update).await;
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use tracing::{Instrument, debug_span, error, trace};

use courier_core::{ContextBag, Update};

use crate::binder::Binder;
use crate::context::{HandlerContext, Scope};
use crate::error::{BoxError, ErrorChain, HandlerPanic};
use crate::listener::Activation;
use crate::middleware::{contain, settle};
use crate::registry::Registry;

/// Runs updates through a [`Registry`].
///
/// `Dispatcher` is `Send + Sync`; share it behind an `Arc` to dispatch
/// several updates at once.
#[derive(Debug, Default)]
pub struct Dispatcher {
    registry: Registry,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Dispatches `update` to everything registered.
    ///
    /// Never fails: a failure anywhere in the cycle is logged with
    /// `severity = "critical"` and swallowed.
    pub async fn dispatch(&self, update: Update) {
        let update = Arc::new(update);
        let update_id = update.update_id();
        let span = debug_span!(
            "dispatch",
            update_id = ?update_id,
            kind = update.kind().unwrap_or("unknown"),
        );

        let bag = ContextBag::new(update.api().clone());
        let cycle = self
            .run_cycle(Arc::clone(&update), bag.clone())
            .instrument(span);
        let result = match AssertUnwindSafe(cycle).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(HandlerPanic::from_payload(payload).into()),
        };
        bag.clear();

        if let Err(err) = result {
            error!(
                severity = "critical",
                update_id = ?update_id,
                error = %ErrorChain(&*err),
                "Unhandled failure while dispatching update"
            );
        }
    }

    async fn run_cycle(&self, update: Arc<Update>, bag: ContextBag) -> Result<(), BoxError> {
        let registry = &self.registry;
        let scope = Scope::new(Arc::clone(&update), bag.clone());

        registry.middleware_chain().run(&scope).await?;

        let ctx = HandlerContext::new(update, bag);
        let scope = scope.with_handler(ctx.clone());

        let mut tasks: Vec<BoxFuture<'_, Result<(), BoxError>>> = Vec::new();
        tasks.push(Box::pin(contain(registry.plugins().run(&scope))));

        for activation in registry.listeners().matching(&ctx) {
            let Activation {
                selector,
                callback,
                ctx: focused,
                named,
            } = activation;
            let scope = scope.clone().with_handler(focused);
            tasks.push(Box::pin(contain(async move {
                trace!(%selector, "Running listener");
                Binder::invoke(callback, &scope, named).await.map(drop)
            })));
        }

        for slot in registry.handler_slots() {
            tasks.push(Box::pin(contain(slot.cycle(&scope, &ctx))));
        }

        settle(join_all(tasks).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_handler::EventHandler;
    use crate::extractor::{Current, Named, NamedArg};
    use crate::plugin::{Plugin, Propagation};
    use crate::test_support::{LogCapture, RecordingTransport, api_with, update, update_with};
    use async_trait::async_trait;
    use courier_core::types::{CallbackQuery, Message};
    use courier_core::ApiError;
    use parking_lot::Mutex;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Log = Arc<Mutex<Vec<String>>>;

    fn message_update(text: &str) -> Update {
        update(json!({
            "update_id": 7,
            "message": {
                "message_id": 3,
                "chat": { "id": 10, "type": "private" },
                "text": text
            }
        }))
    }

    #[tokio::test]
    async fn test_field_listener_receives_its_object() {
        let seen: Log = Log::default();
        let mut dispatcher = Dispatcher::new();

        let sink = Arc::clone(&seen);
        dispatcher.registry_mut().on("message", move |Current(message): Current<Message>| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().push(message.text.unwrap_or_default());
            }
        });
        let sink = Arc::clone(&seen);
        dispatcher.registry_mut().on("callback_query", move |_query: CallbackQuery| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().push("callback".into());
            }
        });

        dispatcher.dispatch(message_update("hello")).await;

        assert_eq!(*seen.lock(), vec!["hello"]);
    }

    #[tokio::test]
    async fn test_any_listener_runs_without_current_value() {
        let seen: Arc<Mutex<Vec<Option<Value>>>> = Arc::default();
        let mut dispatcher = Dispatcher::new();

        let sink = Arc::clone(&seen);
        dispatcher.registry_mut().on_any(move |ctx: HandlerContext| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().push(ctx.current().map(|current| current.value.clone()));
            }
        });

        dispatcher.dispatch(message_update("hi")).await;
        dispatcher.dispatch(update(json!({ "update_id": 8 }))).await;

        assert_eq!(*seen.lock(), vec![None, None]);
    }

    #[tokio::test]
    async fn test_named_argument_carries_the_field_value() {
        struct MessageArg;
        impl NamedArg for MessageArg {
            const NAME: &'static str = "message";
            type Value = Value;
        }

        let seen: Arc<Mutex<Option<Value>>> = Arc::default();
        let mut dispatcher = Dispatcher::new();
        let sink = Arc::clone(&seen);
        dispatcher.registry_mut().on(
            "message",
            move |Named(value): Named<MessageArg>| {
                let sink = Arc::clone(&sink);
                async move {
                    *sink.lock() = Some(value);
                }
            },
        );

        dispatcher.dispatch(message_update("named")).await;

        let value = seen.lock().clone();
        assert_eq!(value.and_then(|v| v["text"].as_str().map(str::to_owned)).as_deref(), Some("named"));
    }

    #[tokio::test]
    async fn test_middleware_populates_bag_before_listeners() {
        let seen: Arc<Mutex<Option<String>>> = Arc::default();
        let mut dispatcher = Dispatcher::new();
        dispatcher.registry_mut().middleware("locale", |bag: ContextBag| async move {
            bag.insert("locale", String::from("en"));
        });
        let sink = Arc::clone(&seen);
        dispatcher.registry_mut().on("message", move |bag: ContextBag| {
            let sink = Arc::clone(&sink);
            async move {
                *sink.lock() = bag.get::<String>("locale");
            }
        });

        dispatcher.dispatch(message_update("hi")).await;

        assert_eq!(seen.lock().as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn test_failures_are_contained() {
        let completed = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();

        dispatcher.registry_mut().plugin(Plugin::new("broken", || async {
            Err::<Propagation, _>(BoxError::from("plugin exploded"))
        }));
        dispatcher.registry_mut().on("message", || async {
            Err::<(), _>(ApiError::Unauthorized)
        });
        let counter = Arc::clone(&completed);
        dispatcher.registry_mut().on_any(move || {
            let counter = Arc::clone(&counter);
            async move {
                tokio::task::yield_now().await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        // Returns normally; the sibling listener still ran to completion.
        dispatcher.dispatch(message_update("boom")).await;

        assert_eq!(completed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_listener_does_not_stop_siblings() {
        let completed = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();

        dispatcher.registry_mut().on("message", || async {
            let _ = None::<u8>.expect("listener exploded");
        });
        let counter = Arc::clone(&completed);
        dispatcher.registry_mut().on_any(move || {
            let counter = Arc::clone(&counter);
            async move {
                tokio::task::yield_now().await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        dispatcher.dispatch(message_update("boom")).await;
        // The dispatcher stays usable afterwards.
        dispatcher.dispatch(message_update("again")).await;

        assert_eq!(completed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_panicking_middleware_is_contained() {
        let ran = Arc::new(AtomicUsize::new(0));
        let kept: Arc<Mutex<Option<ContextBag>>> = Arc::default();
        let mut dispatcher = Dispatcher::new();
        let sink = Arc::clone(&kept);
        dispatcher.registry_mut().middleware("explodes", move |bag: ContextBag| {
            let sink = Arc::clone(&sink);
            async move {
                bag.insert("scratch", 1_u8);
                *sink.lock() = Some(bag);
                let _ = None::<u8>.expect("middleware exploded");
            }
        });
        let counter = Arc::clone(&ran);
        dispatcher.registry_mut().on_any(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        dispatcher.dispatch(message_update("hi")).await;

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        let bag = kept.lock().clone();
        assert!(bag.is_some_and(|bag| bag.is_empty()));
    }

    #[tokio::test]
    async fn test_failure_is_logged_at_critical_severity() {
        let logs = LogCapture::default();
        let _guard = logs.install();
        let mut dispatcher = Dispatcher::new();
        dispatcher.registry_mut().on("message", || async {
            Err::<(), _>(BoxError::from("listener failed"))
        });

        dispatcher.dispatch(message_update("hi")).await;

        let output = logs.contents();
        assert!(output.contains("ERROR"), "{output}");
        assert!(output.contains("severity=\"critical\""), "{output}");
        assert!(output.contains("update_id=Some(7)"), "{output}");
        assert!(output.contains("listener failed"), "{output}");
        assert!(output.contains("Unhandled failure while dispatching update"), "{output}");
    }

    #[tokio::test]
    async fn test_panic_is_logged_with_its_message() {
        let logs = LogCapture::default();
        let _guard = logs.install();
        let mut dispatcher = Dispatcher::new();
        dispatcher.registry_mut().on("message", || async {
            let _ = None::<u8>.expect("listener exploded");
        });

        dispatcher.dispatch(message_update("hi")).await;

        let output = logs.contents();
        assert!(output.contains("severity=\"critical\""), "{output}");
        assert!(output.contains("handler panicked: listener exploded"), "{output}");
    }

    #[tokio::test]
    async fn test_middleware_failure_skips_the_rest() {
        let ran = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();
        dispatcher.registry_mut().middleware("fails", || async {
            Err::<(), _>(BoxError::from("middleware failed"))
        });
        let counter = Arc::clone(&ran);
        dispatcher.registry_mut().on_any(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        dispatcher.dispatch(message_update("hi")).await;

        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[derive(Default)]
    struct Tracker {
        setups: Arc<AtomicUsize>,
        handled: AtomicUsize,
    }

    #[async_trait]
    impl EventHandler for Tracker {
        fn on_start(&self) -> Option<crate::handler::Callback<()>> {
            let setups = Arc::clone(&self.setups);
            Some(crate::handler::Callback::new(move || {
                let setups = Arc::clone(&setups);
                async move {
                    setups.fetch_add(1, Ordering::SeqCst);
                }
            }))
        }

        async fn handle(&self, _ctx: &HandlerContext) -> Result<(), BoxError> {
            self.handled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_handler_setup_runs_once_across_dispatches() {
        let tracker = Arc::new(Tracker::default());
        let mut dispatcher = Dispatcher::new();
        dispatcher.registry_mut().shared_handler(tracker.clone());

        for text in ["a", "b", "c"] {
            dispatcher.dispatch(message_update(text)).await;
        }

        assert_eq!(tracker.setups.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.handled.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_reregistered_selector_replaces_listener() {
        let seen: Log = Log::default();
        let mut dispatcher = Dispatcher::new();
        for label in ["first", "second"] {
            let sink = Arc::clone(&seen);
            dispatcher.registry_mut().on("message", move || {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().push(label.to_owned());
                }
            });
        }

        dispatcher.dispatch(message_update("hi")).await;

        assert_eq!(*seen.lock(), vec!["second"]);
    }

    #[tokio::test]
    async fn test_mention_listener_replies_to_the_mentioning_message() {
        let transport = RecordingTransport::default();
        let api = api_with(transport.clone());
        let mut dispatcher = Dispatcher::new();
        // The fake answers `true`, so decoding the sent message fails; the
        // dispatcher swallows that after the call went out.
        dispatcher.registry_mut().on("mention", |ctx: HandlerContext| async move {
            ctx.reply("you called?").await.map(drop)
        });

        let mentioned = update_with(
            json!({
                "update_id": 1,
                "message": {
                    "message_id": 1,
                    "chat": { "id": 99, "type": "group" },
                    "text": "hey @Courier_Bot"
                }
            }),
            api.clone(),
        );
        let plain = update_with(
            json!({
                "update_id": 2,
                "message": {
                    "message_id": 2,
                    "chat": { "id": 99, "type": "group" },
                    "text": "just chatting"
                }
            }),
            api,
        );
        dispatcher.dispatch(mentioned).await;
        dispatcher.dispatch(plain).await;

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "sendMessage");
        assert_eq!(calls[0].1["chat_id"], json!(99));
        assert_eq!(calls[0].1["text"], json!("you called?"));
    }

    #[tokio::test]
    async fn test_bag_is_cleared_after_dispatch() {
        let kept: Arc<Mutex<Option<ContextBag>>> = Arc::default();
        let mut dispatcher = Dispatcher::new();
        let sink = Arc::clone(&kept);
        dispatcher.registry_mut().middleware("store", move |bag: ContextBag| {
            let sink = Arc::clone(&sink);
            async move {
                bag.insert("scratch", 1_u8);
                *sink.lock() = Some(bag);
            }
        });

        dispatcher.dispatch(message_update("hi")).await;

        let bag = kept.lock().clone();
        assert!(bag.is_some_and(|bag| bag.is_empty()));
    }
}
