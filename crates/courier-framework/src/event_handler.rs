//! Stateful event handlers.
//!
//! An [`EventHandler`] lives for the whole process. The first dispatch that
//! reaches it runs its one-time setup callback; every dispatch, including the
//! first, then runs [`on_any`](EventHandler::on_any) and
//! [`handle`](EventHandler::handle) concurrently.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::binder::{Binder, NamedArgs};
use crate::context::{HandlerContext, Scope};
use crate::error::BoxError;
use crate::handler::Callback;

/// A process-wide handler with a one-time setup step.
///
/// ```rust,ignore
/// struct Greeter;
///
/// #[async_trait]
/// impl EventHandler for Greeter {
///     fn on_start(&self) -> Option<Callback<()>> {
///         Some(Callback::new(|api: Api| async move {
///             let me = api.get_me().await?;
///             tracing::info!(username = ?me.username, "Greeter ready");
///             Ok::<_, ApiError>(())
///         }))
///     }
///
///     async fn handle(&self, ctx: &HandlerContext) -> Result<(), BoxError> {
///         if ctx.is_mention() {
///             ctx.reply("hello!").await?;
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// One-time setup, resolved through the binder.
    fn on_start(&self) -> Option<Callback<()>> {
        None
    }

    /// Runs for every update, alongside [`handle`](Self::handle).
    async fn on_any(&self, _ctx: &HandlerContext) -> Result<(), BoxError> {
        Ok(())
    }

    /// Main per-update logic.
    async fn handle(&self, ctx: &HandlerContext) -> Result<(), BoxError>;
}

/// A registered handler and its started flag.
pub(crate) struct HandlerSlot {
    handler: Arc<dyn EventHandler>,
    started: Mutex<bool>,
}

impl HandlerSlot {
    pub(crate) fn new(handler: Arc<dyn EventHandler>) -> Self {
        Self {
            handler,
            started: Mutex::new(false),
        }
    }

    pub(crate) fn name(&self) -> &str {
        self.handler.name()
    }

    /// One dispatch cycle: setup if needed, then both hooks.
    pub(crate) async fn cycle(&self, scope: &Scope, ctx: &HandlerContext) -> Result<(), BoxError> {
        self.ensure_started(scope).await?;

        let (any, main) = futures::join!(self.handler.on_any(ctx), self.handler.handle(ctx));
        any.and(main)
    }

    // The lock is held across setup so concurrent first dispatches wait for it.
    async fn ensure_started(&self, scope: &Scope) -> Result<(), BoxError> {
        let mut started = self.started.lock().await;
        if *started {
            return Ok(());
        }
        *started = true;

        if let Some(setup) = self.handler.on_start() {
            debug!(handler = self.name(), "Running one-time setup");
            Binder::invoke(&setup, scope, NamedArgs::new()).await?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) async fn is_started(&self) -> bool {
        *self.started.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{handler_scope, update};
    use courier_core::Api;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        setups: Arc<AtomicUsize>,
        anys: AtomicUsize,
        handled: AtomicUsize,
    }

    #[async_trait]
    impl EventHandler for Counting {
        fn on_start(&self) -> Option<Callback<()>> {
            let setups = Arc::clone(&self.setups);
            Some(Callback::new(move |_api: Api| {
                let setups = Arc::clone(&setups);
                async move {
                    setups.fetch_add(1, Ordering::SeqCst);
                }
            }))
        }

        async fn on_any(&self, _ctx: &HandlerContext) -> Result<(), BoxError> {
            self.anys.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn handle(&self, _ctx: &HandlerContext) -> Result<(), BoxError> {
            self.handled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_setup_runs_once_across_dispatches() {
        let handler = Arc::new(Counting::default());
        let slot = HandlerSlot::new(handler.clone());
        assert!(!slot.is_started().await);

        for id in 0..5 {
            let (scope, ctx) = handler_scope(update(json!({ "update_id": id })));
            slot.cycle(&scope, &ctx).await.unwrap();
        }

        assert!(slot.is_started().await);
        assert_eq!(handler.setups.load(Ordering::SeqCst), 1);
        assert_eq!(handler.anys.load(Ordering::SeqCst), 5);
        assert_eq!(handler.handled.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_concurrent_first_dispatches_share_one_setup() {
        let handler = Arc::new(Counting::default());
        let slot = HandlerSlot::new(handler.clone());

        let (scope, ctx) = handler_scope(update(json!({ "update_id": 1 })));

        let (a, b) = futures::join!(slot.cycle(&scope, &ctx), slot.cycle(&scope, &ctx));
        a.unwrap();
        b.unwrap();

        assert_eq!(handler.setups.load(Ordering::SeqCst), 1);
        assert_eq!(handler.handled.load(Ordering::SeqCst), 2);
    }

    struct FailingAny;

    #[async_trait]
    impl EventHandler for FailingAny {
        async fn on_any(&self, _ctx: &HandlerContext) -> Result<(), BoxError> {
            Err("on_any failed".into())
        }

        async fn handle(&self, ctx: &HandlerContext) -> Result<(), BoxError> {
            ctx.bag().insert("handled", true);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_both_hooks_complete_before_failure_reports() {
        let slot = HandlerSlot::new(Arc::new(FailingAny));
        let (scope, ctx) = handler_scope(update(json!({ "update_id": 1 })));

        let err = slot.cycle(&scope, &ctx).await.unwrap_err();

        assert_eq!(err.to_string(), "on_any failed");
        assert_eq!(ctx.bag().get::<bool>("handled"), Some(true));
    }
}
