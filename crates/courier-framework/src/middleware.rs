//! Middleware chain.
//!
//! Middleware are side-effect producers (typically populating the
//! [`ContextBag`](courier_core::ContextBag)) that run concurrently once per
//! dispatch, before anything else. They cannot halt or reorder each other.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use futures::future::join_all;
use tracing::debug;

use crate::binder::{Binder, NamedArgs};
use crate::context::Scope;
use crate::error::{BoxError, HandlerPanic};
use crate::handler::{Callback, Handler};

/// A named middleware callback.
#[derive(Debug, Clone)]
pub struct Middleware {
    name: String,
    callback: Callback<()>,
}

impl Middleware {
    pub fn new<H, T>(name: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        Self {
            name: name.into(),
            callback: Callback::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The set of registered middleware.
#[derive(Debug, Clone, Default)]
pub struct MiddlewareChain {
    items: Vec<Middleware>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, middleware: Middleware) {
        debug!(middleware = %middleware.name, "Registered middleware");
        self.items.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Runs every middleware concurrently and waits for all of them.
    ///
    /// Every middleware runs to completion; the first failure in registration
    /// order is returned. A panicking middleware counts as a failure.
    pub async fn run(&self, scope: &Scope) -> Result<(), BoxError> {
        let runs = self.items.iter().map(move |middleware| {
            contain(async move {
                Binder::invoke(&middleware.callback, scope, NamedArgs::new())
                    .await
                    .map(drop)
            })
        });
        settle(join_all(runs).await)
    }
}

/// Runs `task`, turning a panic inside it into a [`HandlerPanic`] error.
pub(crate) async fn contain<F>(task: F) -> Result<(), BoxError>
where
    F: Future<Output = Result<(), BoxError>>,
{
    match AssertUnwindSafe(task).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(HandlerPanic::from_payload(payload).into()),
    }
}

/// Reduces joined results to the first failure, in input order.
pub(crate) fn settle(results: Vec<Result<(), BoxError>>) -> Result<(), BoxError> {
    results.into_iter().collect()
}
