//! # Courier Framework
//!
//! Dispatch components for building bots on top of `courier-core`.
//!
//! This layer provides:
//! - The capability binder: callbacks declare what they need through their
//!   parameter types and receive it from the current update
//! - Axum-style [`Handler`] adapters for async functions and closures
//! - The middleware chain, the plugin registry and stateful event handlers
//! - Selector-based listeners, including bot-mention detection
//! - The [`Dispatcher`] that runs all of the above under one failure boundary

pub mod binder;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod event_handler;
pub mod extractor;
pub mod handler;
pub mod listener;
pub mod middleware;
pub mod plugin;
pub mod registry;

#[cfg(test)]
mod test_support;

pub use binder::{Binder, Bound, Invocation, NamedArgs, ParamSpec};
pub use context::{CurrentField, HandlerContext, MENTION_FIELDS, Scope};
pub use dispatcher::Dispatcher;
pub use error::{BindError, BindResult, BoxError, HandlerPanic};
pub use event_handler::EventHandler;
pub use extractor::{Current, Injectable, Named, NamedArg};
pub use handler::{Callback, Handler, IntoOutcome};
pub use listener::{IntoSelectors, Listeners, Selector};
pub use middleware::{Middleware, MiddlewareChain};
pub use plugin::{FilterFn, Plugin, PluginRegistry, Propagation};
pub use registry::Registry;

pub use courier_core::types::{
    CallbackQuery, Chat, ChatJoinRequest, ChatMemberUpdated, ChosenInlineResult, InlineQuery,
    Message, MessageEntity, Poll, PollAnswer, PreCheckoutQuery, ShippingQuery, User,
};
pub use courier_core::{Api, ApiError, ApiResult, ContextBag, TypeKey, Update};
