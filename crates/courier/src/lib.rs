//! # Courier
//!
//! An asynchronous, type-driven client core for event-driven bot platforms.
//!
//! ## Overview
//!
//! Handlers declare what they need through their parameter types; Courier
//! finds it in the incoming update and calls them. Outbound calls go through
//! an API handle that shapes arguments, retries rate-limited calls and types
//! the results.
//!
//! ## Architecture
//!
//! ```text
//!                        ┌──────────────────────────── one failure boundary ───┐
//! ┌──────────┐  Update   │ ┌────────────┐   ┌─ plugins (by priority, in turn) │
//! │ Runtime  │──────────▶│ │ middleware │──▶├─ matching listeners             │
//! └──────────┘           │ │ (joined)   │   └─ event handlers (setup once)    │
//!                        │ └────────────┘          │ joined                   │
//!                        └─────────────────────────┼──────────────────────────┘
//!                                                  ▼
//!                                 Api ──▶ retry/backoff ──▶ Transport
//! ```
//!
//! - **Runtime** (`courier-runtime`): configuration, logging, update intake
//! - **Framework** (`courier-framework`): binder, middleware, plugins,
//!   listeners, event handlers, dispatcher
//! - **Core** (`courier-core`): update model, context bag, API handle, retry
//! - **Transport** (`courier-transport`): HTTP implementation of the API seam
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::prelude::*;
//!
//! async fn echo(ctx: HandlerContext, Current(message): Current<Message>) -> ApiResult<()> {
//!     if let Some(text) = message.text {
//!         ctx.reply(text).await?;
//!     }
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut runtime = CourierRuntime::builder().build()?;
//!     runtime.registry_mut().on("message", echo);
//!     runtime.run(updates()).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` (default): load `courier.toml`
//! - `yaml-config`: load `courier.yaml`
//! - `json-log`: JSON log output
//! - `http-client` (default): `reqwest` transport

pub use courier_core as core;
pub use courier_framework as framework;
pub use courier_runtime as runtime;
pub use courier_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use courier::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use courier_runtime::{CourierConfig, CourierRuntime};

    // Dispatch
    pub use courier_framework::{
        Callback, Dispatcher, EventHandler, Middleware, Plugin, Propagation, Registry, Selector,
    };

    // Extractors - for handler parameters
    pub use courier_framework::{Current, HandlerContext, Named, NamedArg};

    // Update objects
    pub use courier_framework::{
        CallbackQuery, Chat, ChatJoinRequest, ChatMemberUpdated, ChosenInlineResult, InlineQuery,
        Message, Poll, PollAnswer, PreCheckoutQuery, ShippingQuery, User,
    };

    // Core handles and errors
    pub use courier_core::{
        Api, ApiError, ApiResult, BoxError, CallArgs, ContextBag, Retry, RetrySpec, Update,
    };

    pub use async_trait::async_trait;
}
