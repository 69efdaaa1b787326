//! # Courier Core
//!
//! The data model and outbound side of the Courier bot client.
//!
//! This crate provides:
//! - **Update model**: the inbound [`Update`] record, its [`FieldRegistry`]
//!   (field name → semantic [`TypeKey`]) and the typed platform objects in
//!   [`types`].
//! - **Context Bag**: [`ContextBag`], the shared per-dispatch key/value store.
//! - **API handle**: [`Api`], which shapes arguments, calls the platform through
//!   a [`Transport`] and interprets the response envelope.
//! - **Retry/Backoff**: the [`Retry`] combinator the API handle runs every call
//!   under.
//!
//! ## Call Flow
//!
//! ```text
//! Api::call ──▶ shape args ──▶ Retry ──▶ Transport::post ──▶ interpret envelope
//!                                ▲                                   │
//!                                └──────── 429 retry_after ◀─────────┘
//! ```
//!
//! Dispatching updates to handlers lives in `courier-framework`.

pub mod api;
pub mod bag;
pub mod error;
pub mod retry;
pub mod transport;
pub mod types;
pub mod update;

#[cfg(test)]
mod test_support;

pub use api::{
    Api, ApiResponse, ApiSettings, BotIdentity, CallArgs, FallbackResponse, IntoCallArgs, MethodSpec,
    MethodTable, ResponseKind, Shape,
};
pub use bag::ContextBag;
pub use error::{ApiError, ApiResult, BoxError, TransportError, TransportResult};
pub use retry::{Retry, RetrySpec, Retryable, retry, retry_with};
pub use transport::{BoxedTransport, ResponseParameters, RpcEnvelope, Transport};
pub use update::{FieldRegistry, TypeKey, Update, UpdateObject};
