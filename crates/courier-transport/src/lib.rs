//! # Courier Transport
//!
//! Network implementations of the [`Transport`](courier_core::Transport)
//! seam defined in `courier-core`.
//!
//! ## Features
//!
//! - `http-client` (default): [`HttpTransport`], JSON-over-HTTPS calls to the
//!   Bot API through `reqwest`
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  courier-core Api   │  (shaping, retry, envelope interpretation)
//! ├─────────────────────┤
//! │  Transport trait    │
//! ├─────────────────────┤
//! │  courier-transport  │  <- This crate (implementations)
//! ├─────────────────────┤
//! │  Network (HTTPS)    │
//! └─────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier_core::{Api, ApiSettings, BotIdentity};
//! use courier_transport::{HttpConfig, HttpTransport};
//!
//! let transport = HttpTransport::new("123456:ABC...", HttpConfig::default())?;
//! let api = Api::new(transport, ApiSettings::new(BotIdentity::new(123456)));
//! let me = api.get_me().await?;
//! ```

#[cfg(feature = "http-client")]
pub mod http;

#[cfg(feature = "http-client")]
pub use http::{HttpConfig, HttpTransport};
