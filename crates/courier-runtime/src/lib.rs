//! Courier Runtime - configuration, logging and update intake.
//!
//! This crate provides:
//! - Layered configuration loading with figment (`config`)
//! - `tracing-subscriber` setup driven by that configuration (`logging`)
//! - [`CourierRuntime`], which builds the API handle, owns the dispatcher and
//!   turns raw JSON payloads into dispatched updates
//!
//! ```ignore
//! use courier_runtime::CourierRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut runtime = CourierRuntime::builder().build()?;
//!     runtime.registry_mut().on("message", echo);
//!
//!     runtime.run(my_update_stream()).await;
//!     Ok(())
//! }
//! ```
//!
//! Fetching updates (long polling, webhooks) is left to the application.

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, CourierConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{CourierRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
