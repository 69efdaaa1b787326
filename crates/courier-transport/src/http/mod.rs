//! HTTP transport.

mod client;

pub use client::{HttpConfig, HttpTransport};
