//! sumrise-client — Grading service integration.
//!
//! Implements the `GradingTransport` trait over HTTP+JSON and loads the
//! client configuration that is injected into it.

pub mod config;
pub mod http;

pub use config::{create_transport, load_config_from, ClientConfig};
pub use http::HttpGradingClient;
