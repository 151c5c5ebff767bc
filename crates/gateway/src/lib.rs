//! Step Tutor Gateway
//!
//! Transport layer between the tutoring client and the remote language-model
//! gateway. Defines the wire request format, the typed failure taxonomy, the
//! `ChatGateway` trait that the orchestrator programs against, and the
//! reqwest-backed implementation that decodes the gateway's SSE response
//! stream into text deltas.

pub mod http;
pub mod provider;
pub mod types;

pub use http::HttpGateway;
pub use provider::ChatGateway;
pub use types::{ChatRequest, GatewayConfig, GatewayError, GatewayResult, WireMessage, WireRole};
