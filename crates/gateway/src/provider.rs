//! Gateway Trait
//!
//! The seam the session orchestrator programs against. The production
//! implementation is [`crate::HttpGateway`]; tests substitute scripted
//! gateways to exercise session flows without a network.

use async_trait::async_trait;
use tokio::sync::mpsc;

use step_tutor_core::streaming::StreamEvent;

use crate::types::{ChatRequest, GatewayResult};

/// Streaming chat transport to the tutoring gateway.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Send a request and stream the response.
    ///
    /// Deltas (and the terminal done event) are forwarded on `tx` in arrival
    /// order as they are decoded; the returned value is the fully
    /// accumulated response text. Send failures on `tx` mean the receiver
    /// has gone away and are ignored.
    async fn stream_chat(
        &self,
        request: ChatRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> GatewayResult<String>;
}
