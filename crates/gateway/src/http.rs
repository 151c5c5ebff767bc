//! HTTP Gateway
//!
//! reqwest-backed implementation of [`ChatGateway`]. Sends the JSON request
//! with bearer auth, maps the distinguished failure statuses (429, 402), and
//! feeds the chunked response body through the SSE decoder, forwarding each
//! delta as it is assembled.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use step_tutor_core::streaming::{SseDecoder, StreamEvent};

use crate::provider::ChatGateway;
use crate::types::{ChatRequest, GatewayConfig, GatewayError, GatewayResult};

/// HTTP client for the tutoring gateway endpoint.
pub struct HttpGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl HttpGateway {
    /// Create a gateway client with the given connection settings
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ChatGateway for HttpGateway {
    async fn stream_chat(
        &self,
        request: ChatRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> GatewayResult<String> {
        let response = self
            .client
            .post(&self.config.base_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            warn!(status, "gateway returned error status");
            return Err(GatewayError::from_status(status));
        }

        let mut decoder = SseDecoder::new();
        let mut accumulated = String::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| GatewayError::Stream(e.to_string()))?;
            for event in decoder.feed(&chunk) {
                if let StreamEvent::Delta(content) = &event {
                    accumulated.push_str(content);
                }
                let done = matches!(event, StreamEvent::Done);
                let _ = tx.send(event).await;
                if done {
                    debug!(chars = accumulated.len(), "stream completed via done marker");
                    return Ok(accumulated);
                }
            }
        }

        // End-of-stream without the done marker still terminates cleanly.
        for event in decoder.finish() {
            let _ = tx.send(event).await;
        }
        debug!(chars = accumulated.len(), "stream completed at end of input");
        Ok(accumulated)
    }
}
