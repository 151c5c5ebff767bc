//! SSE Stream Decoding
//!
//! Incremental decoder for the gateway's `text/event-stream`-shaped response
//! body. Byte chunks arrive in arbitrary sizes with no line alignment; the
//! decoder reassembles complete lines, parses `data: <json>` payloads, and
//! yields text deltas followed by a single terminal `Done` event.
//!
//! The decoder is a push parser: callers `feed` raw chunks as they arrive
//! and `finish` once the transport signals end-of-stream. It never reorders
//! deltas and produces identical output regardless of how the payload was
//! chunked.

use serde::Deserialize;
use tracing::{debug, warn};

/// SSE line prefix carrying a JSON payload
const DATA_PREFIX: &str = "data: ";

/// Literal payload marking the end of the stream
const DONE_MARKER: &str = "[DONE]";

/// How many consecutive feeds a non-parsing head line survives before it is
/// dropped. Split-across-chunk JSON completes on the next feed; a line still
/// failing after this many feeds is genuinely malformed.
const MAX_PARSE_RETRIES: u8 = 8;

/// Event produced by the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental fragment of the assistant's response text
    Delta(String),
    /// Terminal marker; emitted exactly once per stream
    Done,
}

/// Gateway stream payload, parsed from each `data:` line.
#[derive(Debug, Deserialize)]
struct StreamPayload {
    #[serde(default)]
    choices: Vec<PayloadChoice>,
}

#[derive(Debug, Deserialize)]
struct PayloadChoice {
    #[serde(default)]
    delta: Option<PayloadDelta>,
}

#[derive(Debug, Deserialize)]
struct PayloadDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Incremental decoder for the newline-delimited `data:` protocol.
///
/// State is two-phase: bytes accumulate until a complete line is available,
/// then each complete line is classified (heartbeat, data payload, or done
/// marker). A `data:` line whose JSON fails to parse is pushed back onto the
/// front of the buffer on the assumption it was split across a chunk
/// boundary; decoding resumes when more bytes arrive. The push-back is
/// bounded so persistently malformed input cannot stall the stream.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
    parse_retries: u8,
}

impl SseDecoder {
    /// Create a decoder for a new stream
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the terminal marker has been emitted
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed a raw byte chunk, returning any events it completes.
    ///
    /// Chunks may split lines, JSON payloads, and multi-byte characters at
    /// any position. After the terminal event has been emitted, further
    /// feeds produce nothing.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend_from_slice(chunk);
        self.drain_lines()
    }

    /// Signal end-of-input from the transport.
    ///
    /// Emits the terminal event if the `[DONE]` marker never arrived.
    /// Buffered bytes that never formed a complete line are dropped.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.done {
            return Vec::new();
        }
        self.done = true;
        if !self.buffer.is_empty() {
            debug!(
                bytes = self.buffer.len(),
                "dropping incomplete trailing bytes at end of stream"
            );
            self.buffer.clear();
        }
        vec![StreamEvent::Done]
    }

    /// Extract and classify complete lines from the buffer.
    fn drain_lines(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let rest = self.buffer.split_off(pos + 1);
            let mut line = std::mem::replace(&mut self.buffer, rest);
            line.pop(); // newline
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            // Lines are complete UTF-8: a newline is always a character
            // boundary in a valid UTF-8 stream.
            let text = String::from_utf8_lossy(&line).into_owned();
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.starts_with(':') {
                continue;
            }
            let Some(payload) = trimmed.strip_prefix(DATA_PREFIX) else {
                continue;
            };
            let payload = payload.trim();

            if payload == DONE_MARKER {
                self.done = true;
                self.buffer.clear();
                events.push(StreamEvent::Done);
                return events;
            }

            match serde_json::from_str::<StreamPayload>(payload) {
                Ok(parsed) => {
                    self.parse_retries = 0;
                    // Absence of the delta path means "no delta", not an error.
                    let content = parsed
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|c| c.delta)
                        .and_then(|d| d.content);
                    if let Some(content) = content {
                        if !content.is_empty() {
                            events.push(StreamEvent::Delta(content));
                        }
                    }
                }
                Err(err) => {
                    if self.parse_retries >= MAX_PARSE_RETRIES {
                        warn!(%err, line = %trimmed, "dropping malformed stream line");
                        self.parse_retries = 0;
                        continue;
                    }
                    // Assume the JSON was split across a chunk boundary:
                    // push the line back and stop until more bytes arrive.
                    self.parse_retries += 1;
                    let mut restored = line;
                    restored.push(b'\n');
                    restored.append(&mut self.buffer);
                    self.buffer = restored;
                    break;
                }
            }
        }

        events
    }
}
