//! Shared Test Support
//!
//! A scripted in-memory gateway plus a fixture that wires it to a real
//! orchestrator over a memory store.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};

use step_tutor_core::store::MemoryStore;
use step_tutor_core::streaming::StreamEvent;
use step_tutor_gateway::{ChatGateway, ChatRequest, GatewayError, GatewayResult};

use step_tutor::{TutorEvent, TutorRepository, TutorService, User};

/// One scripted gateway exchange.
pub enum ScriptedReply {
    /// Stream the chunks, then finish
    Text(Vec<&'static str>),
    /// Stream the chunks, then hold the stream open until notified
    Paused(Vec<&'static str>, Arc<Notify>),
    /// Fail with the given HTTP status
    Fail(u16),
}

/// Gateway that replays a script and records every request it receives.
pub struct MockGateway {
    script: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockGateway {
    pub fn new(script: Vec<ScriptedReply>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatGateway for MockGateway {
    async fn stream_chat(
        &self,
        request: ChatRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> GatewayResult<String> {
        self.requests.lock().unwrap().push(request);
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(ScriptedReply::Text(chunks)) => {
                let mut accumulated = String::new();
                for chunk in chunks {
                    accumulated.push_str(chunk);
                    let _ = tx.send(StreamEvent::Delta(chunk.to_string())).await;
                }
                let _ = tx.send(StreamEvent::Done).await;
                Ok(accumulated)
            }
            Some(ScriptedReply::Paused(chunks, gate)) => {
                let mut accumulated = String::new();
                for chunk in chunks {
                    accumulated.push_str(chunk);
                    let _ = tx.send(StreamEvent::Delta(chunk.to_string())).await;
                }
                gate.notified().await;
                let _ = tx.send(StreamEvent::Done).await;
                Ok(accumulated)
            }
            Some(ScriptedReply::Fail(status)) => Err(GatewayError::from_status(status)),
            None => {
                let _ = tx.send(StreamEvent::Done).await;
                Ok(String::new())
            }
        }
    }
}

/// A fully wired orchestrator over a memory store and scripted gateway.
pub struct Fixture {
    pub tutor: Arc<TutorService>,
    pub gateway: Arc<MockGateway>,
    pub repo: TutorRepository,
    pub events: mpsc::Receiver<TutorEvent>,
    pub user: User,
}

pub fn fixture(script: Vec<ScriptedReply>) -> Fixture {
    let repo = TutorRepository::new(Arc::new(MemoryStore::new()));
    let user = repo.create_user("Ada");
    repo.set_current_user(&user.id);

    let gateway = Arc::new(MockGateway::new(script));
    let (events_tx, events) = mpsc::channel(256);
    let tutor = Arc::new(TutorService::new(
        gateway.clone() as Arc<dyn ChatGateway>,
        repo.clone(),
        events_tx,
        user.clone(),
    ));
    Fixture {
        tutor,
        gateway,
        repo,
        events,
        user,
    }
}

/// Drain all events buffered so far.
pub fn drain_events(events: &mut mpsc::Receiver<TutorEvent>) -> Vec<TutorEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

/// The celebrations among `events`, as (points, previous_rank, new_rank).
pub fn celebrations(events: &[TutorEvent]) -> Vec<(u32, usize, usize)> {
    events
        .iter()
        .filter_map(|e| match e {
            TutorEvent::Celebration {
                points,
                previous_rank,
                new_rank,
            } => Some((*points, *previous_rank, *new_rank)),
            _ => None,
        })
        .collect()
}
