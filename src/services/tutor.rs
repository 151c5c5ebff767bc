//! Tutoring Session Orchestrator
//!
//! State machine over the current tutoring session:
//! `ModeSelection → ProblemIntake → Tutoring → Completed`. Sends each
//! exchange to the gateway, applies streamed deltas to the trailing bot
//! message, persists the growing session, and on completion awards points
//! and records topic stats exactly once.
//!
//! Observers consume [`TutorEvent`]s from the channel supplied at
//! construction; the orchestrator never renders anything itself.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use step_tutor_core::streaming::StreamEvent;
use step_tutor_gateway::{ChatGateway, ChatRequest, WireMessage};

use crate::models::message::{ChatMessage, MessageRole};
use crate::models::session::{ChatSession, GuidanceMode};
use crate::models::user::User;
use crate::services::classifier::ResponseClassifier;
use crate::services::leaderboard::LeaderboardService;
use crate::services::topics::TopicService;
use crate::storage::repository::TutorRepository;
use crate::utils::error::{AppError, AppResult};

/// Lifecycle phase of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TutorPhase {
    /// No guidance mode chosen yet
    ModeSelection,
    /// Mode chosen, waiting for a problem (image, text, or practice topic)
    ProblemIntake,
    /// A problem is being worked
    Tutoring,
    /// The problem has been solved
    Completed,
}

/// Events emitted toward the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum TutorEvent {
    /// Incremental assistant text for the trailing bot message
    AssistantDelta { session_id: String, content: String },
    /// The current exchange's stream has finished
    AssistantDone { session_id: String },
    /// A topic tag was detected in the growing response
    TopicDetected { session_id: String, topic: String },
    /// The session reached a completion phrase
    SessionCompleted { session_id: String },
    /// Points were awarded; drives the celebration overlay
    Celebration {
        points: u32,
        previous_rank: usize,
        new_rank: usize,
    },
    /// User-visible failure notification
    Notice { message: String },
}

/// Mutable working state guarded by the state lock.
struct TutorState {
    phase: TutorPhase,
    guidance_mode: Option<GuidanceMode>,
    image_base64: Option<String>,
    detected_topic: Option<String>,
}

/// Session orchestrator for one user.
pub struct TutorService {
    gateway: Arc<dyn ChatGateway>,
    repo: TutorRepository,
    leaderboard: LeaderboardService,
    topics: TopicService,
    classifier: ResponseClassifier,
    events: mpsc::Sender<TutorEvent>,
    user: User,
    state: Mutex<TutorState>,
    /// One-in-flight-request guard; zero when idle, otherwise the ticket of
    /// the exchange that owns it. Only the owning exchange may release it,
    /// so a stale exchange finishing after a reset cannot unlock a newer
    /// one mid-stream.
    loading: AtomicU64,
    ticket_seq: AtomicU64,
}

impl TutorService {
    /// Create an orchestrator for `user` over the given gateway and store
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        repo: TutorRepository,
        events: mpsc::Sender<TutorEvent>,
        user: User,
    ) -> Self {
        Self {
            gateway,
            leaderboard: LeaderboardService::new(repo.clone()),
            topics: TopicService::new(repo.clone()),
            repo,
            classifier: ResponseClassifier::new(),
            events,
            user,
            state: Mutex::new(TutorState {
                phase: TutorPhase::ModeSelection,
                guidance_mode: None,
                image_base64: None,
                detected_topic: None,
            }),
            loading: AtomicU64::new(0),
            ticket_seq: AtomicU64::new(0),
        }
    }

    fn state(&self) -> MutexGuard<'_, TutorState> {
        self.state.lock().expect("tutor state lock poisoned")
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> TutorPhase {
        self.state().phase
    }

    /// Whether a stream is currently in flight
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst) != 0
    }

    /// The chosen guidance mode, if any
    pub fn guidance_mode(&self) -> Option<GuidanceMode> {
        self.state().guidance_mode
    }

    /// The topic detected for the current session, if any
    pub fn detected_topic(&self) -> Option<String> {
        self.state().detected_topic.clone()
    }

    /// The session the current-session pointer refers to, if any
    pub fn current_session(&self) -> Option<ChatSession> {
        let id = self.repo.current_session_id()?;
        self.repo.session(&id)
    }

    /// Choose the guidance mode. Valid only before a problem has started.
    pub fn select_mode(&self, mode: GuidanceMode) -> AppResult<()> {
        let mut state = self.state();
        if state.phase != TutorPhase::ModeSelection {
            return Err(AppError::invalid_state(
                "guidance mode can only be chosen before a problem starts",
            ));
        }
        state.guidance_mode = Some(mode);
        state.phase = TutorPhase::ProblemIntake;
        info!(mode = mode.as_wire_str(), "guidance mode selected");
        Ok(())
    }

    /// Start a session from a problem photo (base64-encoded).
    pub async fn start_with_image(&self, image_base64: String) -> AppResult<()> {
        let ticket = self.begin_loading()?;
        let (session_id, request) = match self.prepare_start(|session, state| {
            session.problem_image_url = image_base64.clone();
            state.image_base64 = Some(image_base64.clone());
            let mode = session.guidance_mode.as_wire_str();
            ChatRequest::new(Vec::new(), Some(image_base64.clone()), mode)
        }) {
            Ok(prepared) => prepared,
            Err(err) => {
                self.release_loading(ticket);
                return Err(err);
            }
        };
        self.run_exchange(ticket, session_id, request).await
    }

    /// Start a session from a free-text problem statement.
    pub async fn start_with_text(&self, problem: String) -> AppResult<()> {
        let ticket = self.begin_loading()?;
        let (session_id, request) = match self.prepare_start(|session, _state| {
            session.problem_text = problem.clone();
            session.messages.push(ChatMessage::student(problem.clone()));
            let mode = session.guidance_mode.as_wire_str();
            ChatRequest::new(vec![WireMessage::user(problem.clone())], None, mode)
        }) {
            Ok(prepared) => prepared,
            Err(err) => {
                self.release_loading(ticket);
                return Err(err);
            }
        };
        self.run_exchange(ticket, session_id, request).await
    }

    /// Start a practice session seeded from a previously seen topic.
    pub async fn start_practice(&self, topic: String) -> AppResult<()> {
        let ticket = self.begin_loading()?;
        let (session_id, request) = match self.prepare_start(|session, _state| {
            session.problem_text = format!("Practice: {topic}");
            let mode = session.guidance_mode.as_wire_str();
            ChatRequest::practice(topic.clone(), mode)
        }) {
            Ok(prepared) => prepared,
            Err(err) => {
                self.release_loading(ticket);
                return Err(err);
            }
        };
        self.run_exchange(ticket, session_id, request).await
    }

    /// Send a student answer within the current session.
    pub async fn send_message(&self, content: String) -> AppResult<()> {
        let ticket = self.begin_loading()?;
        let prepared = self.prepare_send(content);
        let (session_id, request) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => {
                self.release_loading(ticket);
                return Err(err);
            }
        };
        self.run_exchange(ticket, session_id, request).await
    }

    /// Start a new problem after completion, keeping the guidance mode.
    pub fn start_new_problem(&self) -> AppResult<()> {
        let mut state = self.state();
        if state.phase != TutorPhase::Completed {
            return Err(AppError::invalid_state(
                "no completed session to start a new problem from",
            ));
        }
        Self::clear_working_state(&mut state, &self.repo);
        state.phase = TutorPhase::ProblemIntake;
        self.loading.store(0, Ordering::SeqCst);
        Ok(())
    }

    /// Re-enter tutoring with a practice problem on the detected topic.
    pub async fn practice_similar(&self) -> AppResult<()> {
        let topic = {
            let mut state = self.state();
            if state.phase != TutorPhase::Completed {
                return Err(AppError::invalid_state(
                    "practice similar is only available after completion",
                ));
            }
            let topic = state
                .detected_topic
                .clone()
                .or_else(|| self.current_session().and_then(|s| s.topic))
                .ok_or_else(|| AppError::invalid_state("no topic detected for this session"))?;
            Self::clear_working_state(&mut state, &self.repo);
            state.phase = TutorPhase::ProblemIntake;
            topic
        };
        self.start_practice(topic).await
    }

    /// End the session entirely, returning to mode selection.
    pub fn end_session(&self) -> AppResult<()> {
        let mut state = self.state();
        Self::clear_working_state(&mut state, &self.repo);
        state.guidance_mode = None;
        state.phase = TutorPhase::ModeSelection;
        self.loading.store(0, Ordering::SeqCst);
        Ok(())
    }

    /// Reset working state, keeping the chosen guidance mode.
    ///
    /// An in-flight stream is not aborted; clearing the current-session
    /// pointer makes its late results stale so they are discarded on
    /// arrival.
    pub fn reset(&self) {
        let mut state = self.state();
        Self::clear_working_state(&mut state, &self.repo);
        state.phase = if state.guidance_mode.is_some() {
            TutorPhase::ProblemIntake
        } else {
            TutorPhase::ModeSelection
        };
        self.loading.store(0, Ordering::SeqCst);
    }

    fn clear_working_state(state: &mut TutorState, repo: &TutorRepository) {
        state.image_base64 = None;
        state.detected_topic = None;
        repo.set_current_session_id(None);
    }

    /// Acquire the in-flight guard, returning the owning ticket.
    fn begin_loading(&self) -> AppResult<u64> {
        let ticket = self.ticket_seq.fetch_add(1, Ordering::SeqCst) + 1;
        if self
            .loading
            .compare_exchange(0, ticket, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AppError::Busy);
        }
        Ok(ticket)
    }

    /// Release the guard, but only if `ticket` still owns it.
    fn release_loading(&self, ticket: u64) {
        let _ = self
            .loading
            .compare_exchange(ticket, 0, Ordering::SeqCst, Ordering::SeqCst);
    }

    /// Build and persist a fresh session, mark it current, and construct
    /// the first request via `configure`.
    fn prepare_start<F>(&self, mut configure: F) -> AppResult<(String, ChatRequest)>
    where
        F: FnMut(&mut ChatSession, &mut TutorState) -> ChatRequest,
    {
        let mut state = self.state();
        if state.phase != TutorPhase::ProblemIntake {
            return Err(AppError::invalid_state(
                "a problem can only be started from problem intake",
            ));
        }
        let Some(mode) = state.guidance_mode else {
            return Err(AppError::invalid_state("no guidance mode selected"));
        };

        let mut session = ChatSession::new(self.user.id.clone(), mode);
        let request = configure(&mut session, &mut state);
        self.repo.create_session(&session);
        self.repo.set_current_session_id(Some(&session.id));
        state.detected_topic = None;
        state.phase = TutorPhase::Tutoring;
        info!(session_id = %session.id, "session started");
        Ok((session.id, request))
    }

    /// Append the student message and build the follow-up request from the
    /// full accumulated history.
    fn prepare_send(&self, content: String) -> AppResult<(String, ChatRequest)> {
        let state = self.state();
        if state.phase != TutorPhase::Tutoring {
            return Err(AppError::invalid_state("no active tutoring session"));
        }
        let session_id = self
            .repo
            .current_session_id()
            .ok_or_else(|| AppError::invalid_state("no current session"))?;
        let mut session = self
            .repo
            .session(&session_id)
            .ok_or_else(|| AppError::not_found(format!("session {session_id}")))?;

        session.messages.push(ChatMessage::student(content));
        self.repo.update_session(&session);

        let history: Vec<WireMessage> = session
            .messages
            .iter()
            .map(|m| match m.role {
                MessageRole::Student => WireMessage::user(m.content.clone()),
                MessageRole::Bot => WireMessage::assistant(m.content.clone()),
            })
            .collect();
        let request = ChatRequest::new(
            history,
            state.image_base64.clone(),
            session.guidance_mode.as_wire_str(),
        );
        Ok((session_id, request))
    }

    fn is_current(&self, session_id: &str) -> bool {
        self.repo.current_session_id().as_deref() == Some(session_id)
    }

    /// Stream one exchange and apply its effects.
    ///
    /// The stream carries the id of the session it was started for; every
    /// mutation re-checks the current-session pointer so a stream finishing
    /// after a reset is discarded instead of being applied to a stale
    /// session. `ticket` is this exchange's claim on the in-flight guard;
    /// the epilogue releases it only if no reset has reassigned the guard
    /// in the meantime.
    async fn run_exchange(
        &self,
        ticket: u64,
        session_id: String,
        request: ChatRequest,
    ) -> AppResult<()> {
        let (tx, mut rx) = mpsc::channel(32);
        let gateway = Arc::clone(&self.gateway);
        let handle = tokio::spawn(async move { gateway.stream_chat(request, tx).await });

        let mut accumulated = String::new();
        let mut topic_found = self.state().detected_topic.is_some();

        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::Delta(content) => {
                    accumulated.push_str(&content);
                    if !self.is_current(&session_id) {
                        debug!(session_id, "discarding delta for stale session");
                        continue;
                    }
                    self.apply_delta(&session_id, &accumulated);
                    let _ = self
                        .events
                        .send(TutorEvent::AssistantDelta {
                            session_id: session_id.clone(),
                            content,
                        })
                        .await;

                    if !topic_found {
                        if let Some(topic) = self.classifier.detect_topic(&accumulated) {
                            topic_found = true;
                            self.register_topic(&session_id, topic).await;
                        }
                    }
                }
                StreamEvent::Done => break,
            }
        }

        let result = match handle.await {
            Ok(Ok(full_text)) => {
                self.finish_exchange(&session_id, &full_text).await;
                Ok(())
            }
            Ok(Err(err)) => {
                warn!(session_id, %err, "exchange failed");
                let _ = self
                    .events
                    .send(TutorEvent::Notice {
                        message: err.user_message().to_string(),
                    })
                    .await;
                Err(AppError::Gateway(err))
            }
            Err(err) => Err(AppError::internal(format!("stream task panicked: {err}"))),
        };

        self.release_loading(ticket);
        result
    }

    /// Rewrite the trailing bot message with the accumulated text, creating
    /// it on the first delta. Deltas always collapse into a single trailing
    /// bot message, so two bot messages are never adjacent.
    fn apply_delta(&self, session_id: &str, accumulated: &str) {
        let Some(mut session) = self.repo.session(session_id) else {
            return;
        };
        match session.messages.last_mut() {
            Some(last) if last.role == MessageRole::Bot => {
                last.content = accumulated.to_string();
            }
            _ => session.messages.push(ChatMessage::bot(accumulated)),
        }
        self.repo.update_session(&session);
    }

    /// Record a newly detected topic: on the session, in working state, and
    /// as a registered (unscored) topic entry.
    async fn register_topic(&self, session_id: &str, topic: String) {
        if let Some(mut session) = self.repo.session(session_id) {
            session.set_topic(topic.clone());
            self.repo.update_session(&session);
        }
        self.state().detected_topic = Some(topic.clone());
        self.topics
            .update_topic_stats(&self.user.id, &topic, false, true);
        info!(session_id, topic, "topic detected");
        let _ = self
            .events
            .send(TutorEvent::TopicDetected {
                session_id: session_id.to_string(),
                topic,
            })
            .await;
    }

    /// Apply end-of-stream effects: completion detection, scoring, and the
    /// celebration event. No-ops for stale or already-completed sessions.
    async fn finish_exchange(&self, session_id: &str, full_text: &str) {
        if !self.is_current(session_id) {
            warn!(session_id, "discarding completed stream for stale session");
            return;
        }
        let _ = self
            .events
            .send(TutorEvent::AssistantDone {
                session_id: session_id.to_string(),
            })
            .await;

        if !self.classifier.is_completion(full_text) {
            return;
        }
        let Some(mut session) = self.repo.session(session_id) else {
            return;
        };
        if session.is_completed {
            return;
        }

        session.is_completed = true;
        self.repo.update_session(&session);

        let points = session.guidance_mode.points();
        let score = self
            .leaderboard
            .add_score(&self.user.id, &self.user.name, points);

        // Topic stats are only recorded when a topic was detected; points
        // are awarded regardless.
        let topic = session.topic.clone().or_else(|| self.detected_topic());
        if let Some(topic) = topic {
            self.topics
                .update_topic_stats(&self.user.id, &topic, true, false);
        }

        self.state().phase = TutorPhase::Completed;
        info!(session_id, points, new_rank = score.new_rank, "session completed");

        let _ = self
            .events
            .send(TutorEvent::SessionCompleted {
                session_id: session_id.to_string(),
            })
            .await;
        let _ = self
            .events
            .send(TutorEvent::Celebration {
                points,
                previous_rank: score.previous_rank,
                new_rank: score.new_rank,
            })
            .await;
    }
}
