//! Voice Capture Controller
//!
//! Silence-driven submission for hands-free tutoring. The controller does not
//! touch audio hardware; the platform layer feeds it recognized transcript
//! segments and it decides when a listening window ends and when the
//! accumulated transcript is submitted as the student's answer.
//!
//! Three timers drive the lifecycle: a listening ceiling, a silence window
//! restarted on every speech segment, and a debounce between auto-stop and
//! submission so a brief pause does not fire a half-finished answer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::services::tutor::TutorService;

/// Timer durations for the capture lifecycle.
#[derive(Debug, Clone, Copy)]
pub struct VoiceConfig {
    /// Hard ceiling on a single listening window
    pub max_listen: Duration,
    /// Silence window that ends a listening window early
    pub silence: Duration,
    /// Delay between auto-stop and submission
    pub debounce: Duration,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            max_listen: Duration::from_secs(30),
            silence: Duration::from_secs(3),
            debounce: Duration::from_millis(1500),
        }
    }
}

/// Capture lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoicePhase {
    /// Not capturing
    Idle,
    /// Accepting transcript segments
    Listening,
    /// Auto-stopped with a pending debounced submission
    Cooldown,
}

/// Where a finished transcript goes.
///
/// The tutor orchestrator is the production sink; the seam keeps the timer
/// logic testable without a gateway.
#[async_trait]
pub trait AnswerSink: Send + Sync {
    /// Whether the sink cannot accept an answer right now
    fn is_busy(&self) -> bool;
    /// Submit a finished transcript
    async fn submit(&self, text: String);
}

#[async_trait]
impl AnswerSink for TutorService {
    fn is_busy(&self) -> bool {
        self.is_loading()
    }

    async fn submit(&self, text: String) {
        if let Err(err) = self.send_message(text).await {
            warn!(%err, "voice submission failed");
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum TimerKind {
    Ceiling,
    Silence,
    Debounce { rearmed: bool },
}

struct VoiceState {
    phase: VoicePhase,
    /// Space-joined final segments
    finalized: String,
    /// Latest interim segment, replaced wholesale on every update
    interim: String,
    ceiling: Option<CancellationToken>,
    silence: Option<CancellationToken>,
    debounce: Option<CancellationToken>,
}

impl VoiceState {
    fn cancel_listen_timers(&mut self) {
        if let Some(token) = self.ceiling.take() {
            token.cancel();
        }
        if let Some(token) = self.silence.take() {
            token.cancel();
        }
    }

    fn cancel_all_timers(&mut self) {
        self.cancel_listen_timers();
        if let Some(token) = self.debounce.take() {
            token.cancel();
        }
    }

    fn combined(&self) -> String {
        let mut text = self.finalized.clone();
        text.push_str(&self.interim);
        text.trim().to_string()
    }
}

/// Silence-driven voice capture controller.
pub struct VoiceController {
    sink: Arc<dyn AnswerSink>,
    config: VoiceConfig,
    state: Mutex<VoiceState>,
    hands_free: AtomicBool,
    /// True while output speech is playing; defers submission
    speaking: AtomicBool,
    /// Self-handle for the timer tasks; a fired timer on a dropped
    /// controller is a no-op
    weak: Weak<VoiceController>,
}

impl VoiceController {
    /// Create a controller submitting into `sink`
    pub fn new(sink: Arc<dyn AnswerSink>, config: VoiceConfig) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            sink,
            config,
            state: Mutex::new(VoiceState {
                phase: VoicePhase::Idle,
                finalized: String::new(),
                interim: String::new(),
                ceiling: None,
                silence: None,
                debounce: None,
            }),
            hands_free: AtomicBool::new(false),
            speaking: AtomicBool::new(false),
            weak: weak.clone(),
        })
    }

    fn state(&self) -> MutexGuard<'_, VoiceState> {
        self.state.lock().expect("voice state lock poisoned")
    }

    /// Current capture phase
    pub fn phase(&self) -> VoicePhase {
        self.state().phase
    }

    /// Whether a listening window is open
    pub fn is_listening(&self) -> bool {
        self.phase() == VoicePhase::Listening
    }

    /// The transcript accumulated so far (finalized plus interim)
    pub fn transcript(&self) -> String {
        self.state().combined()
    }

    /// Discard the accumulated transcript
    pub fn reset_transcript(&self) {
        let mut state = self.state();
        state.finalized.clear();
        state.interim.clear();
    }

    /// Toggle hands-free mode. Disabling cancels every timer and returns to
    /// idle; the transcript is kept for manual submission.
    pub fn set_hands_free(&self, enabled: bool) {
        self.hands_free.store(enabled, Ordering::SeqCst);
        if !enabled {
            let mut state = self.state();
            state.cancel_all_timers();
            state.phase = VoicePhase::Idle;
        }
    }

    /// Whether hands-free mode is on
    pub fn hands_free(&self) -> bool {
        self.hands_free.load(Ordering::SeqCst)
    }

    /// Mark output speech as playing or finished. Submission is deferred
    /// while speech plays so the tutor does not hear itself.
    pub fn set_speaking(&self, speaking: bool) {
        self.speaking.store(speaking, Ordering::SeqCst);
    }

    /// Open a listening window, starting fresh: any previous transcript is
    /// discarded and a pending debounced submission is cancelled.
    pub fn start_listening(&self) {
        let mut state = self.state();
        if state.phase == VoicePhase::Listening {
            return;
        }
        state.cancel_all_timers();
        state.finalized.clear();
        state.interim.clear();
        state.phase = VoicePhase::Listening;
        state.ceiling = Some(self.spawn_timer(self.config.max_listen, TimerKind::Ceiling));
        state.silence = Some(self.spawn_timer(self.config.silence, TimerKind::Silence));
        debug!("listening window opened");
    }

    /// Close the listening window without submitting. The transcript is kept
    /// so the caller can still submit it manually.
    pub fn stop_listening(&self) {
        let mut state = self.state();
        state.cancel_all_timers();
        state.phase = VoicePhase::Idle;
    }

    /// Feed a recognized transcript segment.
    ///
    /// Final segments are appended to the finalized transcript; interim
    /// segments replace the previous interim wholesale. Any non-blank
    /// segment restarts the silence window.
    pub fn on_segment(&self, text: &str, is_final: bool) {
        let mut state = self.state();
        if state.phase != VoicePhase::Listening {
            return;
        }
        if is_final {
            state.finalized.push_str(text);
            state.finalized.push(' ');
            state.interim.clear();
        } else {
            state.interim = text.to_string();
        }
        if !text.trim().is_empty() {
            if let Some(token) = state.silence.take() {
                token.cancel();
            }
            state.silence = Some(self.spawn_timer(self.config.silence, TimerKind::Silence));
        }
    }

    fn spawn_timer(&self, duration: Duration, kind: TimerKind) -> CancellationToken {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let weak = self.weak.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(duration) => {
                    if let Some(controller) = weak.upgrade() {
                        controller.on_timer(kind).await;
                    }
                }
            }
        });
        token
    }

    async fn on_timer(&self, kind: TimerKind) {
        match kind {
            TimerKind::Ceiling | TimerKind::Silence => self.auto_stop(),
            TimerKind::Debounce { rearmed } => self.fire_debounce(rearmed).await,
        }
    }

    /// Timer-driven stop. With hands-free on and a non-empty transcript the
    /// window rolls into cooldown and a debounced submission; otherwise it
    /// just goes idle.
    fn auto_stop(&self) {
        let mut state = self.state();
        if state.phase != VoicePhase::Listening {
            return;
        }
        state.cancel_listen_timers();
        if self.hands_free.load(Ordering::SeqCst) && !state.combined().is_empty() {
            state.phase = VoicePhase::Cooldown;
            state.debounce = Some(self.spawn_timer(
                self.config.debounce,
                TimerKind::Debounce { rearmed: false },
            ));
        } else {
            state.phase = VoicePhase::Idle;
        }
    }

    /// Debounce expiry. If the sink is busy or speech is playing, the timer
    /// re-arms once; a second busy expiry drops to idle keeping the
    /// transcript rather than queueing indefinitely.
    async fn fire_debounce(&self, rearmed: bool) {
        let busy = self.sink.is_busy() || self.speaking.load(Ordering::SeqCst);
        let text = {
            let mut state = self.state();
            if state.phase != VoicePhase::Cooldown {
                return;
            }
            if busy {
                if rearmed {
                    debug!("submission still blocked, returning to idle");
                    state.phase = VoicePhase::Idle;
                    state.debounce = None;
                } else {
                    state.debounce = Some(self.spawn_timer(
                        self.config.debounce,
                        TimerKind::Debounce { rearmed: true },
                    ));
                }
                return;
            }
            let text = state.combined();
            state.finalized.clear();
            state.interim.clear();
            state.debounce = None;
            state.phase = VoicePhase::Idle;
            text
        };
        if !text.is_empty() {
            self.sink.submit(text).await;
        }
    }
}

/// Strip chat markup from assistant text before speech synthesis.
///
/// Removes topic tags and markdown decoration, replaces LaTeX math with a
/// spoken placeholder, and collapses runs of whitespace.
pub fn clean_text_for_speech(text: &str) -> String {
    static TOPIC_TAG: OnceLock<Regex> = OnceLock::new();
    static BLOCK_MATH: OnceLock<Regex> = OnceLock::new();
    static INLINE_MATH: OnceLock<Regex> = OnceLock::new();
    static BOLD: OnceLock<Regex> = OnceLock::new();
    static ITALIC: OnceLock<Regex> = OnceLock::new();
    static CODE: OnceLock<Regex> = OnceLock::new();
    static HEADER: OnceLock<Regex> = OnceLock::new();
    static LINK: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();

    // Patterns are constant, so compilation cannot fail.
    fn get(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
        cell.get_or_init(|| Regex::new(pattern).expect("valid pattern"))
    }

    let mut out = get(&TOPIC_TAG, r"\[TOPIC:\s*[^\]]+\]")
        .replace_all(text, "")
        .into_owned();
    out = get(&BLOCK_MATH, r"\$\$[^$]*\$\$")
        .replace_all(&out, " mathematical expression ")
        .into_owned();
    out = get(&INLINE_MATH, r"\$[^$\n]+\$")
        .replace_all(&out, " expression ")
        .into_owned();
    out = get(&BOLD, r"\*\*([^*]+)\*\*")
        .replace_all(&out, "$1")
        .into_owned();
    out = get(&ITALIC, r"\*([^*]+)\*")
        .replace_all(&out, "$1")
        .into_owned();
    out = get(&CODE, r"`([^`]+)`").replace_all(&out, "$1").into_owned();
    out = get(&HEADER, r"(?m)^#{1,6}\s*")
        .replace_all(&out, "")
        .into_owned();
    out = get(&LINK, r"\[([^\]]+)\]\([^)]*\)")
        .replace_all(&out, "$1")
        .into_owned();
    out = get(&SPACES, r"\s+").replace_all(&out, " ").into_owned();
    out.trim().to_string()
}
