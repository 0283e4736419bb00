//! Phase stream controller.
//!
//! The state machine that sequences reasoning/answer/direct/tool phases into
//! an ordered event stream. The one guarantee the whole design exists to
//! provide: a new phase's token stream never starts while a previous phase's
//! stream has not been fully drained and its completion signaled.
//!
//! Each streamed phase gets its own bounded channel; the producer task that
//! feeds it is joined (or aborted on timeout) before the controller moves on,
//! so tokens can never leak across phases.

use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::provider::ProviderError;

use super::event::{PhaseMode, StreamEvent};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Per-phase token budget: waiting longer than this for the next token ends
/// the phase with an `error` terminal instead of hanging the session.
const DEFAULT_PHASE_TIMEOUT: Duration = Duration::from_secs(120);

/// Capacity of the per-phase token channel.
const PHASE_CHANNEL_CAPACITY: usize = 64;

// ─── State machine ───────────────────────────────────────────────────────────

/// Controller states. `Done` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Reasoning,
    Answer,
    Direct,
    ToolPhase,
    Done,
}

impl Phase {
    fn of(mode: PhaseMode) -> Self {
        match mode {
            PhaseMode::Reasoning => Phase::Reasoning,
            PhaseMode::Answer => Phase::Answer,
            PhaseMode::Direct => Phase::Direct,
            PhaseMode::Tool => Phase::ToolPhase,
        }
    }
}

/// What a finished phase produced.
#[derive(Debug, Default)]
pub struct PhaseOutcome {
    /// Accumulated text of every token the phase emitted.
    pub text: String,
    /// `true` when the phase closed with `end`; `false` after `error` or a
    /// rejected transition.
    pub completed: bool,
}

// ─── PhaseController ─────────────────────────────────────────────────────────

/// Sequences phases for one session and owns the outbound event channel.
///
/// A closed outbound channel (caller disconnected) never aborts a phase
/// early: the in-flight provider stream is still drained to completion so no
/// suspended call is orphaned. Events are simply no longer relayed.
pub struct PhaseController {
    out: mpsc::Sender<StreamEvent>,
    state: Phase,
    phase_timeout: Duration,
}

impl PhaseController {
    pub fn new(out: mpsc::Sender<StreamEvent>) -> Self {
        Self {
            out,
            state: Phase::Idle,
            phase_timeout: DEFAULT_PHASE_TIMEOUT,
        }
    }

    /// Override the per-phase timeout (tests use millisecond budgets).
    pub fn with_timeout(out: mpsc::Sender<StreamEvent>, phase_timeout: Duration) -> Self {
        Self {
            out,
            state: Phase::Idle,
            phase_timeout,
        }
    }

    pub fn state(&self) -> Phase {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == Phase::Done
    }

    /// Whether `mode` may start from the current state.
    fn try_enter(&mut self, mode: PhaseMode) -> bool {
        let next = Phase::of(mode);
        let allowed = matches!(
            (self.state, next),
            (Phase::Idle, Phase::Reasoning)
                | (Phase::Idle, Phase::Direct)
                | (Phase::Idle, Phase::ToolPhase)
                | (Phase::Reasoning, Phase::Answer)
        );
        if allowed {
            self.state = next;
        } else {
            tracing::error!(state = ?self.state, ?mode, "rejected phase transition");
        }
        allowed
    }

    async fn emit(&self, event: StreamEvent) -> bool {
        self.out.send(event).await.is_ok()
    }

    // ─── Streamed phases ────────────────────────────────────────────────

    /// Run one streamed phase over a provider token stream.
    ///
    /// Emits `start`, one `content` per token, and exactly one terminal
    /// event. The producer feeding the phase channel is always brought to
    /// completion before this returns: joined on the happy path, drained in
    /// the background when the caller disconnects, aborted on timeout.
    pub async fn run_stream_phase<S>(&mut self, mode: PhaseMode, source: S) -> PhaseOutcome
    where
        S: Stream<Item = Result<String, ProviderError>> + Send + 'static,
    {
        if !self.try_enter(mode) {
            return PhaseOutcome::default();
        }

        let mut relaying = self.emit(StreamEvent::start(mode)).await;

        // Fresh bounded channel for this phase only. The producer keeps
        // consuming the source even after the receiver is gone, so the
        // provider call is always driven to completion.
        let (tx, mut rx) = mpsc::channel::<Result<String, ProviderError>>(PHASE_CHANNEL_CAPACITY);
        let producer = tokio::spawn(async move {
            futures::pin_mut!(source);
            let mut receiver_gone = false;
            while let Some(item) = source.next().await {
                if receiver_gone {
                    continue;
                }
                if tx.send(item).await.is_err() {
                    receiver_gone = true;
                }
            }
        });

        let mut outcome = PhaseOutcome::default();
        let terminal = loop {
            match timeout(self.phase_timeout, rx.recv()).await {
                Ok(Some(Ok(token))) => {
                    outcome.text.push_str(&token);
                    if relaying {
                        relaying = self.emit(StreamEvent::content(mode, token)).await;
                    }
                }
                Ok(Some(Err(e))) => {
                    tracing::warn!(error = %e, ?mode, "provider stream failed mid-phase");
                    if relaying {
                        self.emit(StreamEvent::content(mode, e.user_message())).await;
                    }
                    break StreamEvent::error(Some(mode), e.to_string());
                }
                Ok(None) => {
                    outcome.completed = true;
                    break StreamEvent::end(mode);
                }
                Err(_) => {
                    tracing::warn!(?mode, timeout = ?self.phase_timeout, "phase timed out");
                    // The producer may be stuck on a hung provider stream;
                    // aborting it drops the stream and releases the call.
                    producer.abort();
                    break StreamEvent::error(
                        Some(mode),
                        format!("phase timed out after {}s", self.phase_timeout.as_secs()),
                    );
                }
            }
        };

        // Drain whatever the producer still holds, then join it. Mandatory
        // even when no tokens were produced — the next phase must never see
        // this stream's leftovers.
        rx.close();
        while let Some(item) = rx.recv().await {
            if let Ok(token) = item {
                outcome.text.push_str(&token);
            }
        }
        let _ = producer.await;

        if relaying {
            self.emit(terminal).await;
        }
        if !outcome.completed {
            self.state = Phase::Done;
        }
        outcome
    }

    // ─── Tool phase ─────────────────────────────────────────────────────

    /// Run the tool phase: `start`, one `content` per block, `end`.
    ///
    /// The terminal is always `end`, even when a side effect failed — the
    /// conversation itself succeeded, and the failure text is inline content.
    pub async fn run_tool_phase(&mut self, blocks: Vec<String>) {
        if !self.try_enter(PhaseMode::Tool) {
            return;
        }
        let mut relaying = self.emit(StreamEvent::start(PhaseMode::Tool)).await;
        for block in blocks {
            if relaying {
                relaying = self.emit(StreamEvent::content(PhaseMode::Tool, block)).await;
            }
        }
        if relaying {
            self.emit(StreamEvent::end(PhaseMode::Tool)).await;
        }
        self.state = Phase::Done;
    }

    // ─── Degenerate paths ───────────────────────────────────────────────

    /// A phase that failed before its token stream existed: `start`, one
    /// explanatory `content` chunk, `error` terminal, then `Done`.
    pub async fn fail_phase(&mut self, mode: PhaseMode, user_message: &str, detail: &str) {
        if !self.try_enter(mode) {
            return;
        }
        if self.emit(StreamEvent::start(mode)).await
            && self.emit(StreamEvent::content(mode, user_message)).await
        {
            self.emit(StreamEvent::error(Some(mode), detail)).await;
        }
        self.state = Phase::Done;
    }

    /// Reject the request before any phase starts: a single `error` event
    /// with no mode and no preceding `start`.
    pub async fn fail_validation(&mut self, message: &str) {
        if self.state != Phase::Idle {
            tracing::error!(state = ?self.state, "validation failure after a phase started");
            return;
        }
        self.emit(StreamEvent::error(None, message)).await;
        self.state = Phase::Done;
    }

    /// Best-effort progress note before a phase starts (slow web search).
    /// No terminal pairing requirement.
    pub async fn progress_note(&mut self, mode: PhaseMode, text: &str) {
        if self.state == Phase::Idle {
            self.emit(StreamEvent::content(mode, text)).await;
        }
    }

    /// Mark the session complete.
    pub fn finish(&mut self) {
        self.state = Phase::Done;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::event::EventType;
    use futures::stream;

    fn token_stream(
        tokens: Vec<&'static str>,
    ) -> impl Stream<Item = Result<String, ProviderError>> + Send + 'static {
        stream::iter(tokens.into_iter().map(|t| Ok(t.to_string())))
    }

    async fn collect(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(ev) = rx.recv().await {
            events.push(ev);
        }
        events
    }

    #[tokio::test]
    async fn test_reasoning_then_answer_sequence() {
        let (tx, rx) = mpsc::channel(64);
        let mut controller = PhaseController::new(tx);

        let cot = controller
            .run_stream_phase(PhaseMode::Reasoning, token_stream(vec!["think ", "hard"]))
            .await;
        assert!(cot.completed);
        assert_eq!(cot.text, "think hard");

        let answer = controller
            .run_stream_phase(PhaseMode::Answer, token_stream(vec!["42"]))
            .await;
        assert!(answer.completed);
        controller.finish();
        drop(controller);

        let events = collect(rx).await;
        let shape: Vec<(EventType, Option<PhaseMode>)> =
            events.iter().map(|e| (e.event, e.mode)).collect();
        assert_eq!(
            shape,
            vec![
                (EventType::Start, Some(PhaseMode::Reasoning)),
                (EventType::Content, Some(PhaseMode::Reasoning)),
                (EventType::Content, Some(PhaseMode::Reasoning)),
                (EventType::End, Some(PhaseMode::Reasoning)),
                (EventType::Start, Some(PhaseMode::Answer)),
                (EventType::Content, Some(PhaseMode::Answer)),
                (EventType::End, Some(PhaseMode::Answer)),
            ]
        );
    }

    #[tokio::test]
    async fn test_every_start_has_one_terminal_before_next_start() {
        let (tx, rx) = mpsc::channel(64);
        let mut controller = PhaseController::new(tx);
        controller
            .run_stream_phase(PhaseMode::Reasoning, token_stream(vec!["a"]))
            .await;
        controller
            .run_stream_phase(PhaseMode::Answer, token_stream(vec!["b"]))
            .await;
        drop(controller);

        let events = collect(rx).await;
        let mut open: Option<PhaseMode> = None;
        for event in &events {
            match event.event {
                EventType::Start => {
                    assert!(open.is_none(), "start while {open:?} still open");
                    open = event.mode;
                }
                EventType::End | EventType::Error => {
                    assert_eq!(open, event.mode, "terminal for a different mode");
                    open = None;
                }
                EventType::Content => assert_eq!(open, event.mode),
            }
        }
        assert!(open.is_none());
    }

    #[tokio::test]
    async fn test_stream_error_emits_content_then_error_terminal() {
        let (tx, rx) = mpsc::channel(64);
        let mut controller = PhaseController::new(tx);
        let source = stream::iter(vec![
            Ok("partial".to_string()),
            Err(ProviderError::HttpError { status: 429, body: "quota".to_string() }),
        ]);
        let outcome = controller.run_stream_phase(PhaseMode::Direct, source).await;
        assert!(!outcome.completed);
        assert!(controller.is_done());
        drop(controller);

        let events = collect(rx).await;
        assert_eq!(events.len(), 4); // start, content, human-readable content, error
        assert_eq!(events[2].event, EventType::Content);
        assert!(events[2].text.as_deref().unwrap_or_default().contains("quota or balance"));
        assert_eq!(events[3].event, EventType::Error);
        assert_eq!(events[3].mode, Some(PhaseMode::Direct));
    }

    #[tokio::test]
    async fn test_timeout_emits_error_and_proceeds_to_done() {
        let (tx, rx) = mpsc::channel(64);
        let mut controller = PhaseController::with_timeout(tx, Duration::from_millis(50));
        let outcome = controller
            .run_stream_phase(PhaseMode::Reasoning, stream::pending())
            .await;
        assert!(!outcome.completed);
        assert!(controller.is_done());
        drop(controller);

        let events = collect(rx).await;
        assert_eq!(events.first().map(|e| e.event), Some(EventType::Start));
        let last = events.last().unwrap();
        assert_eq!(last.event, EventType::Error);
        assert!(last.text.as_deref().unwrap_or_default().contains("timed out"));
    }

    #[tokio::test]
    async fn test_caller_disconnect_still_drains_source() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx); // caller gone before the phase starts
        let mut controller = PhaseController::new(tx);
        let outcome = controller
            .run_stream_phase(PhaseMode::Direct, token_stream(vec!["a", "b", "c"]))
            .await;
        // The stream was consumed to completion even with nobody listening.
        assert!(outcome.completed);
        assert_eq!(outcome.text, "abc");
    }

    #[tokio::test]
    async fn test_tool_phase_always_ends_with_end() {
        let (tx, rx) = mpsc::channel(64);
        let mut controller = PhaseController::new(tx);
        controller
            .run_tool_phase(vec!["draft".to_string(), "⚠️ Could not create the task: denied".to_string()])
            .await;
        assert!(controller.is_done());
        drop(controller);

        let events = collect(rx).await;
        assert_eq!(events.last().unwrap().event, EventType::End);
        assert_eq!(events.last().unwrap().mode, Some(PhaseMode::Tool));
    }

    #[tokio::test]
    async fn test_validation_failure_is_single_error_without_start() {
        let (tx, rx) = mpsc::channel(64);
        let mut controller = PhaseController::new(tx);
        controller.fail_validation("empty message").await;
        assert!(controller.is_done());
        drop(controller);

        let events = collect(rx).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, EventType::Error);
        assert!(events[0].mode.is_none());
    }

    #[tokio::test]
    async fn test_invalid_transition_is_rejected_silently() {
        let (tx, rx) = mpsc::channel(64);
        let mut controller = PhaseController::new(tx);
        // Answer may only follow Reasoning.
        let outcome = controller
            .run_stream_phase(PhaseMode::Answer, token_stream(vec!["x"]))
            .await;
        assert!(!outcome.completed);
        assert_eq!(controller.state(), Phase::Idle);
        drop(controller);
        assert!(collect(rx).await.is_empty());
    }

    #[tokio::test]
    async fn test_fail_phase_shape() {
        let (tx, rx) = mpsc::channel(64);
        let mut controller = PhaseController::new(tx);
        controller
            .fail_phase(PhaseMode::Direct, "The model is unreachable.", "connect refused")
            .await;
        assert!(controller.is_done());
        drop(controller);

        let events = collect(rx).await;
        let shape: Vec<EventType> = events.iter().map(|e| e.event).collect();
        assert_eq!(shape, vec![EventType::Start, EventType::Content, EventType::Error]);
    }
}
