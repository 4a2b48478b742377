//! Run lifecycle for a single conversation
//!
//! Each submission gets a fresh token. A forwarder task reads the run stream
//! and pushes frames into one queue; the session applies them in arrival
//! order and drops anything tagged with a token that is no longer active.

use super::notify::{ErrorNotifier, SessionEvent};
use super::request::{SubmitInput, SubmitOptions};
use super::SessionError;
use crate::artifact::ArtifactRegistry;
use crate::config::ClientConfig;
use crate::frame::Frame;
use crate::interrupt::{
    transition, Decision, Effect, Interrupt, InterruptEvent, InterruptState, TransitionError,
    TransitionResult,
};
use crate::message::{self, Checkpoint, ContentBlock, Message, Role, ThreadStatus};
use crate::reconcile::reconcile;
use crate::transport::{Command, RunInput, RunRequest, RunTransport, TransportError};
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

const INCOMING_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 256;

/// Identifies one submission; frames carry the token of the run they belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmissionToken(u64);

impl fmt::Display for SubmissionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// What a forwarder reports back
#[derive(Debug)]
pub(crate) enum Incoming {
    Frame {
        token: SubmissionToken,
        frame: Frame,
    },
    Failed {
        token: SubmissionToken,
        error: TransportError,
    },
    Closed {
        token: SubmissionToken,
    },
}

impl Incoming {
    fn token(&self) -> SubmissionToken {
        match self {
            Incoming::Frame { token, .. }
            | Incoming::Failed { token, .. }
            | Incoming::Closed { token } => *token,
        }
    }
}

struct ActiveRun {
    token: SubmissionToken,
    cancel: CancellationToken,
}

/// Stream session for the active thread
pub struct StreamSession<T: RunTransport + 'static> {
    transport: Arc<T>,
    assistant_id: String,
    stream_modes: Vec<String>,

    thread_id: Option<String>,
    confirmed: Vec<Message>,
    optimistic: Option<Vec<Message>>,
    interrupt: InterruptState,
    artifacts: ArtifactRegistry,

    loading: bool,
    error: Option<String>,
    notifier: ErrorNotifier,
    /// Message count when the current submission started
    baseline_len: usize,
    first_token_received: bool,

    active: Option<ActiveRun>,
    next_token: u64,
    incoming_tx: mpsc::Sender<Incoming>,
    incoming_rx: mpsc::Receiver<Incoming>,
    events_tx: broadcast::Sender<SessionEvent>,
}

impl<T: RunTransport + 'static> StreamSession<T> {
    pub fn new(transport: T, config: &ClientConfig) -> Self {
        let (incoming_tx, incoming_rx) = mpsc::channel(INCOMING_CAPACITY);
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            transport: Arc::new(transport),
            assistant_id: config.assistant_id.clone(),
            stream_modes: config.stream_modes.clone(),
            thread_id: None,
            confirmed: Vec::new(),
            optimistic: None,
            interrupt: InterruptState::default(),
            artifacts: ArtifactRegistry::new(),
            loading: false,
            error: None,
            notifier: ErrorNotifier::default(),
            baseline_len: 0,
            first_token_received: false,
            active: None,
            next_token: 0,
            incoming_tx,
            incoming_rx,
            events_tx,
        }
    }

    // ========================================================================
    // Read access
    // ========================================================================

    /// Messages to render: the optimistic list while it stands, else the confirmed one
    pub fn messages(&self) -> &[Message] {
        self.optimistic.as_deref().unwrap_or(&self.confirmed)
    }

    /// Last list confirmed by the backend
    pub fn confirmed_messages(&self) -> &[Message] {
        &self.confirmed
    }

    pub fn visible_messages(&self) -> impl Iterator<Item = &Message> {
        message::visible_messages(self.messages())
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// The interrupt awaiting a decision, if any
    pub fn interrupt(&self) -> Option<&Interrupt> {
        self.interrupt.active_interrupt()
    }

    pub fn interrupt_state(&self) -> &InterruptState {
        &self.interrupt
    }

    /// Reply text being composed for the active interrupt
    pub fn draft(&self) -> Option<&str> {
        match &self.interrupt {
            InterruptState::Interrupted { draft, .. } => Some(draft),
            InterruptState::Running | InterruptState::Resuming { .. } => None,
        }
    }

    pub fn status(&self) -> ThreadStatus {
        if self.interrupt.active_interrupt().is_some() {
            ThreadStatus::Interrupted
        } else if self.loading {
            ThreadStatus::Running
        } else {
            ThreadStatus::Idle
        }
    }

    pub fn first_token_received(&self) -> bool {
        self.first_token_received
    }

    pub fn artifacts(&self) -> &ArtifactRegistry {
        &self.artifacts
    }

    pub fn artifacts_mut(&mut self) -> &mut ArtifactRegistry {
        &mut self.artifacts
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Start a run, replacing any run in flight.
    ///
    /// With a resume command the run continues the active interrupt and
    /// `input` must be `None`; otherwise the pending tool calls of the
    /// confirmed history are answered before the new messages are sent.
    /// Must be called inside a Tokio runtime.
    pub fn submit(
        &mut self,
        input: Option<SubmitInput>,
        mut options: SubmitOptions,
    ) -> Result<SubmissionToken, SessionError> {
        if options.command.is_some() && input.is_some() {
            return Err(SessionError::InputWithResume);
        }
        if let Some(command) = options.command.take() {
            let token = self
                .drive_interrupt(InterruptEvent::Resume(command.resume), options)?
                .ok_or(TransitionError::NoActiveInterrupt)?;
            return Ok(token);
        }

        // A fresh run supersedes whatever the interrupted one was waiting for
        self.reset_interrupt();

        let run_input = input.map(|input| self.build_run_input(input));
        self.begin_submission();
        if let Some(optimistic) = options.optimistic.take() {
            let speculative = optimistic(self.messages());
            self.apply_optimistic(speculative);
        }

        Ok(self.start_run(run_input, None, options.checkpoint, options.stream_mode))
    }

    /// Send a human turn, or answer the interrupt when it takes free text.
    pub fn submit_text(
        &mut self,
        text: &str,
        attachments: Vec<ContentBlock>,
    ) -> Result<SubmissionToken, SessionError> {
        if text.trim().is_empty() && attachments.is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        if attachments.is_empty()
            && self
                .interrupt
                .active_interrupt()
                .is_some_and(Interrupt::accepts_text)
        {
            return self.respond(Decision::Respond(text.to_string()));
        }

        let human = Message::human_with_blocks(text, attachments);
        let shown = human.clone();
        self.submit(
            Some(SubmitInput::new(vec![human])),
            SubmitOptions::default().optimistic(move |previous| {
                let mut next = reconcile(previous);
                next.push(shown);
                next
            }),
        )
    }

    /// Submit a suggested prompt as if the user had typed it
    pub fn handle_action(&mut self, prompt: &str) -> Result<SubmissionToken, SessionError> {
        self.submit_text(prompt, Vec::new())
    }

    /// Answer the active interrupt
    pub fn respond(&mut self, decision: Decision) -> Result<SubmissionToken, SessionError> {
        let token = self
            .drive_interrupt(InterruptEvent::Decide(decision), SubmitOptions::default())?
            .ok_or(TransitionError::NoActiveInterrupt)?;
        Ok(token)
    }

    /// Resubmit the response of a failed resume
    pub fn retry_resume(&mut self) -> Result<SubmissionToken, SessionError> {
        let token = self
            .drive_interrupt(InterruptEvent::RetryResume, SubmitOptions::default())?
            .ok_or(TransitionError::NothingToRetry)?;
        Ok(token)
    }

    pub fn set_draft(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        self.drive_interrupt(InterruptEvent::DraftChanged(text.into()), SubmitOptions::default())?;
        Ok(())
    }

    /// Run again from an earlier checkpoint without a new human message
    pub fn regenerate(&mut self, checkpoint: Checkpoint) -> Result<SubmissionToken, SessionError> {
        if self.thread_id.is_none() {
            return Err(SessionError::NoThread);
        }
        let token = self.submit(None, SubmitOptions::default().checkpoint(checkpoint))?;
        // The message being regenerated is about to be replaced
        self.baseline_len = self.baseline_len.saturating_sub(1);
        Ok(token)
    }

    /// Abort the run in flight; messages received so far stay as they are
    pub fn stop(&mut self) {
        if !self.cancel_active() {
            return;
        }
        tracing::info!(thread_id = self.thread_id.as_deref().unwrap_or("<new>"), "Run stopped");
        self.set_loading(false);
        if self.interrupt.is_resuming() {
            self.dispatch(InterruptEvent::ResumeFailed {
                message: "stopped".to_string(),
            });
        }
    }

    /// Make another thread active, replacing all per-thread state.
    ///
    /// `None` starts a new conversation. Frames of the previous thread that
    /// are still in flight are discarded.
    pub fn switch_thread(&mut self, thread_id: Option<String>, history: Vec<Message>) {
        if thread_id.is_some() && thread_id == self.thread_id {
            return;
        }
        tracing::info!(
            from = self.thread_id.as_deref().unwrap_or("<new>"),
            to = thread_id.as_deref().unwrap_or("<new>"),
            "Switching thread"
        );

        self.cancel_active();
        self.set_loading(false);
        self.artifacts.reset();
        self.reset_interrupt();
        self.thread_id.clone_from(&thread_id);
        self.confirmed = history;
        self.optimistic = None;
        self.error = None;
        self.notifier.reset();
        self.baseline_len = self.confirmed.len();
        self.first_token_received = false;

        self.emit(SessionEvent::ThreadSwitched { thread_id });
        self.emit(SessionEvent::MessagesChanged {
            count: self.confirmed.len(),
        });
    }

    // ========================================================================
    // Stream consumption
    // ========================================================================

    /// Apply the next update of the active run.
    ///
    /// Returns false once no run is active.
    pub async fn next_update(&mut self) -> bool {
        if self.active.is_none() {
            return false;
        }
        match self.incoming_rx.recv().await {
            Some(incoming) => {
                self.handle_incoming(incoming);
                true
            }
            None => false,
        }
    }

    /// Drive the active run to completion
    pub async fn run_until_idle(&mut self) {
        while self.next_update().await {}
    }

    pub(crate) fn handle_incoming(&mut self, incoming: Incoming) {
        let token = incoming.token();
        if self.active.as_ref().map(|run| run.token) != Some(token) {
            tracing::debug!(token = %token, "Discarding update from stale submission");
            return;
        }

        match incoming {
            Incoming::Frame { frame, .. } => self.apply_frame(frame),
            Incoming::Failed { error, .. } if !error.is_terminal() => {
                tracing::warn!(token = %token, error = %error, "Skipping malformed frame");
            }
            Incoming::Failed { error, .. } => self.finish_with_error(&error.message),
            Incoming::Closed { .. } => self.finish_ok(),
        }
    }

    fn apply_frame(&mut self, frame: Frame) {
        tracing::trace!(kind = frame.kind(), "Applying frame");
        match frame {
            Frame::ValueSnapshot { messages } => self.apply_snapshot(messages),
            Frame::Metadata(value) => self.emit(SessionEvent::Metadata(value)),
            Frame::Custom(value) => self.emit(SessionEvent::Custom(value)),
            Frame::Interrupt(interrupt) => {
                tracing::info!(interrupt_id = %interrupt.id, "Run interrupted");
                // The run is paused server-side; nothing more belongs to it
                self.cancel_active();
                self.set_loading(false);
                self.dispatch(InterruptEvent::InterruptReceived(interrupt));
            }
            Frame::ThreadId(thread_id) => self.adopt_thread_id(thread_id),
            Frame::Error { message } => self.finish_with_error(&message),
        }
    }

    fn apply_snapshot(&mut self, messages: Vec<Message>) {
        self.confirmed = messages;
        if self
            .optimistic
            .as_ref()
            .is_some_and(|optimistic| self.confirmed.len() >= optimistic.len())
        {
            self.optimistic = None;
        }

        if !self.first_token_received {
            let current = self.messages();
            let arrived = current.len() != self.baseline_len
                && current.last().is_some_and(|m| m.role == Role::Assistant);
            if arrived {
                self.first_token_received = true;
                self.emit(SessionEvent::FirstToken);
            }
        }

        self.emit(SessionEvent::MessagesChanged {
            count: self.messages().len(),
        });
    }

    fn adopt_thread_id(&mut self, thread_id: String) {
        match &self.thread_id {
            None => {
                tracing::info!(thread_id = %thread_id, "Backend assigned thread");
                self.thread_id = Some(thread_id.clone());
                self.emit(SessionEvent::ThreadIdAssigned(thread_id));
            }
            Some(current) if *current == thread_id => {}
            Some(current) => {
                tracing::warn!(
                    current = %current,
                    reported = %thread_id,
                    "Ignoring thread id for a conversation that already has one"
                );
            }
        }
    }

    fn finish_ok(&mut self) {
        self.active = None;
        self.set_loading(false);
        tracing::debug!("Run stream closed");
        self.dispatch(InterruptEvent::StreamCompleted);
    }

    /// End the run with an error; messages received so far are kept
    fn finish_with_error(&mut self, message: &str) {
        self.cancel_active();
        self.set_loading(false);
        tracing::error!(
            thread_id = self.thread_id.as_deref().unwrap_or("<new>"),
            error = %message,
            "Run failed"
        );

        self.error = Some(message.to_string());
        if self.notifier.should_show(message) {
            self.emit(SessionEvent::Error {
                message: message.to_string(),
            });
        }

        if self.interrupt.is_resuming() {
            self.dispatch(InterruptEvent::ResumeFailed {
                message: message.to_string(),
            });
        }
    }

    // ========================================================================
    // Interrupt machine
    // ========================================================================

    fn drive_interrupt(
        &mut self,
        event: InterruptEvent,
        options: SubmitOptions,
    ) -> Result<Option<SubmissionToken>, TransitionError> {
        let result = transition(&self.interrupt, event)?;
        Ok(self.apply_transition(result, options))
    }

    /// Feed a stream-side event; these never fail
    fn dispatch(&mut self, event: InterruptEvent) {
        if let Err(e) = self.drive_interrupt(event, SubmitOptions::default()) {
            tracing::warn!(error = %e, state = self.interrupt.name(), "Interrupt event rejected");
        }
    }

    fn reset_interrupt(&mut self) {
        if !self.interrupt.is_running() {
            self.dispatch(InterruptEvent::Reset);
        }
    }

    fn apply_transition(
        &mut self,
        result: TransitionResult,
        mut options: SubmitOptions,
    ) -> Option<SubmissionToken> {
        let from = self.interrupt.name();
        self.interrupt = result.new_state;
        if from != self.interrupt.name() {
            tracing::debug!(from, to = self.interrupt.name(), "Interrupt state changed");
        }

        let mut token = None;
        for effect in result.effects {
            match effect {
                Effect::SubmitResume {
                    response,
                    checkpoint,
                } => {
                    tracing::info!(response = response.type_name(), "Resuming interrupted run");
                    self.begin_submission();
                    if let Some(optimistic) = options.optimistic.take() {
                        let speculative = optimistic(self.messages());
                        self.apply_optimistic(speculative);
                    }
                    token = Some(self.start_run(
                        None,
                        Some(Command { resume: response }),
                        options.checkpoint.take().or(checkpoint),
                        options.stream_mode.take(),
                    ));
                }
                Effect::NotifyInterrupt { interrupt } => {
                    self.emit(SessionEvent::Interrupted(interrupt));
                }
                Effect::NotifyCleared => self.emit(SessionEvent::InterruptCleared),
            }
        }
        token
    }

    // ========================================================================
    // Run plumbing
    // ========================================================================

    fn build_run_input(&self, input: SubmitInput) -> RunInput {
        let mut messages = reconcile(&self.confirmed);
        messages.extend(input.messages);

        let mut context = input.context.unwrap_or_default();
        if let Some(artifact) = self.artifacts.submission_context() {
            context.extend(artifact);
        }

        RunInput {
            messages,
            context: (!context.is_empty()).then_some(context),
        }
    }

    fn begin_submission(&mut self) {
        self.baseline_len = self.messages().len();
        self.first_token_received = false;
        self.error = None;
    }

    fn apply_optimistic(&mut self, messages: Vec<Message>) {
        self.optimistic = Some(messages);
        self.emit(SessionEvent::MessagesChanged {
            count: self.messages().len(),
        });
    }

    fn start_run(
        &mut self,
        input: Option<RunInput>,
        command: Option<Command>,
        checkpoint: Option<Checkpoint>,
        stream_mode: Option<Vec<String>>,
    ) -> SubmissionToken {
        self.cancel_active();

        self.next_token += 1;
        let token = SubmissionToken(self.next_token);
        let request = RunRequest {
            thread_id: self.thread_id.clone(),
            assistant_id: self.assistant_id.clone(),
            input,
            command,
            checkpoint,
            stream_mode: stream_mode.unwrap_or_else(|| self.stream_modes.clone()),
        };

        tracing::info!(
            token = %token,
            thread_id = request.thread_id.as_deref().unwrap_or("<new>"),
            resume = request.command.is_some(),
            "Submitting run"
        );

        let cancel = CancellationToken::new();
        self.active = Some(ActiveRun {
            token,
            cancel: cancel.clone(),
        });
        self.set_loading(true);

        tokio::spawn(forward_run(
            Arc::clone(&self.transport),
            request,
            token,
            cancel,
            self.incoming_tx.clone(),
        ));
        token
    }

    /// Cancel the active run, if any; returns whether one was active
    fn cancel_active(&mut self) -> bool {
        match self.active.take() {
            Some(run) => {
                run.cancel.cancel();
                tracing::debug!(token = %run.token, "Cancelled run");
                true
            }
            None => false,
        }
    }

    fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.emit(SessionEvent::Loading(loading));
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events_tx.send(event);
    }
}

/// Open the run stream and push its items to the session until it ends or is
/// cancelled. Dropping the stream on cancel aborts the request.
async fn forward_run<T: RunTransport>(
    transport: Arc<T>,
    request: RunRequest,
    token: SubmissionToken,
    cancel: CancellationToken,
    tx: mpsc::Sender<Incoming>,
) {
    let opened = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        opened = transport.stream_run(&request) => opened,
    };

    let mut frames = match opened {
        Ok(frames) => frames,
        Err(error) => {
            let _ = tx.send(Incoming::Failed { token, error }).await;
            return;
        }
    };

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            next = frames.next() => next,
        };

        let (incoming, done) = match next {
            Some(Ok(frame)) => (Incoming::Frame { token, frame }, false),
            Some(Err(error)) => (Incoming::Failed { token, error }, false),
            None => (Incoming::Closed { token }, true),
        };

        if tx.send(incoming).await.is_err() || done {
            return;
        }
    }
}
