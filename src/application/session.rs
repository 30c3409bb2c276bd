//! Recording session
//!
//! One tokio task owns every piece of mutable session state: the lifecycle,
//! the chunk buffer, the acquired sources, the recorder and the artifact slot.
//! Callers talk to it through a cloneable [`RecordingSession`] handle and
//! observe it through a `watch` snapshot.
//!
//! State machine:
//!   IDLE -> INITIALIZING (start: capability, permissions, acquisition)
//!   INITIALIZING -> RECORDING (recorder started)
//!   INITIALIZING -> IDLE (start-up failed, or stop arrived first)
//!   RECORDING -> FINALIZING (stop, or the recorder ended by itself)
//!   FINALIZING -> IDLE (artifact assembled and validated)

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use crate::domain::artifact::{Artifact, ArtifactSlot, Blob, ValidationOutcome};
use crate::domain::config::{AcquisitionMode, CaptureConfig};
use crate::domain::error::CaptureError;
use crate::domain::recording::{
    ChunkBuffer, InvalidStateTransition, SessionLifecycle, SessionStatus,
};

use super::acquire::{acquire_sources, CaptureSources};
use super::gate::{check_capability, require_permissions};
use super::ports::{
    MediaRecorder, ObjectUrlStore, RecorderEvent, RecorderEventSink, RecorderState, TaggedEvent,
};
use super::services::CaptureServices;
use super::validator::ArtifactValidator;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type StartReply = oneshot::Sender<Result<(), CaptureError>>;
type StopReply = oneshot::Sender<Result<Artifact, CaptureError>>;

const COMMAND_BUFFER: usize = 16;

/// What the presentation layer renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Idle,
    Initializing,
    Recording,
    Ready,
    Error,
}

impl ViewState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Recording => "recording",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }
}

/// Observable session fields. `artifact` is only ever a validated artifact;
/// `last_error` only ever holds actionable (non-benign) errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub artifact: Option<Artifact>,
    pub last_error: Option<CaptureError>,
    pub buffered_bytes: usize,
    pub chunk_count: usize,
    /// Increments each time a recorder is started
    pub generation: u64,
}

impl SessionSnapshot {
    pub fn view(&self) -> ViewState {
        match self.status {
            SessionStatus::Initializing => ViewState::Initializing,
            SessionStatus::Recording | SessionStatus::Finalizing => ViewState::Recording,
            SessionStatus::Idle if self.last_error.is_some() => ViewState::Error,
            SessionStatus::Idle if self.artifact.is_some() => ViewState::Ready,
            SessionStatus::Idle => ViewState::Idle,
        }
    }
}

enum Command {
    Start(StartReply),
    Stop(StopReply),
    Teardown(oneshot::Sender<()>),
}

/// Handle to a running session. Dropping the last handle tears the session down.
#[derive(Clone)]
pub struct RecordingSession {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<SessionSnapshot>,
}

impl RecordingSession {
    /// Spawn the session task with the default validator.
    pub fn spawn(services: CaptureServices, config: CaptureConfig) -> Self {
        let validator = ArtifactValidator::new(services.probe.clone());
        Self::spawn_with_validator(services, config, validator)
    }

    pub fn spawn_with_validator(
        services: CaptureServices,
        config: CaptureConfig,
        validator: ArtifactValidator,
    ) -> Self {
        let (commands_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (events_tx, events) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(SessionSnapshot::default());

        let actor = SessionActor {
            services,
            config,
            validator,
            lifecycle: SessionLifecycle::new(),
            commands,
            events_tx,
            events,
            state: state_tx,
            generation: 0,
            chunks: ChunkBuffer::new(),
            sources: None,
            parked: None,
            recorder: None,
            slot: ArtifactSlot::new(),
            artifact_validated: false,
            last_error: None,
            pending_start: None,
            start_reply: None,
            pending_artifact: None,
            pending_validation: None,
            stop_reply: None,
        };
        tokio::spawn(actor.run());

        Self {
            commands: commands_tx,
            state,
        }
    }

    /// Begin recording. Resolves once the recorder is running.
    pub async fn start(&self) -> Result<(), CaptureError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Start(tx)).await?;
        rx.await.unwrap_or(Err(CaptureError::SessionClosed))
    }

    /// Stop recording. Resolves with the validated artifact once finalization
    /// and validation are complete.
    pub async fn stop(&self) -> Result<Artifact, CaptureError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Stop(tx)).await?;
        rx.await.unwrap_or(Err(CaptureError::SessionClosed))
    }

    /// Abrupt termination: release everything and end the session task.
    pub async fn teardown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.send(Command::Teardown(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn send(&self, command: Command) -> Result<(), CaptureError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CaptureError::SessionClosed)
    }
}

struct SessionActor {
    services: CaptureServices,
    config: CaptureConfig,
    validator: ArtifactValidator,
    lifecycle: SessionLifecycle,
    commands: mpsc::Receiver<Command>,
    events_tx: mpsc::UnboundedSender<TaggedEvent>,
    events: mpsc::UnboundedReceiver<TaggedEvent>,
    state: watch::Sender<SessionSnapshot>,
    generation: u64,
    chunks: ChunkBuffer,
    sources: Option<CaptureSources>,
    /// Sources warmed up ahead of the first start in eager mode
    parked: Option<CaptureSources>,
    recorder: Option<Box<dyn MediaRecorder>>,
    slot: ArtifactSlot,
    artifact_validated: bool,
    last_error: Option<CaptureError>,
    pending_start: Option<BoxFuture<Result<CaptureSources, CaptureError>>>,
    /// `None` while a pending start-up is an eager warm-up nobody waits on
    start_reply: Option<StartReply>,
    /// Minting the URL for a finalized blob
    pending_artifact: Option<BoxFuture<Result<Artifact, CaptureError>>>,
    pending_validation: Option<BoxFuture<ValidationOutcome>>,
    stop_reply: Option<StopReply>,
}

/// Drive the future in `slot` to completion and clear the slot. Never
/// resolves while the slot is empty.
async fn next_pending<T>(slot: &mut Option<BoxFuture<T>>) -> T {
    match slot.as_mut() {
        Some(future) => {
            let output = future.await;
            *slot = None;
            output
        }
        None => std::future::pending().await,
    }
}

/// Release whatever an abandoned start-up eventually acquires.
fn detach_start(future: BoxFuture<Result<CaptureSources, CaptureError>>) {
    tokio::spawn(async move {
        match future.await {
            Ok(sources) => {
                tracing::info!("releasing devices acquired after start-up was cancelled");
                sources.release();
            }
            Err(e) => tracing::debug!(error = %e, "cancelled start-up failed"),
        }
    });
}

/// Revoke the URL of an artifact nobody will receive.
fn detach_artifact(
    future: BoxFuture<Result<Artifact, CaptureError>>,
    urls: Arc<dyn ObjectUrlStore>,
) {
    tokio::spawn(async move {
        if let Ok(artifact) = future.await {
            tracing::debug!(url = %artifact.url, "revoking artifact minted after teardown");
            urls.revoke(&artifact.url);
        }
    });
}

impl SessionActor {
    async fn run(mut self) {
        if self.config.acquisition == AcquisitionMode::Eager {
            self.warm_up();
        }
        self.publish();

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Start(reply)) => self.handle_start(reply),
                    Some(Command::Stop(reply)) => self.handle_stop(reply),
                    Some(Command::Teardown(done)) => {
                        self.teardown();
                        let _ = done.send(());
                        break;
                    }
                    None => {
                        self.teardown();
                        break;
                    }
                },
                Some((generation, event)) = self.events.recv() => {
                    self.handle_event(generation, event);
                }
                result = next_pending(&mut self.pending_start) => {
                    self.finish_start(result);
                }
                result = next_pending(&mut self.pending_artifact) => {
                    self.finish_artifact(result);
                }
                outcome = next_pending(&mut self.pending_validation) => {
                    self.finish_validation(outcome);
                }
            }
        }

        tracing::debug!("recording session closed");
    }

    fn publish(&self) {
        let artifact = if self.artifact_validated {
            self.slot.current().cloned()
        } else {
            None
        };
        self.state.send_replace(SessionSnapshot {
            status: self.lifecycle.status(),
            artifact,
            last_error: self.last_error.clone(),
            buffered_bytes: self.chunks.total_bytes(),
            chunk_count: self.chunks.len(),
            generation: self.generation,
        });
    }

    fn record_error(&mut self, err: &CaptureError) {
        if err.is_benign() {
            return;
        }
        tracing::warn!(code = err.code(), error = %err, "recording session error");
        self.last_error = Some(err.clone());
    }

    fn transition(&mut self, step: fn(&mut SessionLifecycle) -> Result<(), InvalidStateTransition>) {
        if let Err(e) = step(&mut self.lifecycle) {
            tracing::error!(error = %e, "unexpected session transition");
        }
    }

    fn prepare_future(&self) -> BoxFuture<Result<CaptureSources, CaptureError>> {
        let services = self.services.clone();
        let config = self.config;
        Box::pin(async move {
            require_permissions(services.permissions.as_ref()).await?;
            acquire_sources(&services, &config).await
        })
    }

    fn warm_up(&mut self) {
        if let Err(e) = check_capability(self.services.capability.as_ref(), self.config.format) {
            self.record_error(&e);
            return;
        }
        tracing::info!("acquiring devices ahead of start");
        self.transition(SessionLifecycle::begin_initializing);
        self.pending_start = Some(self.prepare_future());
    }

    fn handle_start(&mut self, reply: StartReply) {
        match self.lifecycle.status() {
            SessionStatus::Recording => {
                let _ = reply.send(Err(CaptureError::AlreadyRecording));
            }
            SessionStatus::Initializing if self.start_reply.is_none() && self.pending_start.is_some() => {
                tracing::debug!("start joined the eager warm-up");
                self.last_error = None;
                self.start_reply = Some(reply);
                self.publish();
            }
            status @ (SessionStatus::Initializing | SessionStatus::Finalizing) => {
                let _ = reply.send(Err(CaptureError::Busy(status)));
            }
            SessionStatus::Idle => {
                self.last_error = None;
                if let Err(e) = check_capability(self.services.capability.as_ref(), self.config.format) {
                    self.record_error(&e);
                    self.publish();
                    let _ = reply.send(Err(e));
                    return;
                }

                self.transition(SessionLifecycle::begin_initializing);
                self.start_reply = Some(reply);

                match self.parked.take() {
                    Some(sources) if sources.is_live() => {
                        tracing::debug!("using warmed-up devices");
                        self.finish_start(Ok(sources));
                        return;
                    }
                    Some(stale) => {
                        tracing::warn!("warmed-up devices ended; acquiring again");
                        stale.release();
                    }
                    None => {}
                }
                self.pending_start = Some(self.prepare_future());
                self.publish();
            }
        }
    }

    fn finish_start(&mut self, result: Result<CaptureSources, CaptureError>) {
        let reply = self.start_reply.take();
        let result = match (result, reply.is_some()) {
            (Ok(sources), false) => {
                tracing::info!("devices ready; waiting for start");
                self.parked = Some(sources);
                self.transition(SessionLifecycle::abort);
                self.publish();
                return;
            }
            (Ok(sources), true) => self.begin_recording(sources),
            (Err(e), _) => Err(e),
        };

        if let Err(e) = &result {
            self.transition(SessionLifecycle::abort);
            self.record_error(e);
        }
        self.publish();
        if let Some(reply) = reply {
            let _ = reply.send(result);
        }
    }

    fn begin_recording(&mut self, sources: CaptureSources) -> Result<(), CaptureError> {
        let recordable = sources.recordable().ok_or_else(|| {
            CaptureError::DeviceUnavailable("no recordable stream was produced".to_string())
        })?;

        let generation = self.generation + 1;
        let sink = RecorderEventSink::new(generation, self.events_tx.clone());
        let mut recorder = self
            .services
            .recorders
            .create(recordable, self.config.format, sink)?;
        recorder.start()?;

        self.generation = generation;
        self.release_artifact();
        self.chunks.clear();
        self.lifecycle.begin_recording()?;
        self.sources = Some(sources);
        self.recorder = Some(recorder);

        tracing::info!(generation, format = %self.config.format, "recording started");
        Ok(())
    }

    fn handle_stop(&mut self, reply: StopReply) {
        match self.lifecycle.status() {
            SessionStatus::Recording => {
                self.transition(SessionLifecycle::begin_finalizing);
                self.stop_reply = Some(reply);
                let flush = self.recorder.as_mut().map(|recorder| recorder.stop());
                match flush {
                    Some(Ok(())) => {
                        tracing::info!(bytes = self.chunks.total_bytes(), "stopping recorder");
                        self.publish();
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "recorder refused to stop; finalizing buffered data");
                        self.finalize();
                    }
                    None => self.finalize(),
                }
            }
            SessionStatus::Initializing if self.start_reply.is_some() => {
                tracing::info!("stop requested during start-up; cancelling");
                if let Some(future) = self.pending_start.take() {
                    detach_start(future);
                }
                if let Some(start) = self.start_reply.take() {
                    let _ = start.send(Err(CaptureError::Cancelled));
                }
                self.transition(SessionLifecycle::abort);
                self.publish();
                let _ = reply.send(Err(CaptureError::NotRecording));
            }
            _ => {
                let _ = reply.send(Err(CaptureError::NotRecording));
            }
        }
    }

    fn handle_event(&mut self, generation: u64, event: RecorderEvent) {
        if generation != self.generation || self.recorder.is_none() {
            tracing::trace!(generation, current = self.generation, "ignoring stale recorder event");
            return;
        }

        match event {
            RecorderEvent::DataAvailable(bytes) => {
                let len = bytes.len();
                if self.chunks.push(bytes) {
                    tracing::trace!(len, total = self.chunks.total_bytes(), "chunk buffered");
                    self.publish();
                }
            }
            RecorderEvent::Error(message) => {
                tracing::warn!(%message, "recorder reported an error");
            }
            RecorderEvent::Stopped => match self.lifecycle.status() {
                SessionStatus::Finalizing => self.finalize(),
                SessionStatus::Recording => {
                    tracing::warn!("recorder stopped on its own; finalizing");
                    self.transition(SessionLifecycle::begin_finalizing);
                    self.finalize();
                }
                _ => {}
            },
        }
    }

    /// Assemble the blob, release every source and mint its URL. The
    /// validator runs once the URL exists; status stays FINALIZING until it
    /// completes.
    fn finalize(&mut self) {
        self.recorder.take();
        let bytes = self.chunks.take_concat();
        if let Some(sources) = self.sources.take() {
            sources.release();
        }
        self.release_artifact();

        let blob = Blob::new(bytes, self.config.format);
        let urls = self.services.urls.clone();
        self.pending_artifact = Some(Box::pin(async move {
            let url = urls.create(&blob).await?;
            Ok::<_, CaptureError>(Artifact::new(blob, url))
        }));
        self.publish();
    }

    fn finish_artifact(&mut self, result: Result<Artifact, CaptureError>) {
        let artifact = match result {
            Ok(artifact) => artifact,
            Err(e) => {
                self.complete_stop(Err(e));
                return;
            }
        };
        tracing::info!(bytes = artifact.size(), url = %artifact.url, "recording finalized");

        self.slot.replace_with(artifact.clone(), |_| {});
        let validator = self.validator.clone();
        self.pending_validation = Some(Box::pin(async move { validator.validate(&artifact).await }));
        self.publish();
    }

    fn finish_validation(&mut self, outcome: ValidationOutcome) {
        let result = match outcome.into_result() {
            Ok(duration) => match self.slot.current().cloned() {
                Some(artifact) => {
                    tracing::info!(duration, bytes = artifact.size(), "artifact ready");
                    self.artifact_validated = true;
                    Ok(artifact)
                }
                None => Err(CaptureError::Storage("artifact was released during validation".to_string())),
            },
            Err(e) => {
                self.release_artifact();
                Err(e)
            }
        };
        self.complete_stop(result);
    }

    fn complete_stop(&mut self, result: Result<Artifact, CaptureError>) {
        if let Err(e) = &result {
            self.record_error(e);
        }
        self.transition(SessionLifecycle::finish);
        self.publish();
        if let Some(reply) = self.stop_reply.take() {
            let _ = reply.send(result);
        }
    }

    fn release_artifact(&mut self) {
        let urls = self.services.urls.clone();
        if self.slot.release_with(|url| {
            urls.revoke(url);
        }) {
            tracing::debug!("previous artifact released");
        }
        self.artifact_validated = false;
    }

    /// Best-effort cleanup on abrupt termination. Signals the recorder once and
    /// does not wait for it.
    fn teardown(&mut self) {
        tracing::info!(status = %self.lifecycle.status(), "tearing down recording session");

        if let Some(mut recorder) = self.recorder.take() {
            if recorder.state() == RecorderState::Recording {
                if let Err(e) = recorder.stop() {
                    tracing::debug!(error = %e, "recorder stop during teardown failed");
                }
            }
        }
        if let Some(future) = self.pending_start.take() {
            detach_start(future);
        }
        if let Some(reply) = self.start_reply.take() {
            let _ = reply.send(Err(CaptureError::Cancelled));
        }
        if let Some(reply) = self.stop_reply.take() {
            let _ = reply.send(Err(CaptureError::Cancelled));
        }
        if let Some(future) = self.pending_artifact.take() {
            detach_artifact(future, self.services.urls.clone());
        }
        self.pending_validation = None;

        if let Some(sources) = self.sources.take() {
            sources.release();
        }
        if let Some(parked) = self.parked.take() {
            parked.release();
        }
        self.release_artifact();
        self.chunks.clear();
        self.lifecycle.reset();
        self.publish();
    }
}
