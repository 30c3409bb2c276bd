//! Runners for the `record` and `check` commands

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use tokio::time::{interval, Duration as TokioDuration};

use crate::application::ports::{ArtifactSink, ConfigStore, RecorderCapability};
use crate::application::{
    check_capability, check_permissions, CaptureServices, RecordingSession, SessionSnapshot,
};
use crate::domain::artifact::Artifact;
use crate::domain::config::{AppConfig, CaptureConfig, DeviceSelection};
use crate::domain::error::CaptureError;
use crate::domain::media::PermissionState;
use crate::domain::recording::{Duration, SessionStatus};
use crate::infrastructure::{
    DeviceNodePermissions, DirectorySink, FfmpegCapability, FfmpegFramePlayer,
    FfmpegRecorderFactory, FfprobeProbe, LinuxMediaDevices, SpoolUrlStore, XdgConfigStore,
};

use super::presenter::{human_size, Presenter};
use super::signals::{StopRequest, StopSignals};

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

const PROGRESS_INTERVAL_MS: u64 = 250;

/// Everything a recording run needs, resolved from the merged config
#[derive(Debug, Clone)]
pub struct RecordOptions {
    /// When the recording stops on its own
    pub limit: Duration,
    pub capture: CaptureConfig,
    pub devices: DeviceSelection,
    pub output_dir: PathBuf,
}

impl RecordOptions {
    /// Resolve options; an unparsable duration is a usage error.
    pub fn from_config(config: &AppConfig) -> Result<Self, String> {
        let limit = match config.duration.as_deref() {
            Some(s) => s
                .parse::<Duration>()
                .map_err(|e| format!("Invalid duration: {}", e))?,
            None => match config.max_duration.as_deref() {
                Some(s) => s
                    .parse::<Duration>()
                    .map_err(|e| format!("Invalid max-duration: {}", e))?,
                None => Duration::default_max_duration(),
            },
        };

        Ok(Self {
            limit,
            capture: config.capture_config(),
            devices: config.device_selection(),
            output_dir: config.output_dir_or_default(),
        })
    }
}

/// Load and merge configuration: defaults < file < CLI
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = match store.load().await {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable config file");
            AppConfig::empty()
        }
    };

    AppConfig::defaults().merge(file_config).merge(cli_config)
}

/// Wire the production adapters
pub async fn build_services(devices: DeviceSelection) -> Result<CaptureServices, CaptureError> {
    let urls = SpoolUrlStore::new()?;
    Ok(CaptureServices {
        capability: Arc::new(FfmpegCapability::detect().await),
        permissions: Arc::new(DeviceNodePermissions::new()),
        devices: Arc::new(LinuxMediaDevices::new(devices)),
        frames: Arc::new(FfmpegFramePlayer::new()),
        recorders: Arc::new(FfmpegRecorderFactory::new()),
        urls: Arc::new(urls),
        probe: Arc::new(FfprobeProbe::new()),
    })
}

/// Record once and save the validated artifact
pub async fn run_record(options: RecordOptions, mut signals: StopSignals) -> ExitCode {
    let mut presenter = Presenter::new();

    let services = match build_services(options.devices.clone()).await {
        Ok(services) => services,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let session = RecordingSession::spawn(services, options.capture);
    let sink = DirectorySink::new(&options.output_dir);

    let code = record_with(&session, &sink, &options, &mut signals, &mut presenter).await;
    session.teardown().await;
    code
}

/// Drive one recording through an already spawned session
pub async fn record_with(
    session: &RecordingSession,
    sink: &dyn ArtifactSink,
    options: &RecordOptions,
    signals: &mut StopSignals,
    presenter: &mut Presenter,
) -> ExitCode {
    presenter.start_spinner("Opening devices...");

    let started = tokio::select! {
        result = session.start() => result,
        _ = signals.recv() => {
            presenter.spinner_fail("Cancelled");
            return ExitCode::from(EXIT_ERROR);
        }
    };
    if let Err(e) = started {
        presenter.spinner_fail(&e.to_string());
        return ExitCode::from(EXIT_ERROR);
    }

    tracing::info!(limit = %options.limit, pipeline = %options.capture.pipeline, "recording");
    let begun = Instant::now();
    let limit_ms = options.limit.as_millis();
    let mut ticker = interval(TokioDuration::from_millis(PROGRESS_INTERVAL_MS));
    let mut state = session.subscribe();

    let request = loop {
        tokio::select! {
            _ = ticker.tick() => {
                let elapsed = begun.elapsed().as_millis() as u64;
                let snapshot = session.snapshot();
                presenter.update_recording_progress(elapsed.min(limit_ms), limit_ms, snapshot.buffered_bytes);
                if elapsed >= limit_ms {
                    break StopRequest::Graceful;
                }
            }
            request = signals.recv() => break request,
            changed = state.changed() => {
                let ended = changed.is_err() || state.borrow().status == SessionStatus::Idle;
                if ended {
                    presenter.warn("Recording ended early");
                    return finish_unexpected(session.snapshot(), sink, presenter).await;
                }
            }
        }
    };

    if request == StopRequest::Abort {
        presenter.spinner_fail("Recording discarded");
        return ExitCode::from(EXIT_ERROR);
    }

    presenter.update_spinner("Finalizing...");
    let stopped = tokio::select! {
        result = session.stop() => result,
        request = signals.recv() => {
            tracing::debug!(?request, "stop interrupted");
            presenter.spinner_fail("Recording discarded");
            return ExitCode::from(EXIT_ERROR);
        }
    };

    match stopped {
        Ok(artifact) => save(&artifact, sink, presenter).await,
        Err(CaptureError::NotRecording) => {
            // The recorder finished on its own first; its artifact is still on the way.
            tracing::debug!("recorder ended before the stop request");
            let settled = tokio::select! {
                settled = state.wait_for(|s| s.status == SessionStatus::Idle) => settled.is_ok(),
                request = signals.recv() => {
                    tracing::debug!(?request, "stop interrupted");
                    presenter.spinner_fail("Recording discarded");
                    return ExitCode::from(EXIT_ERROR);
                }
            };
            if !settled {
                tracing::warn!("session closed while finalizing");
            }
            finish_unexpected(session.snapshot(), sink, presenter).await
        }
        Err(e) => {
            presenter.spinner_fail(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Outcome of a recording that finalized without our stop (device lost,
/// encoder exit, or the encoder beat the stop request)
async fn finish_unexpected(
    snapshot: SessionSnapshot,
    sink: &dyn ArtifactSink,
    presenter: &mut Presenter,
) -> ExitCode {
    if let Some(e) = snapshot.last_error {
        presenter.spinner_fail(&e.to_string());
        return ExitCode::from(EXIT_ERROR);
    }
    match snapshot.artifact {
        Some(artifact) => save(&artifact, sink, presenter).await,
        None => {
            presenter.spinner_fail(&CaptureError::NotRecording.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

async fn save(artifact: &Artifact, sink: &dyn ArtifactSink, presenter: &mut Presenter) -> ExitCode {
    match sink.deliver(artifact).await {
        Ok(receipt) => {
            presenter.spinner_success(&format!("Recording saved ({})", human_size(receipt.bytes)));
            presenter.output(&receipt.location);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            presenter.spinner_fail(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Print capability and permission diagnostics
pub async fn run_check(options: RecordOptions) -> ExitCode {
    let presenter = Presenter::new();
    let capability = FfmpegCapability::detect().await;
    let format = options.capture.format;

    let capability_ok = match check_capability(&capability, format) {
        Ok(()) => {
            presenter.check_line(true, "recorder", &format!("{} can record {}", capability.runtime_name(), format.mime_type()));
            true
        }
        Err(e) => {
            let missing = capability.missing(format);
            let detail = if missing.is_empty() {
                e.to_string()
            } else {
                format!("{} (missing: {})", e, missing.join(", "))
            };
            presenter.check_line(false, "recorder", &detail);
            false
        }
    };

    let report = check_permissions(&DeviceNodePermissions::new()).await;
    for (label, state, device) in [
        ("camera", report.camera, &options.devices.video_device),
        ("microphone", report.microphone, &options.devices.audio_device),
    ] {
        presenter.check_line(
            state != PermissionState::Denied,
            label,
            &format!("{} ({})", state, device),
        );
    }

    if capability_ok && report.overall() != PermissionState::Denied {
        ExitCode::from(EXIT_SUCCESS)
    } else {
        ExitCode::from(EXIT_ERROR)
    }
}
