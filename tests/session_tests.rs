//! Recording session integration tests against scripted ports

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::{mpsc, watch, Notify};

use camcorder::application::ports::{
    DeviceError, FramePlayer, MediaDevices, MediaRecorder, MediaRecorderFactory, MetadataProbe,
    ObjectUrlStore, PermissionQuery, PermissionQueryError, Playback, ProbeError,
    RecorderCapability, RecorderError, RecorderEventSink, RecorderState, UrlError,
};
use camcorder::application::{CaptureServices, RecordingSession, SessionSnapshot, ViewState};
use camcorder::cli::app::{record_with, RecordOptions};
use camcorder::cli::{Presenter, StopRequest, StopSignals};
use camcorder::domain::artifact::{Blob, ContainerFormat, MediaMetadata, ObjectUrl};
use camcorder::domain::config::{
    AcquisitionMode, AudioSource, CaptureConfig, DeviceSelection, PipelineMode,
};
use camcorder::domain::error::CaptureError;
use camcorder::domain::media::{
    frame_channel, DeviceKind, MediaConstraints, MediaStream, MediaTrack, PermissionState,
    TrackKind, TrackSettings, TrackSource, VideoFrame,
};
use camcorder::domain::recording::{Duration as ClipDuration, SessionStatus};
use camcorder::infrastructure::{DirectorySink, MemoryUrlStore};

const WAIT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Scripted ports
// ---------------------------------------------------------------------------

struct MockCapability {
    available: bool,
    supported: Vec<ContainerFormat>,
}

impl RecorderCapability for MockCapability {
    fn is_available(&self) -> bool {
        self.available
    }

    fn is_type_supported(&self, format: ContainerFormat) -> bool {
        self.supported.contains(&format)
    }

    fn runtime_name(&self) -> String {
        "mock".to_string()
    }
}

struct MockPermissions {
    microphone: PermissionState,
    camera: PermissionState,
    queries: AtomicUsize,
}

#[async_trait]
impl PermissionQuery for MockPermissions {
    async fn query(&self, device: DeviceKind) -> Result<PermissionState, PermissionQueryError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(match device {
            DeviceKind::Microphone => self.microphone,
            DeviceKind::Camera => self.camera,
        })
    }
}

#[derive(Default)]
struct MockDevices {
    requests: Mutex<Vec<MediaConstraints>>,
    tracks: Mutex<Vec<MediaTrack>>,
    released: Arc<AtomicUsize>,
    fail_video: Mutex<Option<DeviceError>>,
    gate: Option<Arc<Notify>>,
}

impl MockDevices {
    fn acquired(&self) -> usize {
        self.tracks.lock().unwrap().len()
    }

    fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn track(&self, kind: TrackKind, settings: TrackSettings) -> MediaTrack {
        let released = Arc::clone(&self.released);
        let track = MediaTrack::with_release(
            kind,
            format!("mock {}", kind),
            settings,
            TrackSource::Device {
                format: "mock".into(),
                input: kind.as_str().into(),
            },
            move || {
                released.fetch_add(1, Ordering::SeqCst);
            },
        );
        self.tracks.lock().unwrap().push(track.clone());
        track
    }
}

#[async_trait]
impl MediaDevices for MockDevices {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<MediaStream, DeviceError> {
        self.requests.lock().unwrap().push(*constraints);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let mut tracks = Vec::new();
        if let Some(video) = constraints.video {
            if let Some(err) = self.fail_video.lock().unwrap().clone() {
                return Err(err);
            }
            tracks.push(self.track(
                TrackKind::Video,
                TrackSettings::video(video.width, video.height, video.frame_rate),
            ));
        }
        if constraints.audio {
            tracks.push(self.track(TrackKind::Audio, TrackSettings::audio(48_000, 2)));
        }
        Ok(MediaStream::new(tracks))
    }
}

#[derive(Default)]
struct MockFrames {
    feeds: Mutex<Vec<watch::Sender<Option<VideoFrame>>>>,
    stopped: Arc<AtomicUsize>,
}

#[async_trait]
impl FramePlayer for MockFrames {
    async fn play(&self, track: &MediaTrack) -> Result<Playback, DeviceError> {
        let (width, height) = track.settings().dimensions().unwrap_or((2, 2));
        let (tx, feed) = frame_channel();
        tx.send_replace(VideoFrame::solid(width, height, [200, 10, 10, 255]));
        self.feeds.lock().unwrap().push(tx);

        let stopped = Arc::clone(&self.stopped);
        Ok(Playback::new(feed, move || {
            stopped.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

/// What a test can see of one created recorder
#[derive(Clone)]
struct RecorderHandle {
    sink: RecorderEventSink,
    stream: MediaStream,
    stops: Arc<AtomicUsize>,
}

#[derive(Default)]
struct MockRecorderFactory {
    created: Mutex<Vec<RecorderHandle>>,
    /// Emit `Stopped` as soon as `stop` is called
    complete_on_stop: Arc<AtomicBool>,
    fail_start: AtomicBool,
}

impl MockRecorderFactory {
    fn count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    fn latest(&self) -> RecorderHandle {
        self.created
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no recorder was created")
    }
}

struct MockRecorder {
    sink: RecorderEventSink,
    state: RecorderState,
    stops: Arc<AtomicUsize>,
    complete_on_stop: Arc<AtomicBool>,
    fail_start: bool,
}

impl MediaRecorder for MockRecorder {
    fn start(&mut self) -> Result<(), RecorderError> {
        if self.fail_start {
            return Err(RecorderError::StartFailed("encoder missing".to_string()));
        }
        self.state = RecorderState::Recording;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecorderError> {
        if self.state != RecorderState::Recording {
            return Err(RecorderError::InvalidState {
                action: "stop",
                state: self.state,
            });
        }
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.state = RecorderState::Stopping;
        if self.complete_on_stop.load(Ordering::SeqCst) {
            self.sink.stopped();
        }
        Ok(())
    }

    fn state(&self) -> RecorderState {
        self.state
    }
}

impl MediaRecorderFactory for MockRecorderFactory {
    fn create(
        &self,
        stream: &MediaStream,
        _format: ContainerFormat,
        sink: RecorderEventSink,
    ) -> Result<Box<dyn MediaRecorder>, RecorderError> {
        let stops = Arc::new(AtomicUsize::new(0));
        self.created.lock().unwrap().push(RecorderHandle {
            sink: sink.clone(),
            stream: stream.clone(),
            stops: Arc::clone(&stops),
        });
        Ok(Box::new(MockRecorder {
            sink,
            state: RecorderState::Inactive,
            stops,
            complete_on_stop: Arc::clone(&self.complete_on_stop),
            fail_start: self.fail_start.load(Ordering::SeqCst),
        }))
    }
}

#[derive(Debug, Clone, Copy)]
enum ProbeBehavior {
    Duration(f64),
    Delayed(Duration, f64),
    Corrupt,
    Hang,
}

struct MockProbe {
    behavior: Mutex<ProbeBehavior>,
    calls: AtomicUsize,
}

impl MockProbe {
    fn set(&self, behavior: ProbeBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }
}

#[async_trait]
impl MetadataProbe for MockProbe {
    async fn load_metadata(&self, _blob: &Blob) -> Result<MediaMetadata, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = *self.behavior.lock().unwrap();
        match behavior {
            ProbeBehavior::Duration(duration) => Ok(MediaMetadata { duration }),
            ProbeBehavior::Delayed(delay, duration) => {
                tokio::time::sleep(delay).await;
                Ok(MediaMetadata { duration })
            }
            ProbeBehavior::Corrupt => Err(ProbeError::Decode("EBML header parsing failed".into())),
            ProbeBehavior::Hang => std::future::pending().await,
        }
    }
}

/// In-memory URLs whose minting can be held open
#[derive(Default)]
struct MockUrls {
    store: MemoryUrlStore,
    hold: Mutex<Option<Arc<Notify>>>,
    requested: AtomicUsize,
    minted: AtomicUsize,
}

impl MockUrls {
    fn hold_with(&self, gate: Arc<Notify>) {
        *self.hold.lock().unwrap() = Some(gate);
    }
}

#[async_trait]
impl ObjectUrlStore for MockUrls {
    async fn create(&self, blob: &Blob) -> Result<ObjectUrl, UrlError> {
        self.requested.fetch_add(1, Ordering::SeqCst);
        let gate = self.hold.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let url = self.store.create(blob).await?;
        self.minted.fetch_add(1, Ordering::SeqCst);
        Ok(url)
    }

    fn revoke(&self, url: &ObjectUrl) -> bool {
        self.store.revoke(url)
    }

    fn resolve(&self, url: &ObjectUrl) -> Option<Blob> {
        self.store.resolve(url)
    }

    fn live_count(&self) -> usize {
        self.store.live_count()
    }
}

struct Rig {
    capability: Arc<MockCapability>,
    permissions: Arc<MockPermissions>,
    devices: Arc<MockDevices>,
    frames: Arc<MockFrames>,
    recorders: Arc<MockRecorderFactory>,
    urls: Arc<MockUrls>,
    probe: Arc<MockProbe>,
}

impl Rig {
    fn new() -> Self {
        let recorders = MockRecorderFactory::default();
        recorders.complete_on_stop.store(true, Ordering::SeqCst);
        Self {
            capability: Arc::new(MockCapability {
                available: true,
                supported: ContainerFormat::ALL.to_vec(),
            }),
            permissions: Arc::new(MockPermissions {
                microphone: PermissionState::Granted,
                camera: PermissionState::Granted,
                queries: AtomicUsize::new(0),
            }),
            devices: Arc::new(MockDevices::default()),
            frames: Arc::new(MockFrames::default()),
            recorders: Arc::new(recorders),
            urls: Arc::new(MockUrls::default()),
            probe: Arc::new(MockProbe {
                behavior: Mutex::new(ProbeBehavior::Duration(1.5)),
                calls: AtomicUsize::new(0),
            }),
        }
    }

    fn with_capability(mut self, capability: MockCapability) -> Self {
        self.capability = Arc::new(capability);
        self
    }

    fn with_permissions(mut self, microphone: PermissionState, camera: PermissionState) -> Self {
        self.permissions = Arc::new(MockPermissions {
            microphone,
            camera,
            queries: AtomicUsize::new(0),
        });
        self
    }

    fn with_devices(mut self, devices: MockDevices) -> Self {
        self.devices = Arc::new(devices);
        self
    }

    fn services(&self) -> CaptureServices {
        CaptureServices {
            capability: self.capability.clone(),
            permissions: self.permissions.clone(),
            devices: self.devices.clone(),
            frames: self.frames.clone(),
            recorders: self.recorders.clone(),
            urls: self.urls.clone(),
            probe: self.probe.clone(),
        }
    }

    fn spawn(&self, config: CaptureConfig) -> RecordingSession {
        RecordingSession::spawn(self.services(), config)
    }
}

async fn wait_until(session: &RecordingSession, done: impl FnMut(&SessionSnapshot) -> bool) {
    let mut state = session.subscribe();
    tokio::time::timeout(WAIT, state.wait_for(done))
        .await
        .expect("session did not reach the expected state")
        .expect("session closed");
}

async fn eventually(mut done: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never became true");
}

fn composited() -> CaptureConfig {
    CaptureConfig {
        pipeline: PipelineMode::Composited,
        refresh_rate: 120,
        ..CaptureConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Start-up gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unsupported_runtime_fails_before_acquisition() {
    let rig = Rig::new().with_capability(MockCapability {
        available: true,
        supported: vec![ContainerFormat::Mp4],
    });
    let session = rig.spawn(CaptureConfig::default());

    let err = session.start().await.unwrap_err();

    assert!(matches!(err, CaptureError::UnsupportedRuntime { .. }));
    assert!(err.to_string().contains("mp4"), "should suggest mp4: {}", err);
    assert_eq!(rig.devices.request_count(), 0);
    assert_eq!(rig.permissions.queries.load(Ordering::SeqCst), 0);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Idle);
    assert_eq!(snapshot.last_error, Some(err));
    assert_eq!(snapshot.view(), ViewState::Error);
}

#[tokio::test]
async fn missing_recording_facility_is_unsupported() {
    let rig = Rig::new().with_capability(MockCapability {
        available: false,
        supported: Vec::new(),
    });
    let session = rig.spawn(CaptureConfig::default());

    assert!(matches!(
        session.start().await,
        Err(CaptureError::UnsupportedRuntime { .. })
    ));
    assert_eq!(rig.devices.request_count(), 0);
}

#[tokio::test]
async fn denied_camera_fails_before_acquisition() {
    let rig = Rig::new().with_permissions(PermissionState::Granted, PermissionState::Denied);
    let session = rig.spawn(CaptureConfig::default());

    let err = session.start().await.unwrap_err();

    assert_eq!(err, CaptureError::PermissionDenied { device: DeviceKind::Camera });
    assert_eq!(rig.devices.request_count(), 0);
    assert_eq!(session.status(), SessionStatus::Idle);
    assert_eq!(rig.recorders.count(), 0);
}

#[tokio::test]
async fn denied_camera_in_separate_audio_mode_acquires_nothing() {
    let rig = Rig::new().with_permissions(PermissionState::Granted, PermissionState::Denied);
    let session = rig.spawn(CaptureConfig {
        pipeline: PipelineMode::Composited,
        audio_source: AudioSource::Separate,
        ..CaptureConfig::default()
    });

    assert!(matches!(
        session.start().await,
        Err(CaptureError::PermissionDenied { .. })
    ));
    assert_eq!(rig.devices.acquired(), 0);
}

#[tokio::test]
async fn unknown_permissions_proceed_to_acquisition() {
    let rig = Rig::new().with_permissions(PermissionState::Unknown, PermissionState::Unknown);
    let session = rig.spawn(CaptureConfig::default());

    session.start().await.unwrap();
    assert_eq!(session.status(), SessionStatus::Recording);
    assert_eq!(rig.devices.request_count(), 1);
}

#[tokio::test]
async fn failed_video_after_separate_audio_releases_the_audio() {
    let devices = MockDevices {
        fail_video: Mutex::new(Some(DeviceError::Busy("/dev/video0".into()))),
        ..MockDevices::default()
    };
    let rig = Rig::new().with_devices(devices);
    let session = rig.spawn(CaptureConfig {
        audio_source: AudioSource::Separate,
        ..CaptureConfig::default()
    });

    let err = session.start().await.unwrap_err();

    assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
    assert_eq!(rig.devices.acquired(), 1);
    assert_eq!(rig.devices.released(), 1);
    assert_eq!(session.status(), SessionStatus::Idle);
    assert!(session.snapshot().last_error.is_some());
}

#[tokio::test]
async fn recorder_start_failure_releases_devices() {
    let rig = Rig::new();
    rig.recorders.fail_start.store(true, Ordering::SeqCst);
    let session = rig.spawn(CaptureConfig::default());

    let err = session.start().await.unwrap_err();

    assert!(matches!(err, CaptureError::RecorderFailed(_)));
    assert_eq!(rig.devices.released(), rig.devices.acquired());
    assert_eq!(session.status(), SessionStatus::Idle);
}

// ---------------------------------------------------------------------------
// Recording and finalization
// ---------------------------------------------------------------------------

#[tokio::test]
async fn two_chunks_become_one_artifact() {
    let rig = Rig::new();
    let session = rig.spawn(CaptureConfig::default());

    session.start().await.unwrap();
    let recorder = rig.recorders.latest();
    recorder.sink.data(vec![1; 1000]);
    recorder.sink.data(vec![2; 500]);

    let artifact = session.stop().await.unwrap();

    assert_eq!(artifact.size(), 1500);
    assert_eq!(artifact.blob.mime_type(), "video/webm");
    assert_eq!(artifact.download_filename(), "recording.webm");
    assert!(rig.urls.resolve(&artifact.url).is_some());

    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Idle);
    assert_eq!(snapshot.artifact, Some(artifact));
    assert_eq!(snapshot.last_error, None);
    assert_eq!(snapshot.view(), ViewState::Ready);
    assert_eq!(rig.probe.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fragments_concatenate_in_arrival_order() {
    let rig = Rig::new();
    let session = rig.spawn(CaptureConfig::default());
    session.start().await.unwrap();

    let sink = rig.recorders.latest().sink;
    let fragments: Vec<Vec<u8>> = vec![vec![1, 2], vec![], vec![3], vec![4, 5, 6], vec![7]];
    for fragment in &fragments {
        sink.data(fragment.clone());
    }
    wait_until(&session, |s| s.buffered_bytes == 7).await;
    assert_eq!(session.snapshot().chunk_count, 4);

    let artifact = session.stop().await.unwrap();
    assert_eq!(artifact.blob.bytes(), &[1, 2, 3, 4, 5, 6, 7]);
}

#[tokio::test]
async fn chunks_flushed_after_stop_are_kept() {
    let rig = Rig::new();
    rig.recorders.complete_on_stop.store(false, Ordering::SeqCst);
    let session = rig.spawn(CaptureConfig::default());
    session.start().await.unwrap();
    let recorder = rig.recorders.latest();
    recorder.sink.data(b"head".to_vec());

    let stopping = {
        let session = session.clone();
        tokio::spawn(async move { session.stop().await })
    };
    wait_until(&session, |s| s.status == SessionStatus::Finalizing).await;
    assert_eq!(session.snapshot().view(), ViewState::Recording);

    recorder.sink.data(b"tail".to_vec());
    recorder.sink.stopped();

    let artifact = stopping.await.unwrap().unwrap();
    assert_eq!(artifact.blob.bytes(), b"headtail");
}

#[tokio::test]
async fn every_track_is_stopped_once_after_finalize() {
    let rig = Rig::new();
    let session = rig.spawn(CaptureConfig::default());
    session.start().await.unwrap();
    assert_eq!(rig.devices.released(), 0);

    rig.recorders.latest().sink.data(vec![9; 16]);
    session.stop().await.unwrap();

    assert_eq!(rig.devices.acquired(), 2);
    assert_eq!(rig.devices.released(), 2);
    assert!(rig.devices.tracks.lock().unwrap().iter().all(|t| !t.is_live()));
}

#[tokio::test]
async fn stop_twice_is_a_no_op() {
    let rig = Rig::new();
    let session = rig.spawn(CaptureConfig::default());
    session.start().await.unwrap();
    rig.recorders.latest().sink.data(vec![1; 10]);

    let artifact = session.stop().await.unwrap();
    let before = session.snapshot();

    assert_eq!(session.stop().await.unwrap_err(), CaptureError::NotRecording);
    assert_eq!(session.snapshot(), before);
    assert_eq!(before.artifact, Some(artifact));
    assert_eq!(before.last_error, None);
    assert_eq!(rig.recorders.latest().stops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stop_while_idle_is_benign() {
    let rig = Rig::new();
    let session = rig.spawn(CaptureConfig::default());

    assert_eq!(session.stop().await.unwrap_err(), CaptureError::NotRecording);
    assert_eq!(session.snapshot().last_error, None);
    assert_eq!(session.snapshot().view(), ViewState::Idle);
}

#[tokio::test]
async fn start_while_recording_leaves_session_untouched() {
    let rig = Rig::new();
    let session = rig.spawn(CaptureConfig::default());
    session.start().await.unwrap();
    rig.recorders.latest().sink.data(vec![5; 10]);
    wait_until(&session, |s| s.buffered_bytes == 10).await;
    let before = session.snapshot();

    assert_eq!(session.start().await.unwrap_err(), CaptureError::AlreadyRecording);

    assert_eq!(session.snapshot(), before);
    assert_eq!(before.last_error, None);
    assert_eq!(rig.devices.request_count(), 1);
    assert_eq!(rig.recorders.count(), 1);
    assert_eq!(rig.devices.released(), 0);
}

#[tokio::test]
async fn recorder_that_stops_on_its_own_is_finalized() {
    let rig = Rig::new();
    let session = rig.spawn(CaptureConfig::default());
    session.start().await.unwrap();

    let recorder = rig.recorders.latest();
    recorder.sink.data(vec![3; 64]);
    recorder.sink.error("encoder exited");
    recorder.sink.stopped();

    wait_until(&session, |s| s.status == SessionStatus::Idle && s.artifact.is_some()).await;
    assert_eq!(session.snapshot().artifact.map(|a| a.size()), Some(64));
    assert_eq!(rig.devices.released(), 2);
}

#[tokio::test]
async fn next_recording_revokes_previous_artifact_url() {
    let rig = Rig::new();
    let session = rig.spawn(CaptureConfig::default());

    session.start().await.unwrap();
    rig.recorders.latest().sink.data(vec![1; 8]);
    let first = session.stop().await.unwrap();
    assert_eq!(rig.urls.live_count(), 1);

    session.start().await.unwrap();
    assert!(rig.urls.resolve(&first.url).is_none());
    assert_eq!(rig.urls.live_count(), 0);
    assert_eq!(session.snapshot().artifact, None);

    rig.recorders.latest().sink.data(vec![2; 4]);
    let second = session.stop().await.unwrap();
    assert_ne!(first.url, second.url);
    assert_eq!(rig.urls.live_count(), 1);
    assert_eq!(session.snapshot().generation, 2);
}

#[tokio::test]
async fn events_from_an_earlier_recorder_are_ignored() {
    let rig = Rig::new();
    let session = rig.spawn(CaptureConfig::default());

    session.start().await.unwrap();
    let old = rig.recorders.latest();
    old.sink.data(vec![1; 4]);
    session.stop().await.unwrap();

    session.start().await.unwrap();
    let current = rig.recorders.latest();
    old.sink.data(vec![0xEE; 100]);
    old.sink.stopped();
    current.sink.data(vec![2; 3]);

    let artifact = session.stop().await.unwrap();
    assert_eq!(artifact.blob.bytes(), &[2, 2, 2]);
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn zero_length_recording_is_discarded() {
    let rig = Rig::new();
    rig.probe.set(ProbeBehavior::Duration(0.0));
    let session = rig.spawn(CaptureConfig::default());
    session.start().await.unwrap();
    rig.recorders.latest().sink.data(vec![1; 32]);

    let err = session.stop().await.unwrap_err();

    assert_eq!(err, CaptureError::ZeroLengthRecording);
    assert_eq!(err.to_string(), "zero-length recording");
    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Idle);
    assert_eq!(snapshot.artifact, None);
    assert_eq!(snapshot.last_error, Some(CaptureError::ZeroLengthRecording));
    assert_eq!(rig.urls.live_count(), 0);
    assert_eq!(rig.devices.released(), 2);
}

#[tokio::test]
async fn corrupt_recording_is_discarded() {
    let rig = Rig::new();
    rig.probe.set(ProbeBehavior::Corrupt);
    let session = rig.spawn(CaptureConfig::default());
    session.start().await.unwrap();

    assert_eq!(session.stop().await.unwrap_err(), CaptureError::CorruptRecording);
    assert_eq!(rig.urls.live_count(), 0);
    assert_eq!(session.snapshot().view(), ViewState::Error);
}

#[tokio::test(start_paused = true)]
async fn slow_metadata_times_out_after_five_seconds() {
    let rig = Rig::new();
    rig.probe.set(ProbeBehavior::Hang);
    let session = rig.spawn(CaptureConfig::default());
    session.start().await.unwrap();
    rig.recorders.latest().sink.data(vec![1; 32]);

    let began = tokio::time::Instant::now();
    let err = session.stop().await.unwrap_err();

    assert_eq!(err, CaptureError::MetadataTimeout);
    assert!(began.elapsed() >= Duration::from_secs(5));
    assert_eq!(session.snapshot().artifact, None);
    assert_eq!(rig.urls.live_count(), 0);
}

#[tokio::test]
async fn session_can_record_again_after_validation_failure() {
    let rig = Rig::new();
    rig.probe.set(ProbeBehavior::Duration(0.0));
    let session = rig.spawn(CaptureConfig::default());
    session.start().await.unwrap();
    session.stop().await.unwrap_err();

    rig.probe.set(ProbeBehavior::Duration(2.0));
    session.start().await.unwrap();
    assert_eq!(session.snapshot().last_error, None);
    rig.recorders.latest().sink.data(vec![4; 4]);
    assert!(session.stop().await.is_ok());
    assert_eq!(session.snapshot().view(), ViewState::Ready);
}

// ---------------------------------------------------------------------------
// Cancellation and teardown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stop_during_start_up_cancels_and_releases_late_devices() {
    let gate = Arc::new(Notify::new());
    let rig = Rig::new().with_devices(MockDevices {
        gate: Some(Arc::clone(&gate)),
        ..MockDevices::default()
    });
    let session = rig.spawn(CaptureConfig::default());

    let starting = {
        let session = session.clone();
        tokio::spawn(async move { session.start().await })
    };
    wait_until(&session, |s| s.status == SessionStatus::Initializing).await;

    assert_eq!(session.stop().await.unwrap_err(), CaptureError::NotRecording);
    assert_eq!(starting.await.unwrap().unwrap_err(), CaptureError::Cancelled);
    assert_eq!(session.status(), SessionStatus::Idle);

    gate.notify_one();
    eventually(|| rig.devices.acquired() == 2 && rig.devices.released() == 2).await;
    assert_eq!(rig.recorders.count(), 0);
    assert_eq!(session.status(), SessionStatus::Idle);
}

#[tokio::test]
async fn start_during_start_up_is_busy() {
    let gate = Arc::new(Notify::new());
    let rig = Rig::new().with_devices(MockDevices {
        gate: Some(Arc::clone(&gate)),
        ..MockDevices::default()
    });
    let session = rig.spawn(CaptureConfig::default());

    let starting = {
        let session = session.clone();
        tokio::spawn(async move { session.start().await })
    };
    wait_until(&session, |s| s.status == SessionStatus::Initializing).await;

    assert_eq!(
        session.start().await.unwrap_err(),
        CaptureError::Busy(SessionStatus::Initializing)
    );
    gate.notify_one();
    starting.await.unwrap().unwrap();
    assert_eq!(rig.devices.request_count(), 1);
}

#[tokio::test]
async fn teardown_while_recording_signals_recorder_and_releases_everything() {
    let rig = Rig::new();
    rig.recorders.complete_on_stop.store(false, Ordering::SeqCst);
    let session = rig.spawn(composited());
    session.start().await.unwrap();
    let recorder = rig.recorders.latest();
    recorder.sink.data(vec![1; 10]);

    session.teardown().await;

    assert_eq!(recorder.stops.load(Ordering::SeqCst), 1);
    assert_eq!(rig.devices.released(), rig.devices.acquired());
    assert_eq!(rig.frames.stopped.load(Ordering::SeqCst), 1);
    assert!(recorder.stream.tracks().iter().all(|t| !t.is_live()));
    assert_eq!(rig.urls.live_count(), 0);
    assert_eq!(session.status(), SessionStatus::Idle);
    assert_eq!(session.start().await.unwrap_err(), CaptureError::SessionClosed);
    assert!(session.is_closed());
}

#[tokio::test]
async fn teardown_releases_the_ready_artifact() {
    let rig = Rig::new();
    let session = rig.spawn(CaptureConfig::default());
    session.start().await.unwrap();
    rig.recorders.latest().sink.data(vec![1; 10]);
    session.stop().await.unwrap();
    assert_eq!(rig.urls.live_count(), 1);

    session.teardown().await;
    assert_eq!(rig.urls.live_count(), 0);
    assert_eq!(session.snapshot().artifact, None);
}

#[tokio::test]
async fn teardown_during_validation_cancels_stop_and_revokes_the_url() {
    let rig = Rig::new();
    rig.probe.set(ProbeBehavior::Hang);
    let session = rig.spawn(CaptureConfig::default());
    session.start().await.unwrap();
    rig.recorders.latest().sink.data(vec![1; 64]);

    let stopping = {
        let session = session.clone();
        tokio::spawn(async move { session.stop().await })
    };
    eventually(|| rig.probe.calls.load(Ordering::SeqCst) == 1).await;
    assert_eq!(session.status(), SessionStatus::Finalizing);
    assert_eq!(rig.urls.live_count(), 1);

    session.teardown().await;

    assert_eq!(stopping.await.unwrap().unwrap_err(), CaptureError::Cancelled);
    assert_eq!(rig.urls.live_count(), 0);
    assert_eq!(session.snapshot().artifact, None);
    assert_eq!(session.status(), SessionStatus::Idle);
}

#[tokio::test]
async fn url_minted_after_teardown_is_revoked() {
    let gate = Arc::new(Notify::new());
    let rig = Rig::new();
    rig.urls.hold_with(Arc::clone(&gate));
    let session = rig.spawn(CaptureConfig::default());
    session.start().await.unwrap();
    rig.recorders.latest().sink.data(vec![1; 64]);

    let stopping = {
        let session = session.clone();
        tokio::spawn(async move { session.stop().await })
    };
    eventually(|| rig.urls.requested.load(Ordering::SeqCst) == 1).await;

    session.teardown().await;
    assert_eq!(stopping.await.unwrap().unwrap_err(), CaptureError::Cancelled);

    gate.notify_one();
    eventually(|| rig.urls.minted.load(Ordering::SeqCst) == 1 && rig.urls.live_count() == 0).await;
    assert_eq!(rig.probe.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dropping_every_handle_tears_down() {
    let rig = Rig::new();
    let session = rig.spawn(CaptureConfig::default());
    session.start().await.unwrap();
    drop(session);

    eventually(|| rig.devices.released() == 2).await;
    assert_eq!(rig.recorders.latest().stops.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// Pipeline variants and acquisition modes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn composited_pipeline_records_the_surface_with_raw_audio() {
    let rig = Rig::new();
    let session = rig.spawn(composited());
    session.start().await.unwrap();

    let recorder = rig.recorders.latest();
    let video: Vec<_> = recorder.stream.video_tracks().cloned().collect();
    let audio: Vec<_> = recorder.stream.audio_tracks().cloned().collect();
    assert_eq!(video.len(), 1);
    assert_eq!(audio.len(), 1);
    assert!(matches!(video[0].source(), TrackSource::Surface(_)));
    assert_eq!(video[0].settings().dimensions(), Some((640, 480)));
    assert!(matches!(audio[0].source(), TrackSource::Device { .. }));

    if let TrackSource::Surface(feed) = video[0].source() {
        let mut feed = feed.clone();
        tokio::time::timeout(WAIT, feed.wait_for(|frame| frame.is_some()))
            .await
            .expect("compositor never painted")
            .unwrap();
    }

    recorder.sink.data(vec![8; 8]);
    session.stop().await.unwrap();

    assert!(!video[0].is_live(), "surface track must end with the render loop");
    assert_eq!(rig.frames.stopped.load(Ordering::SeqCst), 1);
    assert_eq!(rig.devices.released(), 2);
}

#[tokio::test]
async fn separate_audio_is_acquired_first_and_combined() {
    let rig = Rig::new();
    let session = rig.spawn(CaptureConfig {
        audio_source: AudioSource::Separate,
        ..CaptureConfig::default()
    });
    session.start().await.unwrap();

    let requests = rig.devices.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].audio && !requests[0].wants_video());
    assert!(!requests[1].audio && requests[1].wants_video());

    let stream = rig.recorders.latest().stream;
    assert!(stream.has_video() && stream.has_audio());

    session.stop().await.unwrap();
    assert_eq!(rig.devices.released(), 2);
}

#[tokio::test]
async fn eager_mode_acquires_before_start() {
    let rig = Rig::new();
    let session = rig.spawn(CaptureConfig {
        acquisition: AcquisitionMode::Eager,
        ..CaptureConfig::default()
    });

    eventually(|| rig.devices.acquired() == 2).await;
    wait_until(&session, |s| s.status == SessionStatus::Idle).await;
    assert_eq!(rig.recorders.count(), 0);

    session.start().await.unwrap();
    assert_eq!(rig.devices.request_count(), 1);
    assert_eq!(rig.devices.released(), 0);

    rig.recorders.latest().sink.data(vec![1; 4]);
    session.stop().await.unwrap();
    assert_eq!(rig.devices.released(), 2);

    session.start().await.unwrap();
    assert_eq!(rig.devices.request_count(), 2);
}

#[tokio::test]
async fn eager_devices_are_released_on_teardown() {
    let rig = Rig::new();
    let session = rig.spawn(CaptureConfig {
        acquisition: AcquisitionMode::Eager,
        ..CaptureConfig::default()
    });

    eventually(|| rig.devices.acquired() == 2).await;
    wait_until(&session, |s| s.status == SessionStatus::Idle).await;
    session.teardown().await;

    assert_eq!(rig.devices.released(), 2);
    assert_eq!(rig.recorders.count(), 0);
}

// ---------------------------------------------------------------------------
// Command-line driver
// ---------------------------------------------------------------------------

fn record_options(output_dir: &TempDir) -> RecordOptions {
    RecordOptions {
        limit: ClipDuration::from_secs(60),
        capture: CaptureConfig::default(),
        devices: DeviceSelection::default(),
        output_dir: output_dir.path().to_path_buf(),
    }
}

#[tokio::test]
async fn ctrl_c_after_encoder_already_finished_still_saves() {
    let rig = Rig::new();
    rig.probe.set(ProbeBehavior::Delayed(Duration::from_millis(300), 1.0));
    let session = rig.spawn(CaptureConfig::default());
    let output = TempDir::new().unwrap();
    let sink = DirectorySink::new(output.path());
    let options = record_options(&output);
    let (requests, rx) = mpsc::channel(4);
    let mut signals = StopSignals::from_channel(rx);
    let mut presenter = Presenter::new();

    let drive = async {
        wait_until(&session, |s| s.status == SessionStatus::Recording).await;
        let recorder = rig.recorders.latest();
        recorder.sink.data(vec![7; 1000]);
        // The encoder saw the terminal's interrupt and exited on its own.
        recorder.sink.stopped();
        wait_until(&session, |s| s.status == SessionStatus::Finalizing).await;
        requests.send(StopRequest::Graceful).await.unwrap();
    };
    let (code, ()) = tokio::join!(
        record_with(&session, &sink, &options, &mut signals, &mut presenter),
        drive
    );

    assert_eq!(format!("{:?}", code), format!("{:?}", ExitCode::SUCCESS));
    let saved = std::fs::read(output.path().join("recording.webm")).unwrap();
    assert_eq!(saved, vec![7; 1000]);
    assert_eq!(rig.probe.calls.load(Ordering::SeqCst), 1);
    session.teardown().await;
}
