//! Recorder lifecycle integration tests
//!
//! A scripted media backend stands in for the platform: it confirms starts,
//! emits configured chunks on stop, counts live device handles, and exposes
//! the event sink so tests can inject late or faulty platform events.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use voice_chat::application::ports::{
    AudioSource, CaptureEncoder, CaptureEvent, CaptureSink, DeviceError, MediaBackend,
    RecorderError, RecorderEvent, RecorderObserver,
};
use voice_chat::application::Recorder;
use voice_chat::domain::recording::{
    AudioBlob, AudioConstraints, CaptureState, EncodingFormat, InputDevice, CANDIDATE_FORMATS,
};

const FALLBACK: EncodingFormat = EncodingFormat::Mp4;

struct Platform {
    supported: Mutex<Vec<EncodingFormat>>,
    devices: Mutex<Vec<InputDevice>>,
    chunks: Mutex<Vec<Vec<u8>>>,
    sinks: Mutex<Vec<CaptureSink>>,
    start_error: Mutex<Option<DeviceError>>,
    deny: AtomicBool,
    confirm_start: AtomicBool,
    live_handles: AtomicUsize,
    acquisitions: AtomicUsize,
}

impl Platform {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            supported: Mutex::new(vec![EncodingFormat::Webm]),
            devices: Mutex::new(vec![InputDevice::new("default", "Test Microphone")]),
            chunks: Mutex::new(Vec::new()),
            sinks: Mutex::new(Vec::new()),
            start_error: Mutex::new(None),
            deny: AtomicBool::new(false),
            confirm_start: AtomicBool::new(true),
            live_handles: AtomicUsize::new(0),
            acquisitions: AtomicUsize::new(0),
        })
    }

    fn supporting(formats: &[EncodingFormat]) -> Arc<Self> {
        let platform = Self::new();
        *platform.supported.lock().unwrap() = formats.to_vec();
        platform
    }

    fn set_chunks(&self, chunks: Vec<Vec<u8>>) {
        *self.chunks.lock().unwrap() = chunks;
    }

    fn live(&self) -> usize {
        self.live_handles.load(Ordering::SeqCst)
    }

    /// Sink handed to the most recent encoder
    fn sink(&self) -> CaptureSink {
        self.sinks.lock().unwrap().last().cloned().unwrap()
    }
}

struct MockBackend(Arc<Platform>);

struct MockSource {
    platform: Arc<Platform>,
    live: bool,
}

/// Mirrors a real encoder: one episode at a time
struct MockEncoder {
    platform: Arc<Platform>,
    sink: CaptureSink,
    running: bool,
}

#[async_trait]
impl MediaBackend for MockBackend {
    fn has_device_access(&self) -> bool {
        true
    }

    fn has_capture_encoder(&self) -> bool {
        true
    }

    fn is_format_supported(&self, format: EncodingFormat) -> bool {
        self.0.supported.lock().unwrap().contains(&format)
    }

    fn default_format(&self) -> EncodingFormat {
        FALLBACK
    }

    async fn acquire_input(
        &self,
        _constraints: &AudioConstraints,
    ) -> Result<Box<dyn AudioSource>, DeviceError> {
        if self.0.deny.load(Ordering::SeqCst) {
            return Err(DeviceError::PermissionDenied);
        }
        self.0.acquisitions.fetch_add(1, Ordering::SeqCst);
        self.0.live_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSource {
            platform: Arc::clone(&self.0),
            live: true,
        }))
    }

    async fn enumerate_inputs(&self) -> Result<Vec<InputDevice>, DeviceError> {
        Ok(self.0.devices.lock().unwrap().clone())
    }
}

impl AudioSource for MockSource {
    fn label(&self) -> &str {
        "Test Microphone"
    }

    fn open_encoder(
        &mut self,
        _format: EncodingFormat,
        sink: CaptureSink,
    ) -> Result<Box<dyn CaptureEncoder>, DeviceError> {
        self.platform.sinks.lock().unwrap().push(sink.clone());
        Ok(Box::new(MockEncoder {
            platform: Arc::clone(&self.platform),
            sink,
            running: false,
        }))
    }

    fn stop(&mut self) {
        if self.live {
            self.live = false;
            self.platform.live_handles.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

impl Drop for MockSource {
    fn drop(&mut self) {
        self.stop();
    }
}

impl CaptureEncoder for MockEncoder {
    fn start(&mut self, _timeslice: Duration) -> Result<(), DeviceError> {
        if self.running {
            return Err(DeviceError::InvalidState("capture already running".into()));
        }
        if let Some(e) = self.platform.start_error.lock().unwrap().clone() {
            return Err(e);
        }
        self.running = true;
        if self.platform.confirm_start.load(Ordering::SeqCst) {
            self.sink.emit(CaptureEvent::Started);
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        if !self.running {
            return Err(DeviceError::InvalidState("capture is not running".into()));
        }
        self.running = false;
        for chunk in self.platform.chunks.lock().unwrap().iter() {
            self.sink.emit(CaptureEvent::Chunk(chunk.clone()));
        }
        self.sink.emit(CaptureEvent::Stopped);
        Ok(())
    }
}

type Events = UnboundedReceiver<RecorderEvent>;

fn recorder(platform: &Arc<Platform>) -> (Recorder<MockBackend>, Events) {
    let recorder = Recorder::new(MockBackend(Arc::clone(platform))).unwrap();
    let (_, events) = recorder.subscribe_channel();
    (recorder, events)
}

async fn ready(platform: &Arc<Platform>) -> (Recorder<MockBackend>, Events) {
    let (recorder, events) = recorder(platform);
    assert!(recorder.init().await);
    (recorder, events)
}

/// Next non-tick event
async fn next(events: &mut Events) -> RecorderEvent {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for recorder event")
            .expect("event channel closed");
        if !matches!(event, RecorderEvent::Tick(_)) {
            return event;
        }
    }
}

/// Let the event task drain, then return everything except ticks
async fn settle(events: &mut Events) -> Vec<RecorderEvent> {
    tokio::time::sleep(Duration::from_millis(50)).await;
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        if !matches!(event, RecorderEvent::Tick(_)) {
            drained.push(event);
        }
    }
    drained
}

async fn start_confirmed(recorder: &Recorder<MockBackend>, events: &mut Events) {
    assert!(recorder.start());
    assert_eq!(next(events).await, RecorderEvent::Started);
    assert_eq!(recorder.state(), CaptureState::Recording);
}

async fn stop_and_collect(recorder: &Recorder<MockBackend>, events: &mut Events) -> AudioBlob {
    assert!(recorder.stop());
    loop {
        match next(events).await {
            RecorderEvent::Data(_) => continue,
            RecorderEvent::Stopped(blob) => return blob,
            other => panic!("unexpected event: {:?}", other),
        }
    }
}

#[tokio::test]
async fn start_twice_is_rejected() {
    let platform = Platform::new();
    let (recorder, mut events) = ready(&platform).await;

    start_confirmed(&recorder, &mut events).await;
    assert!(!recorder.start());
    assert_eq!(recorder.state(), CaptureState::Recording);
    assert!(settle(&mut events).await.is_empty());
}

#[tokio::test]
async fn start_twice_before_confirmation_is_rejected() {
    let platform = Platform::new();
    let (recorder, mut events) = ready(&platform).await;

    assert!(recorder.start());
    assert!(!recorder.start());
    assert_eq!(next(&mut events).await, RecorderEvent::Started);
    assert!(settle(&mut events).await.is_empty());
}

#[tokio::test]
async fn stop_when_not_recording_returns_false() {
    let platform = Platform::new();
    let (recorder, mut events) = recorder(&platform);

    assert!(!recorder.stop());
    assert!(recorder.init().await);
    assert!(!recorder.stop());
    assert!(settle(&mut events).await.is_empty());
}

#[tokio::test]
async fn episode_emits_start_data_stop_in_order() {
    let platform = Platform::new();
    platform.set_chunks(vec![vec![1, 2, 3], vec![4, 5]]);
    let (recorder, mut events) = ready(&platform).await;

    start_confirmed(&recorder, &mut events).await;
    assert!(recorder.stop());

    assert_eq!(next(&mut events).await, RecorderEvent::Data(vec![1, 2, 3]));
    assert_eq!(next(&mut events).await, RecorderEvent::Data(vec![4, 5]));
    let RecorderEvent::Stopped(blob) = next(&mut events).await else {
        panic!("expected Stopped");
    };
    assert_eq!(blob.data(), &[1, 2, 3, 4, 5]);
    assert_eq!(blob.format(), EncodingFormat::Webm);
    assert_eq!(recorder.state(), CaptureState::Idle);
    assert_eq!(recorder.pending_chunk_count(), 0);
    assert!(settle(&mut events).await.is_empty());
}

#[tokio::test]
async fn empty_chunks_are_not_buffered() {
    let platform = Platform::new();
    platform.set_chunks(vec![Vec::new(), vec![9, 9]]);
    let (recorder, mut events) = ready(&platform).await;

    start_confirmed(&recorder, &mut events).await;
    let blob = stop_and_collect(&recorder, &mut events).await;
    assert_eq!(blob.data(), &[9, 9]);
}

#[tokio::test]
async fn zero_chunk_episode_yields_empty_blob() {
    let platform = Platform::new();
    let (recorder, mut events) = ready(&platform).await;

    start_confirmed(&recorder, &mut events).await;
    let blob = stop_and_collect(&recorder, &mut events).await;
    assert_eq!(blob.size_bytes(), 0);
}

#[tokio::test]
async fn release_is_idempotent() {
    let platform = Platform::new();
    let (recorder, mut events) = ready(&platform).await;
    start_confirmed(&recorder, &mut events).await;

    recorder.release();
    recorder.release();

    assert_eq!(recorder.state(), CaptureState::Uninitialized);
    assert_eq!(platform.live(), 0);
    assert!(recorder.format().is_none());
    assert!(!recorder.start());
    assert!(settle(&mut events).await.is_empty());
}

#[tokio::test]
async fn negotiated_format_is_first_supported_candidate() {
    let platform = Platform::supporting(&[EncodingFormat::Wav, EncodingFormat::Ogg]);
    let (recorder, mut events) = ready(&platform).await;

    let negotiated = recorder.format().unwrap();
    assert_eq!(negotiated.format, EncodingFormat::Ogg);
    assert!(!negotiated.degraded);
    assert!(CANDIDATE_FORMATS.contains(&negotiated.format));

    platform.set_chunks(vec![vec![1]]);
    for _ in 0..2 {
        start_confirmed(&recorder, &mut events).await;
        let blob = stop_and_collect(&recorder, &mut events).await;
        assert_eq!(blob.format(), EncodingFormat::Ogg);
    }

    *platform.supported.lock().unwrap() = vec![EncodingFormat::WebmOpus];
    assert!(recorder.init().await);
    assert_eq!(recorder.format().unwrap().format, EncodingFormat::WebmOpus);
}

#[tokio::test]
async fn degraded_mode_still_records() {
    let platform = Platform::supporting(&[]);
    platform.set_chunks(vec![vec![7; 64]]);
    let (recorder, mut events) = ready(&platform).await;

    let negotiated = recorder.format().unwrap();
    assert_eq!(negotiated.format, FALLBACK);
    assert!(negotiated.degraded);

    start_confirmed(&recorder, &mut events).await;
    let blob = stop_and_collect(&recorder, &mut events).await;
    assert_eq!(blob.size_bytes(), 64);
    assert_eq!(blob.format(), FALLBACK);
}

#[tokio::test]
async fn reinit_leaves_one_live_handle() {
    let platform = Platform::new();
    let (recorder, _events) = ready(&platform).await;

    assert!(recorder.init().await);
    assert!(recorder.init().await);

    assert_eq!(platform.acquisitions.load(Ordering::SeqCst), 3);
    assert_eq!(platform.live(), 1);
    assert_eq!(recorder.state(), CaptureState::Idle);
}

#[tokio::test]
async fn init_while_recording_is_rejected() {
    let platform = Platform::new();
    let (recorder, mut events) = ready(&platform).await;
    start_confirmed(&recorder, &mut events).await;

    assert!(!recorder.init().await);
    assert_eq!(recorder.state(), CaptureState::Recording);
    assert_eq!(platform.acquisitions.load(Ordering::SeqCst), 1);
    assert_eq!(platform.live(), 1);
}

#[tokio::test]
async fn pending_start_counts_as_busy() {
    let platform = Platform::new();
    platform.confirm_start.store(false, Ordering::SeqCst);
    let (recorder, mut events) = ready(&platform).await;

    assert!(recorder.start());
    assert_eq!(recorder.state(), CaptureState::Idle);
    assert!(!recorder.init().await);
    assert!(!recorder.start());

    platform.sink().emit(CaptureEvent::Started);
    assert_eq!(next(&mut events).await, RecorderEvent::Started);
    assert_eq!(recorder.state(), CaptureState::Recording);
}

#[tokio::test]
async fn denied_permission_reports_acquisition_error() {
    let platform = Platform::new();
    platform.deny.store(true, Ordering::SeqCst);
    let (recorder, mut events) = recorder(&platform);

    assert!(!recorder.init().await);
    assert_eq!(
        next(&mut events).await,
        RecorderEvent::Error(RecorderError::Acquisition(DeviceError::PermissionDenied))
    );
    assert_eq!(recorder.state(), CaptureState::Uninitialized);
    assert_eq!(platform.live(), 0);
}

#[tokio::test]
async fn failed_start_request_reports_error_and_stays_idle() {
    let platform = Platform::new();
    *platform.start_error.lock().unwrap() = Some(DeviceError::Busy("in use".into()));
    let (recorder, mut events) = ready(&platform).await;

    assert!(!recorder.start());
    assert_eq!(
        next(&mut events).await,
        RecorderEvent::Error(RecorderError::Request(DeviceError::Busy("in use".into())))
    );
    assert_eq!(recorder.state(), CaptureState::Idle);

    *platform.start_error.lock().unwrap() = None;
    start_confirmed(&recorder, &mut events).await;
}

#[tokio::test]
async fn capture_failure_aborts_episode_and_discards_chunks() {
    let platform = Platform::new();
    let (recorder, mut events) = ready(&platform).await;
    start_confirmed(&recorder, &mut events).await;

    let sink = platform.sink();
    sink.emit(CaptureEvent::Chunk(vec![1, 1, 1]));
    assert_eq!(next(&mut events).await, RecorderEvent::Data(vec![1, 1, 1]));
    sink.emit(CaptureEvent::Failed("device unplugged".into()));

    assert_eq!(
        next(&mut events).await,
        RecorderEvent::Error(RecorderError::Capture("device unplugged".into()))
    );
    assert_eq!(recorder.state(), CaptureState::Idle);
    assert_eq!(recorder.pending_chunk_count(), 0);
    assert!(!recorder.stop());
    assert!(settle(&mut events).await.is_empty());

    platform.set_chunks(vec![vec![2, 2]]);
    start_confirmed(&recorder, &mut events).await;
    let blob = stop_and_collect(&recorder, &mut events).await;
    assert_eq!(blob.data(), &[2, 2]);
}

#[tokio::test]
async fn fault_outside_an_episode_leaves_recorder_usable() {
    let platform = Platform::new();
    platform.set_chunks(vec![vec![3]]);
    let (recorder, mut events) = ready(&platform).await;

    platform.sink().emit(CaptureEvent::Failed("glitch".into()));
    assert_eq!(
        next(&mut events).await,
        RecorderEvent::Error(RecorderError::Capture("glitch".into()))
    );

    start_confirmed(&recorder, &mut events).await;
    let blob = stop_and_collect(&recorder, &mut events).await;
    assert_eq!(blob.data(), &[3]);
}

#[tokio::test]
async fn events_after_release_are_dropped() {
    let platform = Platform::new();
    let (recorder, mut events) = ready(&platform).await;
    start_confirmed(&recorder, &mut events).await;
    let stale = platform.sink();

    recorder.release();
    stale.emit(CaptureEvent::Chunk(vec![5]));
    stale.emit(CaptureEvent::Stopped);

    assert!(settle(&mut events).await.is_empty());
    assert_eq!(recorder.state(), CaptureState::Uninitialized);
}

#[tokio::test]
async fn events_from_previous_session_are_dropped_after_reinit() {
    let platform = Platform::new();
    let (recorder, mut events) = ready(&platform).await;
    let stale = platform.sink();

    assert!(recorder.init().await);
    stale.emit(CaptureEvent::Started);

    assert!(settle(&mut events).await.is_empty());
    assert_eq!(recorder.state(), CaptureState::Idle);
}

#[tokio::test(start_paused = true)]
async fn ticks_every_second_while_recording() {
    let platform = Platform::new();
    let (recorder, mut events) = ready(&platform).await;

    assert!(recorder.start());
    let mut seconds = Vec::new();
    while seconds.len() < 4 {
        match events.recv().await.unwrap() {
            RecorderEvent::Tick(elapsed) => seconds.push(elapsed.whole_secs()),
            RecorderEvent::Started => {}
            other => panic!("unexpected event: {:?}", other),
        }
    }
    assert_eq!(seconds, vec![0, 1, 2, 3]);

    assert!(recorder.stop());
    loop {
        if let RecorderEvent::Stopped(_) = events.recv().await.unwrap() {
            break;
        }
    }

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn permission_probe_needs_labelled_device() {
    let platform = Platform::new();
    let backend = MockBackend(Arc::clone(&platform));
    assert!(Recorder::has_microphone_permission(&backend).await);

    platform.devices.lock().unwrap().clear();
    assert!(!Recorder::has_microphone_permission(&backend).await);
}

#[derive(Default)]
struct StopCounter {
    stops: AtomicUsize,
}

impl RecorderObserver for StopCounter {
    fn on_stop(&self, _blob: &AudioBlob) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn observers_can_unsubscribe() {
    let platform = Platform::new();
    let (recorder, mut events) = ready(&platform).await;

    let kept = Arc::new(StopCounter::default());
    let dropped = Arc::new(StopCounter::default());
    recorder.subscribe(kept.clone());
    let dropped_id = recorder.subscribe(dropped.clone());
    assert!(recorder.unsubscribe(dropped_id));

    start_confirmed(&recorder, &mut events).await;
    stop_and_collect(&recorder, &mut events).await;

    assert_eq!(kept.stops.load(Ordering::SeqCst), 1);
    assert_eq!(dropped.stops.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dropping_recorder_frees_device() {
    let platform = Platform::new();
    let (recorder, _events) = ready(&platform).await;
    assert_eq!(platform.live(), 1);

    drop(recorder);
    assert_eq!(platform.live(), 0);
}
