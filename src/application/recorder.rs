//! Recorder - owns one audio capture session at a time
//!
//! Public operations validate requests against the capture lifecycle and
//! forward them to the platform. Platform confirmations arrive as
//! `CaptureEvent`s on a per-session channel and are applied by a single
//! event task, which is also the only place observers are notified from
//! (apart from errors raised directly by `init`/`start`/`stop`).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError, Weak};
use std::time::Duration as StdDuration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::ports::{
    AudioSource, CaptureEncoder, CaptureEvent, CaptureSink, ChannelObserver, MediaBackend,
    ObserverId, RecorderError, RecorderEvent, RecorderObserver,
};
use crate::domain::recording::{
    AudioBlob, AudioConstraints, CaptureLifecycle, CaptureState, Elapsed, InputDevice,
    NegotiatedFormat,
};

/// Interval at which the encoder flushes captured audio into a chunk
pub const TIMESLICE: StdDuration = StdDuration::from_secs(1);

/// Interval of elapsed-time ticks while recording
pub const TICK_INTERVAL: StdDuration = StdDuration::from_secs(1);

/// Audio recorder with an explicit init/start/stop/release lifecycle.
///
/// Operations never fail loudly: they return `false` when a request is
/// rejected, and report platform problems through `RecorderObserver::on_error`.
pub struct Recorder<B: MediaBackend> {
    backend: Arc<B>,
    shared: Arc<Shared>,
}

struct Shared {
    session: StdMutex<Session>,
    observers: StdMutex<Vec<(ObserverId, Arc<dyn RecorderObserver>)>>,
    next_observer: AtomicU64,
}

#[derive(Default)]
struct Session {
    lifecycle: CaptureLifecycle,
    source: Option<Box<dyn AudioSource>>,
    encoder: Option<Box<dyn CaptureEncoder>>,
    format: Option<NegotiatedFormat>,
    pending_chunks: Vec<Vec<u8>>,
    timer: Option<JoinHandle<()>>,
    pump: Option<JoinHandle<()>>,
    /// Bumped on every teardown; events tagged with an older value are stale
    generation: u64,
}

impl Session {
    /// Free everything and return to UNINITIALIZED
    fn teardown(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.encoder = None;
        if let Some(mut source) = self.source.take() {
            debug!(device = source.label(), "Stopping audio input");
            source.stop();
        }
        self.pending_chunks.clear();
        self.format = None;
        self.lifecycle.release();
        self.generation += 1;
    }
}

impl<B: MediaBackend> Recorder<B> {
    /// Check whether the backend can record at all
    pub fn is_supported(backend: &B) -> bool {
        let device_access = backend.has_device_access();
        let capture_encoder = backend.has_capture_encoder();
        debug!(device_access, capture_encoder, "Recording support check");
        device_access && capture_encoder
    }

    /// Advisory permission probe.
    ///
    /// True when at least one input exposes a non-empty label. This must not
    /// be used to skip `init`, which performs the real access request.
    pub async fn has_microphone_permission(backend: &B) -> bool {
        match backend.enumerate_inputs().await {
            Ok(devices) if devices.is_empty() => {
                warn!("No audio input devices found");
                false
            }
            Ok(devices) => {
                let granted = devices.iter().any(InputDevice::has_label);
                debug!(devices = devices.len(), granted, "Microphone permission check");
                granted
            }
            Err(e) => {
                warn!(error = %e, "Failed to enumerate audio inputs");
                false
            }
        }
    }

    /// Create a recorder; fails if the backend cannot record
    pub fn new(backend: B) -> Result<Self, RecorderError> {
        Self::with_backend(Arc::new(backend))
    }

    /// Create a recorder over a shared backend
    pub fn with_backend(backend: Arc<B>) -> Result<Self, RecorderError> {
        if !Self::is_supported(&backend) {
            return Err(RecorderError::Unsupported);
        }
        Ok(Self {
            backend,
            shared: Arc::new(Shared::new()),
        })
    }

    /// Get the platform backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Register an observer
    pub fn subscribe(&self, observer: Arc<dyn RecorderObserver>) -> ObserverId {
        self.shared.subscribe(observer)
    }

    /// Register a channel observer and return its receiving end
    pub fn subscribe_channel(&self) -> (ObserverId, mpsc::UnboundedReceiver<RecorderEvent>) {
        let (observer, rx) = ChannelObserver::new();
        (self.subscribe(observer), rx)
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.shared.observers();
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }

    /// Get the current capture state
    pub fn state(&self) -> CaptureState {
        self.shared.session().lifecycle.state()
    }

    /// Check if currently recording
    pub fn is_recording(&self) -> bool {
        self.shared.session().lifecycle.is_recording()
    }

    /// Format negotiated by the last successful `init`
    pub fn format(&self) -> Option<NegotiatedFormat> {
        self.shared.session().format
    }

    /// Label of the held input device
    pub fn device_label(&self) -> Option<String> {
        self.shared
            .session()
            .source
            .as_ref()
            .map(|s| s.label().to_string())
    }

    /// Number of chunks buffered for the current episode
    pub fn pending_chunk_count(&self) -> usize {
        self.shared.session().pending_chunks.len()
    }

    /// Acquire the microphone and prepare the encoder.
    ///
    /// Any previously held device is released first. Rejected while a
    /// recording is in progress.
    pub async fn init(&self) -> bool {
        {
            let mut session = self.shared.session();
            if let Err(e) = session.lifecycle.check_init() {
                warn!("Cannot initialize recorder: {}", e);
                return false;
            }
            if session.source.is_some() {
                debug!("Releasing previously acquired input before re-initializing");
            }
            session.teardown();
        }

        let constraints = AudioConstraints::speech();
        debug!(?constraints, "Requesting audio input");
        let mut source = match self.backend.acquire_input(&constraints).await {
            Ok(source) => source,
            Err(e) => {
                error!(error = %e, "Error initializing recorder");
                self.shared
                    .emit(|o| o.on_error(&RecorderError::Acquisition(e.clone())));
                return false;
            }
        };

        let negotiated = NegotiatedFormat::negotiate(
            |format| self.backend.is_format_supported(format),
            self.backend.default_format(),
        );
        if negotiated.degraded {
            warn!(
                format = %negotiated.format,
                "None of the preferred formats are supported, using platform default"
            );
        } else {
            debug!(format = %negotiated.format, "Negotiated encoding format");
        }

        let (sink, events) = CaptureSink::channel();
        let encoder = match source.open_encoder(negotiated.format, sink) {
            Ok(encoder) => encoder,
            Err(e) => {
                source.stop();
                error!(error = %e, "Failed to create capture encoder");
                self.shared
                    .emit(|o| o.on_error(&RecorderError::Acquisition(e.clone())));
                return false;
            }
        };

        let mut session = self.shared.session();
        // Another init may have finished while we were waiting on the platform
        if let Err(e) = session.lifecycle.check_init() {
            drop(session);
            drop(encoder);
            source.stop();
            warn!("Discarding acquired input: {}", e);
            return false;
        }
        session.teardown();

        let generation = session.generation;
        let label = source.label().to_string();
        session.source = Some(source);
        session.encoder = Some(encoder);
        session.format = Some(negotiated);
        session.pump = Some(tokio::spawn(Shared::pump(
            Arc::downgrade(&self.shared),
            events,
            generation,
        )));
        if let Err(e) = session.lifecycle.acquired() {
            warn!("Unexpected lifecycle state after acquiring input: {}", e);
        }

        info!(device = %label, format = %negotiated, "Recorder initialized");
        true
    }

    /// Request capture to begin.
    ///
    /// Returns true once the platform accepted the request; the state
    /// becomes RECORDING when capture has actually started.
    pub fn start(&self) -> bool {
        let mut session = self.shared.session();
        if let Err(e) = session.lifecycle.request_start() {
            warn!("Cannot start recording: {}", e);
            return false;
        }

        let result = match session.encoder.as_mut() {
            Some(encoder) => encoder.start(TIMESLICE),
            None => {
                session.lifecycle.request_refused();
                warn!("Cannot start recording: no encoder");
                return false;
            }
        };

        match result {
            Ok(()) => {
                debug!("Start requested");
                true
            }
            Err(e) => {
                session.lifecycle.request_refused();
                drop(session);
                error!(error = %e, "Error starting recording");
                self.shared
                    .emit(|o| o.on_error(&RecorderError::Request(e.clone())));
                false
            }
        }
    }

    /// Request capture to finish.
    ///
    /// The assembled blob is delivered through `on_stop`.
    pub fn stop(&self) -> bool {
        let mut session = self.shared.session();
        if let Err(e) = session.lifecycle.request_stop() {
            warn!("Cannot stop recording: {}", e);
            return false;
        }

        let result = match session.encoder.as_mut() {
            Some(encoder) => encoder.stop(),
            None => {
                session.lifecycle.request_refused();
                warn!("Cannot stop recording: no encoder");
                return false;
            }
        };

        match result {
            Ok(()) => {
                debug!("Stop requested");
                true
            }
            Err(e) => {
                session.lifecycle.request_refused();
                drop(session);
                error!(error = %e, "Error stopping recording");
                self.shared
                    .emit(|o| o.on_error(&RecorderError::Request(e.clone())));
                false
            }
        }
    }

    /// Free the device and all capture state. Safe to call from any state.
    pub fn release(&self) {
        let mut session = self.shared.session();
        if session.source.is_some() {
            info!("Releasing audio input");
        }
        session.teardown();
    }
}

impl<B: MediaBackend> Drop for Recorder<B> {
    fn drop(&mut self) {
        self.release();
    }
}

impl Shared {
    fn new() -> Self {
        Self {
            session: StdMutex::new(Session::default()),
            observers: StdMutex::new(Vec::new()),
            next_observer: AtomicU64::new(1),
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observers(&self) -> MutexGuard<'_, Vec<(ObserverId, Arc<dyn RecorderObserver>)>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe(&self, observer: Arc<dyn RecorderObserver>) -> ObserverId {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        self.observers().push((id, observer));
        id
    }

    /// Call `f` for every observer, without holding any lock
    fn emit<F>(&self, f: F)
    where
        F: Fn(&dyn RecorderObserver),
    {
        let observers: Vec<Arc<dyn RecorderObserver>> =
            self.observers().iter().map(|(_, o)| Arc::clone(o)).collect();
        for observer in &observers {
            f(observer.as_ref());
        }
    }

    /// Drain capture events for one session generation
    async fn pump(
        shared: Weak<Self>,
        mut events: mpsc::UnboundedReceiver<CaptureEvent>,
        generation: u64,
    ) {
        while let Some(event) = events.recv().await {
            let Some(strong) = shared.upgrade() else {
                break;
            };
            strong.handle(event, generation);
        }
    }

    fn handle(self: &Arc<Self>, event: CaptureEvent, generation: u64) {
        let mut session = self.session();
        if session.generation != generation {
            debug!(?event, "Dropping event from released capture session");
            return;
        }

        match event {
            CaptureEvent::Started => {
                if !session.lifecycle.capture_started() {
                    debug!(state = %session.lifecycle.state(), "Ignoring unexpected capture start");
                    return;
                }
                session.pending_chunks.clear();
                if let Some(previous) = session.timer.replace(self.spawn_timer()) {
                    previous.abort();
                }
                drop(session);

                info!("Recording started");
                self.emit(|o| o.on_start());
            }
            CaptureEvent::Chunk(data) => {
                if !session.lifecycle.is_recording() {
                    debug!(size = data.len(), "Ignoring chunk outside a capture episode");
                    return;
                }
                debug!(size = data.len(), "Data available");
                if !data.is_empty() {
                    session.pending_chunks.push(data.clone());
                }
                drop(session);

                self.emit(|o| o.on_data_available(&data));
            }
            CaptureEvent::Stopped => {
                let Some(negotiated) = session.format else {
                    return;
                };
                if !session.lifecycle.capture_stopped() {
                    debug!(state = %session.lifecycle.state(), "Ignoring unexpected capture stop");
                    return;
                }
                if let Some(timer) = session.timer.take() {
                    timer.abort();
                }
                let chunks = std::mem::take(&mut session.pending_chunks);
                drop(session);

                let blob = AudioBlob::assemble(chunks, negotiated.format);
                info!(
                    size = blob.size_bytes(),
                    format = %negotiated.format,
                    "Recording stopped"
                );
                self.emit(|o| o.on_stop(&blob));
            }
            CaptureEvent::Failed(message) => {
                let aborted = session.lifecycle.capture_failed();
                if let Some(timer) = session.timer.take() {
                    timer.abort();
                }
                session.pending_chunks.clear();
                // End the encoder's episode so the next start is accepted.
                // Its trailing chunk and stop arrive while Idle and are ignored.
                if let Some(encoder) = session.encoder.as_mut() {
                    if let Err(e) = encoder.stop() {
                        debug!(error = %e, "Encoder had no episode to end");
                    }
                }
                drop(session);

                error!(%message, aborted, "Capture failed");
                let err = RecorderError::Capture(message);
                self.emit(|o| o.on_error(&err));
            }
        }
    }

    /// Emit `on_tick` every second, starting immediately
    fn spawn_timer(self: &Arc<Self>) -> JoinHandle<()> {
        let shared = Arc::downgrade(self);
        tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = interval(TICK_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(strong) = shared.upgrade() else {
                    break;
                };
                let elapsed = Elapsed::new(started.elapsed());
                strong.emit(|o| o.on_tick(elapsed));
            }
        })
    }
}
