//! Microphone capture using cpal
//!
//! The cpal stream lives on a dedicated thread since `cpal::Stream` is not
//! Send. The audio callback appends mono i16 samples to a shared buffer
//! while an episode is running, and a per-episode worker thread drains that
//! buffer into WAV chunks every timeslice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, Mutex as StdMutex, PoisonError};
use std::thread;
use std::time::{Duration as StdDuration, Instant};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig, StreamError};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::wav::{self, TARGET_SAMPLE_RATE};
use crate::application::ports::{
    AudioSource, CaptureEncoder, CaptureEvent, CaptureSink, DeviceError, MediaBackend,
};
use crate::domain::recording::{AudioConstraints, EncodingFormat, InputDevice};

/// How often the chunk worker checks for a stop request
const STOP_POLL: StdDuration = StdDuration::from_millis(50);

/// cpal-backed media platform
#[derive(Debug, Clone, Default)]
pub struct CpalBackend {
    /// Input device name; the host default is used when unset or missing
    preferred_device: Option<String>,
}

impl CpalBackend {
    /// Create a backend using the default input device
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend preferring the named input device
    pub fn with_device(name: Option<String>) -> Self {
        Self {
            preferred_device: name,
        }
    }

    fn input_device(preferred: Option<&str>) -> Result<cpal::Device, DeviceError> {
        let host = cpal::default_host();

        if let Some(name) = preferred {
            let devices = host
                .input_devices()
                .map_err(|e| DeviceError::Platform(e.to_string()))?;
            for device in devices {
                if device.name().map(|n| n == name).unwrap_or(false) {
                    return Ok(device);
                }
            }
            warn!(device = name, "Configured input device not found, using default");
        }

        host.default_input_device().ok_or(DeviceError::NoDevice)
    }

    /// Pick a stream config, preferring mono and 16kHz
    fn input_config(device: &cpal::Device) -> Result<(StreamConfig, SampleFormat), DeviceError> {
        let supported = device
            .supported_input_configs()
            .map_err(|e| DeviceError::Platform(format!("Failed to get configs: {}", e)))?;

        let mut best: Option<cpal::SupportedStreamConfigRange> = None;
        for config in supported {
            if !matches!(config.sample_format(), SampleFormat::I16 | SampleFormat::F32) {
                continue;
            }

            let includes_target = config.min_sample_rate().0 <= TARGET_SAMPLE_RATE
                && config.max_sample_rate().0 >= TARGET_SAMPLE_RATE;
            let is_better = match &best {
                None => true,
                Some(current) => {
                    let fewer_channels = config.channels() < current.channels();
                    let better_rate =
                        includes_target && current.min_sample_rate().0 > TARGET_SAMPLE_RATE;
                    fewer_channels || better_rate
                }
            };
            if is_better {
                best = Some(config);
            }
        }

        let range = best.ok_or(DeviceError::Unsupported)?;
        let sample_rate = if range.min_sample_rate().0 <= TARGET_SAMPLE_RATE
            && range.max_sample_rate().0 >= TARGET_SAMPLE_RATE
        {
            SampleRate(TARGET_SAMPLE_RATE)
        } else {
            range.min_sample_rate()
        };

        let sample_format = range.sample_format();
        let config = StreamConfig {
            channels: range.channels(),
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };
        Ok((config, sample_format))
    }

    /// Build and play the input stream on the current thread
    fn open_stream(
        preferred: Option<&str>,
        buffer: &Arc<CaptureBuffer>,
        faults: FaultSlot,
    ) -> Result<(cpal::Stream, String, u32), DeviceError> {
        let device = Self::input_device(preferred)?;
        let label = device.name().unwrap_or_default();
        let (config, sample_format) = Self::input_config(&device)?;
        let channels = config.channels;
        debug!(
            device = %label,
            sample_rate = config.sample_rate.0,
            channels,
            ?sample_format,
            "Opening input stream"
        );

        let on_error = move |err: StreamError| faults.report(err);
        let stream = match sample_format {
            SampleFormat::I16 => {
                let buffer = Arc::clone(buffer);
                device.build_input_stream(
                    &config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        buffer.push(&wav::downmix(data, channels));
                    },
                    on_error,
                    None,
                )
            }
            SampleFormat::F32 => {
                let buffer = Arc::clone(buffer);
                device.build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        buffer.push(&wav::downmix(&wav::f32_to_i16(data), channels));
                    },
                    on_error,
                    None,
                )
            }
            _ => return Err(DeviceError::Unsupported),
        }
        .map_err(map_build_error)?;

        stream
            .play()
            .map_err(|e| DeviceError::Platform(e.to_string()))?;
        Ok((stream, label, config.sample_rate.0))
    }

    /// Own the input stream until shutdown is requested or the source is dropped
    fn run_stream(
        preferred: Option<String>,
        buffer: Arc<CaptureBuffer>,
        faults: FaultSlot,
        ready: oneshot::Sender<Result<(String, u32), DeviceError>>,
        shutdown: std_mpsc::Receiver<()>,
    ) {
        match Self::open_stream(preferred.as_deref(), &buffer, faults) {
            Ok((stream, label, sample_rate)) => {
                if ready.send(Ok((label, sample_rate))).is_err() {
                    return;
                }
                let _ = shutdown.recv();
                drop(stream);
                debug!("Input stream closed");
            }
            Err(e) => {
                let _ = ready.send(Err(e));
            }
        }
    }
}

fn map_build_error(err: cpal::BuildStreamError) -> DeviceError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => DeviceError::NoDevice,
        cpal::BuildStreamError::StreamConfigNotSupported => DeviceError::Unsupported,
        other => DeviceError::Busy(other.to_string()),
    }
}

#[async_trait]
impl MediaBackend for CpalBackend {
    fn has_device_access(&self) -> bool {
        cpal::default_host().input_devices().is_ok()
    }

    fn has_capture_encoder(&self) -> bool {
        true
    }

    fn is_format_supported(&self, format: EncodingFormat) -> bool {
        format == EncodingFormat::Wav
    }

    fn default_format(&self) -> EncodingFormat {
        EncodingFormat::Wav
    }

    async fn acquire_input(
        &self,
        constraints: &AudioConstraints,
    ) -> Result<Box<dyn AudioSource>, DeviceError> {
        // cpal exposes no echo/noise/gain processing; these are hints only
        debug!(?constraints, "Acquiring cpal input");

        let buffer = Arc::new(CaptureBuffer::default());
        let faults = FaultSlot::default();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = std_mpsc::channel();

        let preferred = self.preferred_device.clone();
        let stream_buffer = Arc::clone(&buffer);
        let stream_faults = faults.clone();
        thread::Builder::new()
            .name("audio-input".into())
            .spawn(move || {
                Self::run_stream(preferred, stream_buffer, stream_faults, ready_tx, shutdown_rx)
            })
            .map_err(|e| DeviceError::Platform(format!("Failed to spawn input thread: {}", e)))?;

        let (label, sample_rate) = ready_rx
            .await
            .map_err(|_| DeviceError::Platform("Input thread exited unexpectedly".into()))??;

        info!(device = %label, sample_rate, "Audio input acquired");
        Ok(Box::new(CpalSource {
            label,
            sample_rate,
            buffer,
            faults,
            shutdown: Some(shutdown_tx),
        }))
    }

    async fn enumerate_inputs(&self) -> Result<Vec<InputDevice>, DeviceError> {
        tokio::task::spawn_blocking(|| {
            let devices = cpal::default_host()
                .input_devices()
                .map_err(|e| DeviceError::Platform(e.to_string()))?;
            Ok::<_, DeviceError>(
                devices
                    .enumerate()
                    .map(|(index, device)| {
                        InputDevice::new(index.to_string(), device.name().unwrap_or_default())
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .await
        .map_err(|e| DeviceError::Platform(format!("Task join error: {}", e)))?
    }
}

/// Samples captured by the audio callback
#[derive(Default)]
struct CaptureBuffer {
    samples: StdMutex<Vec<i16>>,
    capturing: AtomicBool,
}

impl CaptureBuffer {
    fn push(&self, data: &[i16]) {
        if self.capturing.load(Ordering::Acquire) {
            self.samples
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(data);
        }
    }

    fn drain(&self) -> Vec<i16> {
        std::mem::take(&mut *self.samples.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn begin(&self) {
        self.drain();
        self.capturing.store(true, Ordering::Release);
    }

    fn end(&self) {
        self.capturing.store(false, Ordering::Release);
    }
}

/// Where stream faults are reported once an encoder is attached
#[derive(Clone, Default)]
struct FaultSlot(Arc<StdMutex<Option<CaptureSink>>>);

impl FaultSlot {
    fn attach(&self, sink: CaptureSink) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    fn detach(&self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    fn report(&self, err: StreamError) {
        match err {
            StreamError::DeviceNotAvailable => {
                warn!("Audio input device disconnected");
                if let Some(sink) = self.0.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
                    sink.emit(CaptureEvent::Failed(err.to_string()));
                }
            }
            other => warn!(error = %other, "Audio stream error"),
        }
    }
}

/// Live cpal input stream
struct CpalSource {
    label: String,
    sample_rate: u32,
    buffer: Arc<CaptureBuffer>,
    faults: FaultSlot,
    shutdown: Option<std_mpsc::Sender<()>>,
}

impl AudioSource for CpalSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn open_encoder(
        &mut self,
        format: EncodingFormat,
        sink: CaptureSink,
    ) -> Result<Box<dyn CaptureEncoder>, DeviceError> {
        if format != EncodingFormat::Wav {
            return Err(DeviceError::Unsupported);
        }
        if !self.is_live() {
            return Err(DeviceError::InvalidState("input stream is closed".into()));
        }

        self.faults.attach(sink.clone());
        Ok(Box::new(WavChunkEncoder {
            sample_rate: self.sample_rate,
            buffer: Arc::clone(&self.buffer),
            sink,
            stop_flag: None,
            worker: None,
        }))
    }

    fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            self.buffer.end();
            self.faults.detach();
            let _ = shutdown.send(());
        }
    }

    fn is_live(&self) -> bool {
        self.shutdown.is_some()
    }
}

impl Drop for CpalSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Emits the buffered samples as WAV chunks once per timeslice
struct WavChunkEncoder {
    sample_rate: u32,
    buffer: Arc<CaptureBuffer>,
    sink: CaptureSink,
    /// Set while an episode's worker thread is running
    stop_flag: Option<Arc<AtomicBool>>,
    /// Worker of the latest episode, joined before the next one starts
    worker: Option<thread::JoinHandle<()>>,
}

impl WavChunkEncoder {
    fn run_episode(
        sample_rate: u32,
        buffer: Arc<CaptureBuffer>,
        sink: CaptureSink,
        stop: Arc<AtomicBool>,
        timeslice: StdDuration,
    ) {
        let mut header = match wav::stream_header(sample_rate) {
            Ok(header) => Some(header),
            Err(e) => {
                buffer.end();
                sink.emit(CaptureEvent::Failed(e.to_string()));
                return;
            }
        };
        sink.emit(CaptureEvent::Started);

        loop {
            let deadline = Instant::now() + timeslice;
            while !stop.load(Ordering::Acquire) {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                thread::sleep(STOP_POLL.min(deadline - now));
            }

            // Read the flag before draining so the final drain sees every sample
            let stopping = stop.load(Ordering::Acquire);
            let samples = buffer.drain();
            let mut chunk = header.take().unwrap_or_default();
            chunk.extend(wav::pcm_bytes(&samples));
            if !chunk.is_empty() {
                sink.emit(CaptureEvent::Chunk(chunk));
            }
            if stopping {
                break;
            }
        }

        sink.emit(CaptureEvent::Stopped);
    }
}

impl CaptureEncoder for WavChunkEncoder {
    fn start(&mut self, timeslice: StdDuration) -> Result<(), DeviceError> {
        if self.stop_flag.is_some() {
            return Err(DeviceError::InvalidState("capture already running".into()));
        }
        // A stopped worker exits within one poll; its events must precede ours
        if let Some(previous) = self.worker.take() {
            if previous.join().is_err() {
                warn!("Previous encoder thread panicked");
            }
        }

        let stop = Arc::new(AtomicBool::new(false));
        self.buffer.begin();

        let sample_rate = self.sample_rate;
        let buffer = Arc::clone(&self.buffer);
        let sink = self.sink.clone();
        let worker_stop = Arc::clone(&stop);
        let spawned = thread::Builder::new()
            .name("wav-chunker".into())
            .spawn(move || Self::run_episode(sample_rate, buffer, sink, worker_stop, timeslice));

        let worker = match spawned {
            Ok(worker) => worker,
            Err(e) => {
                self.buffer.end();
                return Err(DeviceError::Platform(format!(
                    "Failed to spawn encoder thread: {}",
                    e
                )));
            }
        };

        self.stop_flag = Some(stop);
        self.worker = Some(worker);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        let Some(stop) = self.stop_flag.take() else {
            return Err(DeviceError::InvalidState("capture is not running".into()));
        };
        self.buffer.end();
        stop.store(true, Ordering::Release);
        Ok(())
    }
}

impl Drop for WavChunkEncoder {
    fn drop(&mut self) {
        if let Some(stop) = self.stop_flag.take() {
            self.buffer.end();
            stop.store(true, Ordering::Release);
        }
    }
}
