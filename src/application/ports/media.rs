//! Platform media capture port interfaces
//!
//! A `MediaBackend` grants exclusive access to an audio input
//! (`AudioSource`), which can then be wrapped by a `CaptureEncoder` that
//! periodically emits encoded chunks.

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::recording::{AudioConstraints, EncodingFormat, InputDevice};

/// Platform media errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("No audio input device available")]
    NoDevice,

    #[error("Audio device is busy: {0}")]
    Busy(String),

    #[error("Audio capture is not supported on this platform")]
    Unsupported,

    #[error("Invalid capture state: {0}")]
    InvalidState(String),

    #[error("Audio platform error: {0}")]
    Platform(String),
}

/// Events emitted by a capture encoder, in platform order:
/// `Started`, zero or more `Chunk`s, then `Stopped`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    Started,
    Chunk(Vec<u8>),
    Stopped,
    Failed(String),
}

/// Sending half of a capture event stream.
///
/// Cheap to clone and safe to use from platform audio threads.
#[derive(Debug, Clone)]
pub struct CaptureSink {
    tx: mpsc::UnboundedSender<CaptureEvent>,
}

impl CaptureSink {
    /// Create a sink and the receiver the recorder drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CaptureEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emit an event; silently dropped once the receiver is gone
    pub fn emit(&self, event: CaptureEvent) {
        let _ = self.tx.send(event);
    }

    /// Check whether anyone is still listening
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Port for platform audio capture
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Whether the platform exposes a device access API
    fn has_device_access(&self) -> bool;

    /// Whether the platform exposes a capture encoder API
    fn has_capture_encoder(&self) -> bool;

    /// Whether the capture encoder can produce `format`
    fn is_format_supported(&self, format: EncodingFormat) -> bool;

    /// Format the encoder uses when none of the requested ones is supported
    fn default_format(&self) -> EncodingFormat;

    /// Request exclusive access to an audio input.
    ///
    /// # Arguments
    /// * `constraints` - Quality hints for the input
    ///
    /// # Returns
    /// A live source that must be stopped explicitly
    async fn acquire_input(
        &self,
        constraints: &AudioConstraints,
    ) -> Result<Box<dyn AudioSource>, DeviceError>;

    /// List available audio inputs
    async fn enumerate_inputs(&self) -> Result<Vec<InputDevice>, DeviceError>;
}

/// A live, exclusively owned microphone stream
pub trait AudioSource: Send {
    /// Human-readable device name
    fn label(&self) -> &str;

    /// Wrap the source in an encoder producing `format`.
    /// Events for every capture episode are delivered to `sink`.
    fn open_encoder(
        &mut self,
        format: EncodingFormat,
        sink: CaptureSink,
    ) -> Result<Box<dyn CaptureEncoder>, DeviceError>;

    /// Stop the stream and free the device. Idempotent.
    fn stop(&mut self);

    /// Whether the stream is still held
    fn is_live(&self) -> bool;
}

/// Encoder turning a live source into chunked, encoded audio
pub trait CaptureEncoder: Send {
    /// Begin capturing, flushing a chunk every `timeslice`.
    /// `Started` is emitted once capture is actually running.
    fn start(&mut self, timeslice: StdDuration) -> Result<(), DeviceError>;

    /// Finalize capture. The last `Chunk` and `Stopped` follow asynchronously.
    fn stop(&mut self) -> Result<(), DeviceError>;
}
