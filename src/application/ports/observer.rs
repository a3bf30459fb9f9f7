//! Recorder observer interfaces

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use super::media::DeviceError;
use crate::domain::recording::{AudioBlob, Elapsed};

/// Errors reported to recorder observers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecorderError {
    #[error("Audio recording is not supported on this platform")]
    Unsupported,

    #[error("Failed to access microphone: {0}")]
    Acquisition(DeviceError),

    #[error("Capture request failed: {0}")]
    Request(DeviceError),

    #[error("Recording failed: {0}")]
    Capture(String),
}

/// Listener for recorder lifecycle events.
///
/// All methods default to no-ops; implement the ones you need. Methods are
/// called from the recorder's event task and must not block.
pub trait RecorderObserver: Send + Sync {
    fn on_start(&self) {}

    fn on_data_available(&self, _chunk: &[u8]) {}

    fn on_stop(&self, _blob: &AudioBlob) {}

    fn on_error(&self, _error: &RecorderError) {}

    fn on_tick(&self, _elapsed: Elapsed) {}
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);

/// Owned form of observer callbacks, for channel consumers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    Started,
    Data(Vec<u8>),
    Stopped(AudioBlob),
    Error(RecorderError),
    Tick(Elapsed),
}

/// Observer forwarding every callback into an unbounded channel
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<RecorderEvent>,
}

impl ChannelObserver {
    /// Create the observer and its receiving end
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<RecorderEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }

    fn send(&self, event: RecorderEvent) {
        let _ = self.tx.send(event);
    }
}

impl RecorderObserver for ChannelObserver {
    fn on_start(&self) {
        self.send(RecorderEvent::Started);
    }

    fn on_data_available(&self, chunk: &[u8]) {
        self.send(RecorderEvent::Data(chunk.to_vec()));
    }

    fn on_stop(&self, blob: &AudioBlob) {
        self.send(RecorderEvent::Stopped(blob.clone()));
    }

    fn on_error(&self, error: &RecorderError) {
        self.send(RecorderEvent::Error(error.clone()));
    }

    fn on_tick(&self, elapsed: Elapsed) {
        self.send(RecorderEvent::Tick(elapsed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recording::EncodingFormat;

    #[test]
    fn channel_observer_forwards_events() {
        let (observer, mut rx) = ChannelObserver::new();
        observer.on_start();
        observer.on_data_available(&[7, 8]);
        observer.on_stop(&AudioBlob::new(vec![7, 8], EncodingFormat::Ogg));

        assert_eq!(rx.try_recv().unwrap(), RecorderEvent::Started);
        assert_eq!(rx.try_recv().unwrap(), RecorderEvent::Data(vec![7, 8]));
        match rx.try_recv().unwrap() {
            RecorderEvent::Stopped(blob) => assert_eq!(blob.size_bytes(), 2),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn error_display() {
        let err = RecorderError::Acquisition(DeviceError::PermissionDenied);
        assert!(err.to_string().contains("permission denied"));
    }
}
