//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod chat;
pub mod config;
pub mod media;
pub mod observer;

// Re-export common types
pub use chat::{ChatError, ChatService};
pub use config::ConfigStore;
pub use media::{AudioSource, CaptureEncoder, CaptureEvent, CaptureSink, DeviceError, MediaBackend};
pub use observer::{ChannelObserver, ObserverId, RecorderError, RecorderEvent, RecorderObserver};

/// Progress callback type for reporting recording progress.
/// Parameters: (elapsed_ms, total_ms)
pub type ProgressCallback = std::sync::Arc<dyn Fn(u64, u64) + Send + Sync>;
