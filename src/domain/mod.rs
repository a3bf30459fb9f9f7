//! Domain layer - Core business logic
//!
//! Contains value objects, entities, and domain errors.
//! This layer has no dependencies on external systems.

pub mod chat;
pub mod config;
pub mod error;
pub mod recording;

// Re-export common types
pub use chat::{ChatDetail, ChatId, ChatMessage, ChatReply, ChatSummary, Role, TranscribeReply};
pub use config::AppConfig;
pub use error::*;
pub use recording::{
    AudioBlob, AudioConstraints, CaptureLifecycle, CaptureState, Duration, Elapsed,
    EncodingFormat, InputDevice, InvalidTransition, NegotiatedFormat,
};
