//! Application layer - Use cases and port interfaces
//!
//! Contains the recorder lifecycle, the voice turn use case, and the
//! trait definitions for external system interactions.

pub mod ports;
pub mod recorder;
pub mod voice_turn;

pub use recorder::{Recorder, TICK_INTERVAL, TIMESLICE};
pub use voice_turn::{
    VoiceTurnCallbacks, VoiceTurnConfig, VoiceTurnError, VoiceTurnOutput, VoiceTurnUseCase,
};
