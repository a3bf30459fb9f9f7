//! Media infrastructure module
//!
//! Provides microphone capture through cpal. Audio is delivered as
//! streamed 16kHz mono WAV.

mod cpal_backend;
mod wav;

pub use cpal_backend::CpalBackend;
pub use wav::{stream_header, TARGET_SAMPLE_RATE};
