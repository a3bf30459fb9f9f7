//! Streaming WAV helpers
//!
//! The header is written once, up front, with zero sizes. Chunks after it
//! are raw little-endian PCM; `AudioBlob::assemble` fixes the sizes once
//! the recording is complete.

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::application::ports::DeviceError;

/// Target sample rate for speech (16kHz)
pub const TARGET_SAMPLE_RATE: u32 = 16000;

/// Bits per sample of the emitted PCM
pub const BITS_PER_SAMPLE: u16 = 16;

/// Mono 16-bit PCM spec at the given rate
pub fn speech_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    }
}

/// Build a WAV header describing an empty mono 16-bit stream
pub fn stream_header(sample_rate: u32) -> Result<Vec<u8>, DeviceError> {
    let mut header = Vec::with_capacity(44);
    let writer = WavWriter::new(Cursor::new(&mut header), speech_spec(sample_rate))
        .map_err(|e| DeviceError::Platform(format!("Failed to write WAV header: {}", e)))?;
    writer
        .finalize()
        .map_err(|e| DeviceError::Platform(format!("Failed to write WAV header: {}", e)))?;
    Ok(header)
}

/// Serialize samples as little-endian PCM
pub fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Average interleaved channels down to mono
pub fn downmix(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels as usize)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / frame.len() as i32) as i16
        })
        .collect()
}

/// Convert float samples in [-1.0, 1.0] to i16
pub fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}
