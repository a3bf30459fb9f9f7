//! Assembled audio value object

use super::encoding::EncodingFormat;

/// Blobs smaller than this are treated as an empty recording
pub const MIN_UPLOAD_BYTES: usize = 1000;

/// Value object holding one capture episode's encoded audio,
/// tagged with the format it was negotiated with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBlob {
    data: Vec<u8>,
    format: EncodingFormat,
}

impl AudioBlob {
    /// Create an AudioBlob from raw bytes
    pub fn new(data: Vec<u8>, format: EncodingFormat) -> Self {
        Self { data, format }
    }

    /// Concatenate captured chunks in order into a single blob.
    ///
    /// WAV captures are streamed with placeholder header sizes; those are
    /// patched here once the total length is known.
    pub fn assemble(chunks: Vec<Vec<u8>>, format: EncodingFormat) -> Self {
        let total = chunks.iter().map(Vec::len).sum();
        let mut data = Vec::with_capacity(total);
        for chunk in chunks {
            data.extend_from_slice(&chunk);
        }

        if format == EncodingFormat::Wav {
            patch_wav_sizes(&mut data);
        }

        Self { data, format }
    }

    /// Get the raw audio data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume and return the raw audio data
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Get the encoding format
    pub fn format(&self) -> EncodingFormat {
        self.format
    }

    /// Get the size in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Check whether the blob is too small to hold meaningful audio
    pub fn is_effectively_empty(&self, min_bytes: usize) -> bool {
        self.data.len() < min_bytes
    }

    /// Upload file name, e.g. `recording.webm`
    pub fn file_name(&self) -> String {
        format!("recording.{}", self.format.extension())
    }

    /// Get human-readable size
    pub fn human_readable_size(&self) -> String {
        let bytes = self.size_bytes();
        if bytes < 1024 {
            format!("{} B", bytes)
        } else if bytes < 1024 * 1024 {
            format!("{:.1} KB", bytes as f64 / 1024.0)
        } else {
            format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
        }
    }
}

/// Rewrite the RIFF and `data` chunk sizes to match the buffer length.
/// Buffers that do not start with a RIFF/WAVE header are left untouched.
fn patch_wav_sizes(data: &mut [u8]) {
    if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return;
    }

    let riff_size = u32::try_from(data.len() - 8).unwrap_or(u32::MAX);
    data[4..8].copy_from_slice(&riff_size.to_le_bytes());

    let mut offset: usize = 12;
    while offset.checked_add(8).is_some_and(|end| end <= data.len()) {
        let id = [data[offset], data[offset + 1], data[offset + 2], data[offset + 3]];
        if &id == b"data" {
            let payload = data.len() - (offset + 8);
            let size = u32::try_from(payload).unwrap_or(u32::MAX);
            data[offset + 4..offset + 8].copy_from_slice(&size.to_le_bytes());
            return;
        }

        let size = u32::from_le_bytes([
            data[offset + 4],
            data[offset + 5],
            data[offset + 6],
            data[offset + 7],
        ]) as usize;
        // Chunks are word aligned; a bogus size ends the walk
        match offset
            .checked_add(8)
            .and_then(|o| o.checked_add(size))
            .and_then(|o| o.checked_add(size & 1))
        {
            Some(next) => offset = next,
            None => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_header(data_size: u32) -> Vec<u8> {
        let mut header = Vec::new();
        header.extend_from_slice(b"RIFF");
        header.extend_from_slice(&u32::MAX.to_le_bytes());
        header.extend_from_slice(b"WAVE");
        header.extend_from_slice(b"fmt ");
        header.extend_from_slice(&16u32.to_le_bytes());
        header.extend_from_slice(&[1, 0, 1, 0]);
        header.extend_from_slice(&16000u32.to_le_bytes());
        header.extend_from_slice(&32000u32.to_le_bytes());
        header.extend_from_slice(&[2, 0, 16, 0]);
        header.extend_from_slice(b"data");
        header.extend_from_slice(&data_size.to_le_bytes());
        header
    }

    #[test]
    fn assemble_concatenates_in_order() {
        let blob = AudioBlob::assemble(vec![vec![1, 2], vec![3], vec![4, 5]], EncodingFormat::Webm);
        assert_eq!(blob.data(), &[1, 2, 3, 4, 5]);
        assert_eq!(blob.format(), EncodingFormat::Webm);
    }

    #[test]
    fn assemble_no_chunks_is_empty() {
        let blob = AudioBlob::assemble(Vec::new(), EncodingFormat::Ogg);
        assert_eq!(blob.size_bytes(), 0);
        assert!(blob.is_effectively_empty(MIN_UPLOAD_BYTES));
    }

    #[test]
    fn assemble_patches_streamed_wav_sizes() {
        let mut first = wav_header(u32::MAX);
        first.extend_from_slice(&[0u8; 100]);
        let blob = AudioBlob::assemble(vec![first, vec![0u8; 60]], EncodingFormat::Wav);

        let data = blob.data();
        assert_eq!(data.len(), 44 + 160);
        assert_eq!(u32::from_le_bytes([data[4], data[5], data[6], data[7]]), 196);
        assert_eq!(u32::from_le_bytes([data[40], data[41], data[42], data[43]]), 160);
    }

    #[test]
    fn assemble_stops_at_bogus_chunk_size() {
        let mut data = Vec::new();
        data.extend_from_slice(b"RIFF");
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(b"WAVE");
        data.extend_from_slice(b"LIST");
        data.extend_from_slice(&u32::MAX.to_le_bytes());
        data.extend_from_slice(b"data");
        data.extend_from_slice(&7u32.to_le_bytes());
        data.extend_from_slice(&[1u8; 8]);

        let blob = AudioBlob::assemble(vec![data.clone()], EncodingFormat::Wav);

        let patched = blob.data();
        assert_eq!(u32::from_le_bytes([patched[4], patched[5], patched[6], patched[7]]), 28);
        assert_eq!(&patched[8..], &data[8..]);
    }

    #[test]
    fn assemble_leaves_headerless_wav_alone() {
        let blob = AudioBlob::assemble(vec![vec![9u8; 20]], EncodingFormat::Wav);
        assert_eq!(blob.data(), &[9u8; 20]);
    }

    #[test]
    fn file_name_uses_extension() {
        let blob = AudioBlob::new(vec![0], EncodingFormat::WebmOpus);
        assert_eq!(blob.file_name(), "recording.webm");
    }

    #[test]
    fn empty_threshold() {
        assert!(AudioBlob::new(vec![0; 999], EncodingFormat::Webm).is_effectively_empty(MIN_UPLOAD_BYTES));
        assert!(!AudioBlob::new(vec![0; 1000], EncodingFormat::Webm).is_effectively_empty(MIN_UPLOAD_BYTES));
    }

    #[test]
    fn human_readable_size() {
        assert_eq!(AudioBlob::new(vec![0u8; 500], EncodingFormat::Wav).human_readable_size(), "500 B");
        assert_eq!(AudioBlob::new(vec![0u8; 2048], EncodingFormat::Wav).human_readable_size(), "2.0 KB");
        assert_eq!(
            AudioBlob::new(vec![0u8; 2 * 1024 * 1024], EncodingFormat::Wav).human_readable_size(),
            "2.0 MB"
        );
    }
}
