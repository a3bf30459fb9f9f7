//! Encoding format value objects and negotiation

use std::fmt;

/// Container/codec pairings a capture encoder may produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingFormat {
    Webm,
    WebmOpus,
    Mp4,
    Ogg,
    Wav,
}

/// Ranked candidates, most preferred first
pub const CANDIDATE_FORMATS: [EncodingFormat; 5] = [
    EncodingFormat::Webm,
    EncodingFormat::WebmOpus,
    EncodingFormat::Mp4,
    EncodingFormat::Ogg,
    EncodingFormat::Wav,
];

impl EncodingFormat {
    /// Get the full MIME type string, including codec parameters
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Webm => "audio/webm",
            Self::WebmOpus => "audio/webm;codecs=opus",
            Self::Mp4 => "audio/mp4",
            Self::Ogg => "audio/ogg",
            Self::Wav => "audio/wav",
        }
    }

    /// Get the MIME type without codec parameters
    pub const fn container_mime(&self) -> &'static str {
        match self {
            Self::Webm | Self::WebmOpus => "audio/webm",
            Self::Mp4 => "audio/mp4",
            Self::Ogg => "audio/ogg",
            Self::Wav => "audio/wav",
        }
    }

    /// Get the file extension
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Webm | Self::WebmOpus => "webm",
            Self::Mp4 => "mp4",
            Self::Ogg => "ogg",
            Self::Wav => "wav",
        }
    }

    /// Check whether this format appears in the candidate list
    pub fn is_candidate(&self) -> bool {
        CANDIDATE_FORMATS.contains(self)
    }
}

impl fmt::Display for EncodingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of format negotiation.
///
/// `degraded` is set when no candidate was supported and the platform
/// default was used instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedFormat {
    pub format: EncodingFormat,
    pub degraded: bool,
}

impl NegotiatedFormat {
    /// Pick the first supported candidate, or fall back to `platform_default`.
    pub fn negotiate<F>(is_supported: F, platform_default: EncodingFormat) -> Self
    where
        F: Fn(EncodingFormat) -> bool,
    {
        match CANDIDATE_FORMATS.iter().copied().find(|f| is_supported(*f)) {
            Some(format) => Self {
                format,
                degraded: false,
            },
            None => Self {
                format: platform_default,
                degraded: true,
            },
        }
    }
}

impl fmt::Display for NegotiatedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.degraded {
            write!(f, "{} (platform default)", self.format)
        } else {
            write!(f, "{}", self.format)
        }
    }
}
