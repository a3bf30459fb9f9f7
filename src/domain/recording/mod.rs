//! Recording domain module

mod audio_blob;
mod capture_state;
mod device;
mod duration;
mod elapsed;
mod encoding;

pub use audio_blob::{AudioBlob, MIN_UPLOAD_BYTES};
pub use capture_state::{CaptureLifecycle, CaptureState, InvalidTransition, PendingRequest};
pub use device::{AudioConstraints, InputDevice};
pub use duration::{Duration, DEFAULT_MAX_DURATION_SECS, DEFAULT_UPLOAD_TIMEOUT_SECS};
pub use elapsed::Elapsed;
pub use encoding::{EncodingFormat, NegotiatedFormat, CANDIDATE_FORMATS};
