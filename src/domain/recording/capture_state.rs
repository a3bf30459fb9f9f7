//! Capture lifecycle state machine

use std::fmt;
use thiserror::Error;

/// Recorder capture states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CaptureState {
    /// No device held
    #[default]
    Uninitialized,
    /// Device acquired, not capturing
    Idle,
    /// Actively capturing
    Recording,
}

impl CaptureState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Idle => "idle",
            Self::Recording => "recording",
        }
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A request sent to the platform that has not been confirmed yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingRequest {
    Start,
    Stop,
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid state transition: cannot {action} while {current_state}")]
pub struct InvalidTransition {
    pub current_state: CaptureState,
    pub action: &'static str,
}

/// Capture lifecycle entity.
///
/// Requests (`request_start`, `request_stop`) are validated here, while the
/// actual state changes only happen when the platform confirms them
/// (`capture_started`, `capture_stopped`).
///
/// State machine:
///   UNINITIALIZED -> IDLE (acquired)
///   IDLE -> RECORDING (capture_started, after request_start)
///   RECORDING -> IDLE (capture_stopped or capture_failed)
///   any -> UNINITIALIZED (release)
#[derive(Debug, Default)]
pub struct CaptureLifecycle {
    state: CaptureState,
    pending: Option<PendingRequest>,
}

impl CaptureLifecycle {
    /// Create a lifecycle with no device held
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current state
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Get the unconfirmed request, if any
    pub fn pending(&self) -> Option<PendingRequest> {
        self.pending
    }

    /// Check if currently recording
    pub fn is_recording(&self) -> bool {
        self.state == CaptureState::Recording
    }

    /// Recording, or a start has been requested and not yet confirmed
    pub fn is_busy(&self) -> bool {
        self.is_recording() || self.pending == Some(PendingRequest::Start)
    }

    /// Check whether the device may be (re-)acquired
    pub fn check_init(&self) -> Result<(), InvalidTransition> {
        if self.is_busy() {
            return Err(self.invalid("initialize"));
        }
        Ok(())
    }

    /// Device acquired: transition to IDLE
    pub fn acquired(&mut self) -> Result<(), InvalidTransition> {
        self.check_init()?;
        self.state = CaptureState::Idle;
        self.pending = None;
        Ok(())
    }

    /// Validate and record a start request
    pub fn request_start(&mut self) -> Result<(), InvalidTransition> {
        if self.state != CaptureState::Idle || self.pending.is_some() {
            return Err(self.invalid("start recording"));
        }
        self.pending = Some(PendingRequest::Start);
        Ok(())
    }

    /// Validate and record a stop request
    pub fn request_stop(&mut self) -> Result<(), InvalidTransition> {
        if self.state != CaptureState::Recording || self.pending.is_some() {
            return Err(self.invalid("stop recording"));
        }
        self.pending = Some(PendingRequest::Stop);
        Ok(())
    }

    /// The platform refused the pending request
    pub fn request_refused(&mut self) {
        self.pending = None;
    }

    /// Platform confirmed capture start. Returns false if ignored.
    pub fn capture_started(&mut self) -> bool {
        if self.state != CaptureState::Idle {
            return false;
        }
        self.state = CaptureState::Recording;
        self.pending = None;
        true
    }

    /// Platform confirmed capture stop. Returns false if ignored.
    pub fn capture_stopped(&mut self) -> bool {
        if self.state != CaptureState::Recording {
            return false;
        }
        self.state = CaptureState::Idle;
        self.pending = None;
        true
    }

    /// Platform fault during capture. Returns true if an episode was aborted.
    pub fn capture_failed(&mut self) -> bool {
        let aborted = self.is_busy();
        if self.state == CaptureState::Recording {
            self.state = CaptureState::Idle;
        }
        self.pending = None;
        aborted
    }

    /// Device released: back to UNINITIALIZED from any state
    pub fn release(&mut self) {
        self.state = CaptureState::Uninitialized;
        self.pending = None;
    }

    fn invalid(&self, action: &'static str) -> InvalidTransition {
        InvalidTransition {
            current_state: self.state,
            action,
        }
    }
}
