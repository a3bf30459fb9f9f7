//! Input device value objects

/// Quality hints sent with a device access request.
///
/// The recorder always asks for the speech profile; callers cannot tune it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl AudioConstraints {
    /// Echo cancellation, noise suppression and automatic gain all on
    pub const fn speech() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self::speech()
    }
}

/// An enumerated audio input.
///
/// An empty `label` means the platform is hiding device names, which
/// usually indicates that microphone permission has not been granted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDevice {
    pub id: String,
    pub label: String,
}

impl InputDevice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    pub fn has_label(&self) -> bool {
        !self.label.is_empty()
    }
}
