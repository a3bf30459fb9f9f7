//! Elapsed recording time

use std::fmt;
use std::time::Duration as StdDuration;

/// Time since the current capture episode started.
/// Displays as `MM:SS`; minutes do not wrap at an hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Elapsed(StdDuration);

impl Elapsed {
    pub const fn new(duration: StdDuration) -> Self {
        Self(duration)
    }

    pub const fn as_std(&self) -> StdDuration {
        self.0
    }

    pub fn as_millis(&self) -> u64 {
        u64::try_from(self.0.as_millis()).unwrap_or(u64::MAX)
    }

    /// Whole seconds, the granularity of the recorder tick
    pub const fn whole_secs(&self) -> u64 {
        self.0.as_secs()
    }
}

impl From<StdDuration> for Elapsed {
    fn from(duration: StdDuration) -> Self {
        Self(duration)
    }
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.as_secs();
        write!(f, "{:02}:{:02}", secs / 60, secs % 60)
    }
}
