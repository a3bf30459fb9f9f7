//! Recording cap and upload timeout durations

use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use crate::domain::error::DurationParseError;

/// Recording stops on its own after this many seconds
pub const DEFAULT_MAX_DURATION_SECS: u64 = 60;

/// Uploads are abandoned after this many seconds
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 30;

/// A positive whole-second span, written as `30s`, `1m` or `2m30s`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration {
    milliseconds: u64,
}

impl Duration {
    pub const fn from_secs(secs: u64) -> Self {
        Self {
            milliseconds: secs * 1000,
        }
    }

    pub const fn default_max_duration() -> Self {
        Self::from_secs(DEFAULT_MAX_DURATION_SECS)
    }

    pub const fn default_upload_timeout() -> Self {
        Self::from_secs(DEFAULT_UPLOAD_TIMEOUT_SECS)
    }

    pub const fn as_secs(&self) -> u64 {
        self.milliseconds / 1000
    }

    pub const fn as_millis(&self) -> u64 {
        self.milliseconds
    }

    pub const fn as_std(&self) -> StdDuration {
        StdDuration::from_millis(self.milliseconds)
    }
}

impl FromStr for Duration {
    type Err = DurationParseError;

    /// Minutes, if present, must come before seconds. Case and surrounding
    /// whitespace are ignored; zero is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DurationParseError { input: s.to_string() };
        let text = s.trim().to_ascii_lowercase();

        let (minutes, rest) = match text.split_once('m') {
            Some((minutes, rest)) => (Some(minutes), rest),
            None => (None, text.as_str()),
        };
        let seconds = match rest {
            "" => None,
            rest => Some(rest.strip_suffix('s').ok_or_else(invalid)?),
        };
        if minutes.is_none() && seconds.is_none() {
            return Err(invalid());
        }

        let number = |digits: &str| -> Result<u64, DurationParseError> {
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            digits.parse().map_err(|_| invalid())
        };
        let minutes = minutes.map(&number).transpose()?.unwrap_or(0);
        let seconds = seconds.map(&number).transpose()?.unwrap_or(0);

        let milliseconds = minutes
            .checked_mul(60)
            .and_then(|m| m.checked_add(seconds))
            .and_then(|total| total.checked_mul(1000))
            .filter(|&ms| ms > 0)
            .ok_or_else(invalid)?;

        Ok(Self { milliseconds })
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.as_secs() / 60, self.as_secs() % 60) {
            (0, secs) => write!(f, "{}s", secs),
            (mins, 0) => write!(f, "{}m", mins),
            (mins, secs) => write!(f, "{}m{}s", mins, secs),
        }
    }
}
