//! Time-of-day values and do-not-disturb windows
//!
//! Quiet hours are stored remotely as two `HH:MM` strings. Both set to the
//! sentinel `00:00` means the window is switched off.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Errors raised while parsing a time-of-day string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeOfDayError {
    /// Input does not look like `HH:MM` or `HH:MM:SS`
    #[error("malformed time of day: '{0}'")]
    Malformed(String),

    /// Hour or minute outside the 24h clock
    #[error("time of day out of range: '{0}'")]
    OutOfRange(String),
}

/// Minute-granular time on a 24h clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Boundary value used when quiet hours are disabled
    pub const SENTINEL: Self = Self { hour: 0, minute: 0 };

    /// Create a time of day, validating the 24h range
    ///
    /// # Errors
    /// - `TimeOfDayError::OutOfRange` if `hour > 23` or `minute > 59`
    pub fn new(hour: u8, minute: u8) -> Result<Self, TimeOfDayError> {
        if hour > 23 || minute > 59 {
            return Err(TimeOfDayError::OutOfRange(format!("{hour}:{minute}")));
        }
        Ok(Self { hour, minute })
    }

    /// Whole hour on the 24h clock, wrapping hours past 23
    #[inline]
    #[must_use]
    pub const fn from_hour(hour: u8) -> Self {
        Self {
            hour: hour % 24,
            minute: 0,
        }
    }

    /// Hour component (0-23)
    #[inline]
    #[must_use]
    pub const fn hour(self) -> u8 {
        self.hour
    }

    /// Minute component (0-59)
    #[inline]
    #[must_use]
    pub const fn minute(self) -> u8 {
        self.minute
    }

    /// Check if this is the disabled-window sentinel
    #[inline]
    #[must_use]
    pub fn is_sentinel(self) -> bool {
        self == Self::SENTINEL
    }

    /// Minutes elapsed since midnight
    #[inline]
    #[must_use]
    pub fn minutes_since_midnight(self) -> u16 {
        u16::from(self.hour) * 60 + u16::from(self.minute)
    }

    /// The 24 whole-hour values offered by the quiet-hours selectors
    pub fn hourly_options() -> impl Iterator<Item = TimeOfDay> {
        (0..24u8).map(Self::from_hour)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeOfDayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parts: Vec<&str> = trimmed.split(':').collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(TimeOfDayError::Malformed(s.to_string()));
        }

        let field = |raw: &str, max_len: usize| -> Result<u8, TimeOfDayError> {
            if raw.is_empty() || raw.len() > max_len || !raw.bytes().all(|b| b.is_ascii_digit()) {
                return Err(TimeOfDayError::Malformed(s.to_string()));
            }
            raw.parse::<u8>()
                .map_err(|_| TimeOfDayError::Malformed(s.to_string()))
        };

        let hour = field(parts[0], 2)?;
        if parts[1].len() != 2 {
            return Err(TimeOfDayError::Malformed(s.to_string()));
        }
        let minute = field(parts[1], 2)?;

        // Seconds are tolerated but dropped
        if let Some(&seconds) = parts.get(2) {
            if seconds.len() != 2 || field(seconds, 2)? > 59 {
                return Err(TimeOfDayError::Malformed(s.to_string()));
            }
        }

        Self::new(hour, minute).map_err(|_| TimeOfDayError::OutOfRange(s.to_string()))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Daily quiet-hours window
///
/// The start/end values are kept even while the window is disabled so a
/// user's selection survives toggling; [`DndWindow::boundaries`] yields the
/// values that go over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DndWindow {
    /// Whether quiet hours are active
    pub enabled: bool,
    /// Start of the window (inclusive)
    pub start: TimeOfDay,
    /// End of the window (exclusive)
    pub end: TimeOfDay,
}

impl DndWindow {
    /// Enabled window between two boundaries
    #[inline]
    #[must_use]
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self {
            enabled: true,
            start,
            end,
        }
    }

    /// Disabled window with sentinel boundaries
    #[inline]
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            start: TimeOfDay::SENTINEL,
            end: TimeOfDay::SENTINEL,
        }
    }

    /// Derive a window from stored boundaries; `00:00`/`00:00` means off
    #[must_use]
    pub fn from_boundaries(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self {
            enabled: !(start.is_sentinel() && end.is_sentinel()),
            start,
            end,
        }
    }

    /// Boundaries as persisted: sentinels whenever the window is disabled
    #[must_use]
    pub fn boundaries(&self) -> (TimeOfDay, TimeOfDay) {
        if self.enabled {
            (self.start, self.end)
        } else {
            (TimeOfDay::SENTINEL, TimeOfDay::SENTINEL)
        }
    }

    /// Copy of this window with boundaries normalised for persistence
    #[must_use]
    pub fn normalized(self) -> Self {
        let (start, end) = self.boundaries();
        Self {
            enabled: self.enabled,
            start,
            end,
        }
    }

    /// Check if `time` falls inside the window
    ///
    /// Windows whose start is after their end wrap past midnight. A window
    /// with equal boundaries is empty.
    #[must_use]
    pub fn contains(&self, time: TimeOfDay) -> bool {
        if !self.enabled || self.start == self.end {
            return false;
        }
        if self.start < self.end {
            self.start <= time && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}
