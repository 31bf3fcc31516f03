//! Randomized cycle durations
//!
//! Each phase lasts a duration drawn uniformly, at millisecond granularity,
//! from a closed [`CycleRange`].

use std::time::Duration;

use rand::Rng;

use crate::error::ConfigError;

/// Closed interval `[min, max]` from which phase durations are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleRange {
    min: Duration,
    max: Duration,
}

impl CycleRange {
    /// The stock signal cycle: 4 to 6 seconds inclusive.
    pub const DEFAULT: Self = Self {
        min: Duration::from_millis(4000),
        max: Duration::from_millis(6000),
    };

    /// Creates a range, rejecting an empty or zero-length lower bound.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `min` is below one millisecond
    /// or greater than `max`.
    pub fn new(min: Duration, max: Duration) -> Result<Self, ConfigError> {
        if min < Duration::from_millis(1) {
            return Err(ConfigError::InvalidValue {
                field: "cycle.min".to_string(),
                value: format!("{min:?}"),
                expected: "at least 1ms".to_string(),
            });
        }
        if min > max {
            return Err(ConfigError::InvalidValue {
                field: "cycle.max".to_string(),
                value: format!("{max:?}"),
                expected: format!("a duration no shorter than cycle.min ({min:?})"),
            });
        }
        Ok(Self { min, max })
    }

    /// Lower bound of the range.
    #[must_use]
    pub const fn min(&self) -> Duration {
        self.min
    }

    /// Upper bound of the range.
    #[must_use]
    pub const fn max(&self) -> Duration {
        self.max
    }

    /// Draws a duration uniformly from `[min, max]` in whole milliseconds.
    ///
    /// Sub-millisecond bounds are honored by clamping the draw.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        let lo = whole_millis(self.min);
        let hi = whole_millis(self.max);
        Duration::from_millis(rng.random_range(lo..=hi)).clamp(self.min, self.max)
    }
}

impl Default for CycleRange {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for CycleRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}..={}",
            humantime::format_duration(self.min),
            humantime::format_duration(self.max)
        )
    }
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub(crate) fn whole_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Parses a human-readable duration such as `"4s"`, `"4500ms"`, or `"1m 30s"`.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` naming `field` if the text is not a
/// valid duration.
pub fn parse_duration(field: &str, s: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(s.trim()).map_err(|e| ConfigError::InvalidValue {
        field: field.to_string(),
        value: s.to_string(),
        expected: format!("a duration like '4s' or '4500ms' ({e})"),
    })
}
