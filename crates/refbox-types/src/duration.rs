//! Signed nanosecond durations used by every match timer.
//!
//! Stage time left keeps counting down past zero when a half runs long, so
//! the match clock needs a signed duration. [`GameDuration`] wraps an `i64`
//! nanosecond count and serializes as a bare integer, which keeps the
//! recovery snapshot and the audit log readable by external replay tools.
//!
//! All arithmetic saturates at the `i64` bounds instead of panicking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_SEC: i64 = 1_000_000_000;

/// A signed span of match time with nanosecond resolution.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct GameDuration(#[ts(type = "number")] i64);

impl GameDuration {
    /// The empty duration.
    pub const ZERO: Self = Self(0);

    /// Create a duration from a raw nanosecond count.
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Create a duration from whole milliseconds, saturating on overflow.
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(NANOS_PER_MILLI))
    }

    /// Create a duration from whole seconds, saturating on overflow.
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(NANOS_PER_SEC))
    }

    /// Convert an unsigned [`std::time::Duration`], saturating at `i64::MAX`.
    pub fn from_std(duration: std::time::Duration) -> Self {
        Self(i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX))
    }

    /// The signed wall-clock distance from `start` to `end`.
    ///
    /// Negative when `end` lies before `start`.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let delta = end.signed_duration_since(start);
        delta.num_nanoseconds().map_or_else(
            || {
                if delta < chrono::TimeDelta::zero() {
                    Self(i64::MIN)
                } else {
                    Self(i64::MAX)
                }
            },
            Self,
        )
    }

    /// Raw nanosecond count.
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// Whole milliseconds, truncated toward zero.
    pub const fn as_millis(self) -> i64 {
        match self.0.checked_div(NANOS_PER_MILLI) {
            Some(millis) => millis,
            None => 0,
        }
    }

    /// Whole seconds, truncated toward zero.
    pub const fn as_secs(self) -> i64 {
        match self.0.checked_div(NANOS_PER_SEC) {
            Some(secs) => secs,
            None => 0,
        }
    }

    /// Whether the duration is strictly greater than zero.
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Add two durations, saturating at the numeric bounds.
    #[must_use]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Subtract `rhs`, saturating at the numeric bounds.
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl From<std::time::Duration> for GameDuration {
    fn from(duration: std::time::Duration) -> Self {
        Self::from_std(duration)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn constructors_agree() {
        assert_eq!(GameDuration::from_secs(2), GameDuration::from_millis(2000));
        assert_eq!(
            GameDuration::from_millis(3),
            GameDuration::from_nanos(3_000_000)
        );
        assert_eq!(
            GameDuration::from_std(std::time::Duration::from_millis(1500)),
            GameDuration::from_millis(1500)
        );
    }

    #[test]
    fn subtraction_goes_negative() {
        let left = GameDuration::from_secs(1).saturating_sub(GameDuration::from_secs(3));
        assert_eq!(left, GameDuration::from_secs(-2));
        assert!(!left.is_positive());
        assert_eq!(left.as_secs(), -2);
    }

    #[test]
    fn arithmetic_saturates() {
        let max = GameDuration::from_nanos(i64::MAX);
        assert_eq!(max.saturating_add(GameDuration::from_secs(1)), max);
        assert_eq!(GameDuration::from_secs(i64::MAX), max);
    }

    #[test]
    fn between_measures_wall_clock() {
        let start = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).single();
        let end = Utc.with_ymd_and_hms(2024, 7, 1, 12, 1, 30).single();
        let (Some(start), Some(end)) = (start, end) else {
            return;
        };
        assert_eq!(GameDuration::between(start, end), GameDuration::from_secs(90));
        assert_eq!(GameDuration::between(end, start), GameDuration::from_secs(-90));
    }

    #[test]
    fn serializes_as_integer_nanoseconds() {
        let json = serde_json::to_string(&GameDuration::from_millis(250));
        assert_eq!(json.ok().as_deref(), Some("250000000"));
        let back: Result<GameDuration, _> = serde_json::from_str("-5000000000");
        assert_eq!(back.ok(), Some(GameDuration::from_secs(-5)));
    }
}
