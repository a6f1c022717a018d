//! Match clock aligned to wall-clock seconds.
//!
//! The tick loop wakes once per wall-clock second boundary, but timers are
//! advanced by the interval actually measured since the previous wake-up.
//! Scheduling jitter therefore never accumulates into drift over a long
//! match: a late wake-up simply produces a slightly larger delta.
//!
//! Elapsed time is measured with [`tokio::time::Instant`] (monotonic, and
//! controllable from paused-time tests); alignment uses [`chrono::Utc`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use refbox_types::GameDuration;
use tokio::time::Instant;

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Source of tick timing for the controller.
#[derive(Debug, Clone)]
pub struct MatchClock {
    /// Monotonic instant of the previous [`delta`](Self::delta) call.
    last: Instant,
}

impl MatchClock {
    /// Start the clock. The first [`delta`](Self::delta) measures from now.
    pub fn start() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    /// Sleep until the next wall-clock second boundary.
    pub async fn wait_till_next_full_second(&self) {
        tokio::time::sleep(delay_until_next_second(Utc::now())).await;
    }

    /// Elapsed monotonic time since the previous call (or since start).
    pub fn delta(&mut self) -> GameDuration {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last);
        self.last = now;
        GameDuration::from_std(elapsed)
    }
}

/// Time from `now` until the next whole wall-clock second.
///
/// Exactly on a boundary this is a full second, so the loop never spins.
pub fn delay_until_next_second(now: DateTime<Utc>) -> Duration {
    // chrono reports leap seconds as a sub-second part >= 1e9.
    let subsec = now.timestamp_subsec_nanos().min(NANOS_PER_SEC.saturating_sub(1));
    Duration::from_nanos(u64::from(NANOS_PER_SEC.saturating_sub(subsec)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(nanos: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, nanos).single().unwrap()
    }

    #[test]
    fn delay_reaches_next_boundary() {
        assert_eq!(delay_until_next_second(at(250_000_000)), Duration::from_millis(750));
        assert_eq!(delay_until_next_second(at(999_999_999)), Duration::from_nanos(1));
    }

    #[test]
    fn delay_on_boundary_is_a_full_second() {
        assert_eq!(delay_until_next_second(at(0)), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn delta_reports_actual_elapsed_time() {
        let mut clock = MatchClock::start();
        tokio::time::advance(Duration::from_millis(1_020)).await;
        assert_eq!(clock.delta(), GameDuration::from_millis(1_020));
        tokio::time::advance(Duration::from_millis(980)).await;
        assert_eq!(clock.delta(), GameDuration::from_millis(980));
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_deltas_do_not_double_count() {
        let mut clock = MatchClock::start();
        tokio::time::advance(Duration::from_secs(2)).await;
        let first = clock.delta();
        let second = clock.delta();
        assert_eq!(first, GameDuration::from_secs(2));
        assert_eq!(second, GameDuration::ZERO);
    }
}
