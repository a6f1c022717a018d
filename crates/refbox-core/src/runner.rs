//! Tick loop driving the controller from the match clock.
//!
//! [`run_clock`] wakes at every wall-clock second boundary, measures the
//! interval since the previous wake-up, and ticks the controller (which also
//! publishes the heartbeat). It runs for the lifetime of the process; the
//! binary stops it by dropping the future on shutdown. A fatal persistence
//! failure inside the controller ends the loop with an error.
//!
//! The controller lock is a blocking mutex that can be held across a disk
//! flush, so each tick runs on the blocking pool rather than on a runtime
//! worker.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, trace};

use crate::clock::MatchClock;
use crate::controller::{ControllerError, GameController};

/// Errors that end the tick loop.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The controller stopped after a fatal failure.
    #[error("controller error: {source}")]
    Controller {
        /// The underlying controller error.
        #[from]
        source: ControllerError,
    },

    /// The blocking tick task panicked or was cancelled.
    #[error("tick task failed: {source}")]
    Join {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },
}

/// Tick `controller` once per second.
///
/// With `max_ticks` set the loop returns after that many ticks; `None` runs
/// until the future is dropped. Returns the number of ticks executed.
pub async fn run_clock(
    controller: Arc<GameController>,
    mut clock: MatchClock,
    max_ticks: Option<u64>,
) -> Result<u64, RunnerError> {
    let mut ticks: u64 = 0;
    info!(max_ticks, "Match clock started");

    loop {
        if max_ticks.is_some_and(|max| ticks >= max) {
            return Ok(ticks);
        }

        clock.wait_till_next_full_second().await;
        let delta = clock.delta();
        let ticking = Arc::clone(&controller);
        let (summary, health) = tokio::task::spawn_blocking(move || {
            let summary = ticking.tick(delta, Utc::now());
            (summary, ticking.check_health())
        })
        .await?;
        ticks = ticks.saturating_add(1);
        trace!(
            delta_ms = summary.delta.as_millis(),
            run_mode = ?summary.run_mode,
            "Tick"
        );

        health?;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use refbox_types::{CommandKind, EventCommand, MatchEvent, MatchState};

    use super::*;
    use crate::config::GameConfig;
    use crate::persist::StateStore;
    use crate::publish::testing::RecordingSink;
    use crate::publish::{FanOut, StateSink};
    use crate::rules::BasicRules;

    fn controller(dir: &std::path::Path, sink: &Arc<RecordingSink>) -> Arc<GameController> {
        let started = Utc.with_ymd_and_hms(2024, 7, 20, 14, 0, 0).single().unwrap();
        let store = StateStore::open(dir, "lastState.json", started).unwrap();
        let fan_out = FanOut::new().with_sink(Arc::clone(sink) as Arc<dyn StateSink>);
        Arc::new(GameController::new(
            MatchState::default(),
            store,
            Arc::new(BasicRules::from_config(&GameConfig::default())),
            fan_out,
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn each_tick_publishes_one_heartbeat() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let controller = controller(tmp.path(), &sink);

        let ticks = run_clock(Arc::clone(&controller), MatchClock::start(), Some(3))
            .await
            .unwrap();

        assert_eq!(ticks, 3);
        let calls = sink.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|(_, command)| command.is_none()));
        assert_eq!(controller.history_len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_tick_limit_returns_immediately() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let controller = controller(tmp.path(), &sink);

        let ticks = run_clock(controller, MatchClock::start(), Some(0)).await.unwrap();

        assert_eq!(ticks, 0);
        assert!(sink.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_persistence_failure_ends_the_loop_after_one_tick() {
        let tmp = tempfile::tempdir().unwrap();
        let started = Utc.with_ymd_and_hms(2024, 7, 20, 14, 0, 0).single().unwrap();
        let mut store = StateStore::open(tmp.path(), "lastState.json", started).unwrap();
        store.reopen_snapshot_read_only().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let fan_out = FanOut::new().with_sink(Arc::clone(&sink) as Arc<dyn StateSink>);
        let controller = Arc::new(GameController::new(
            MatchState::default(),
            store,
            Arc::new(BasicRules::from_config(&GameConfig::default())),
            fan_out,
        ));
        let start = MatchEvent::Command(EventCommand::neutral(CommandKind::ForceStart));
        assert!(controller.on_new_event(&start).is_err());

        let result = run_clock(Arc::clone(&controller), MatchClock::start(), Some(5)).await;

        assert!(matches!(
            result,
            Err(RunnerError::Controller {
                source: ControllerError::Failed { .. }
            })
        ));
        assert_eq!(sink.calls().len(), 1);
    }
}
