//! The game controller: single owner of the authoritative match state.
//!
//! [`GameController`] serializes every mutation of the match. One mutex
//! guards the state, the undo history, and the open persistence files
//! together, and each of the following runs entirely inside it:
//!
//! - a tick and its heartbeat publish;
//! - an event commit (rules, history append, snapshot rewrite, audit append)
//!   and its publish;
//! - an undo.
//!
//! A tick therefore never observes a half-committed event, and two commits
//! never interleave their history appends. Nothing inside the critical
//! section waits on the network: sinks only enqueue. The synchronous disk
//! flush is the one deliberate exception.
//!
//! The controller is an explicit instance shared through [`Arc`]; there is
//! no global.
//!
//! [`Arc`]: std::sync::Arc

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use refbox_types::{EventCommand, GameDuration, MatchEvent, MatchState};
use tracing::{debug, error, info, warn};

use crate::history::StateHistory;
use crate::persist::{PersistError, StateStore};
use crate::publish::FanOut;
use crate::rules::{RuleError, RulesEngine};
use crate::tick::{self, TickSummary};

/// Errors returned by controller operations.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// A fatal persistence failure occurred during this call.
    #[error("persistence failure: {source}")]
    Persist {
        /// The underlying persistence error.
        #[from]
        source: PersistError,
    },

    /// An earlier fatal failure stopped the controller.
    #[error("controller stopped after a fatal failure: {reason}")]
    Failed {
        /// Description of the original failure.
        reason: String,
    },
}

/// What happened to a submitted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// The event was applied, persisted, and published.
    Committed {
        /// The command forwarded to broadcast sinks.
        command: Option<EventCommand>,
    },
    /// The rules engine refused the event. Nothing changed.
    Rejected(RuleError),
}

/// State guarded by the controller's mutex.
#[derive(Debug)]
struct Inner {
    state: MatchState,
    history: StateHistory,
    store: StateStore,
    failure: Option<String>,
}

impl Inner {
    fn ensure_healthy(&self) -> Result<(), ControllerError> {
        match &self.failure {
            Some(reason) => Err(ControllerError::Failed {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn fail(&mut self, err: PersistError) -> ControllerError {
        error!(error = %err, "Fatal persistence failure, refusing further commits");
        self.failure = Some(err.to_string());
        ControllerError::from(err)
    }

    /// Persist the current state as a commit.
    fn save_state(&mut self) -> Result<(), ControllerError> {
        if let Err(err) = self.store.save_latest_state(&self.state) {
            return Err(self.fail(err));
        }
        self.history.push(self.state.clone());
        self.store.append_history(&self.state);
        Ok(())
    }
}

/// Authoritative match controller.
pub struct GameController {
    inner: Mutex<Inner>,
    rules: Arc<dyn RulesEngine>,
    fan_out: FanOut,
}

impl GameController {
    /// Create a controller starting from `initial`.
    ///
    /// The initial state is the first history entry, so the first commit
    /// can be undone.
    pub fn new(
        initial: MatchState,
        store: StateStore,
        rules: Arc<dyn RulesEngine>,
        fan_out: FanOut,
    ) -> Self {
        let mut history = StateHistory::new();
        history.push(initial.clone());
        Self {
            inner: Mutex::new(Inner {
                state: initial,
                history,
                store,
                failure: None,
            }),
            rules,
            fan_out,
        }
    }

    /// Create a controller from the recovery snapshot in `store`.
    ///
    /// An empty snapshot starts from `fresh`. An oversized or undecodable
    /// snapshot is an error: starting from a possibly corrupt record is
    /// worse than not starting.
    pub fn recover(
        mut store: StateStore,
        max_snapshot_bytes: usize,
        fresh: MatchState,
        rules: Arc<dyn RulesEngine>,
        fan_out: FanOut,
    ) -> Result<Self, PersistError> {
        let initial = match store.read_last_state(max_snapshot_bytes)? {
            Some(state) => {
                info!(
                    path = %store.last_state_path().display(),
                    stage = ?state.stage,
                    run_mode = ?state.run_mode,
                    "Recovered match state"
                );
                state
            }
            None => {
                info!("No recovery snapshot, starting a fresh match");
                fresh
            }
        };
        Ok(Self::new(initial, store, rules, fan_out))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic mid-section leaves the state as consistent as the last
        // completed statement; keep serving rather than cascade the panic.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advance the timers by `delta` and publish a heartbeat.
    pub fn tick(&self, delta: GameDuration, now: DateTime<Utc>) -> TickSummary {
        let mut inner = self.lock();
        let summary = tick::advance_timers(&mut inner.state, delta, now);
        if summary.cards_expired > 0 {
            debug!(cards_expired = summary.cards_expired, "Yellow cards expired");
        }
        self.fan_out.publish(&inner.state, None);
        summary
    }

    /// Validate and apply an inbound event.
    ///
    /// A rejected event changes nothing and publishes nothing. An accepted
    /// event is committed (history, recovery snapshot, audit log) and then
    /// published exactly once with its resulting command.
    pub fn on_new_event(&self, event: &MatchEvent) -> Result<EventOutcome, ControllerError> {
        let mut inner = self.lock();
        inner.ensure_healthy()?;

        let mut working = inner.state.clone();
        let command = match self.rules.process(&mut working, event, Utc::now()) {
            Ok(command) => command,
            Err(err) => {
                warn!(?event, error = %err, "Could not process event");
                return Ok(EventOutcome::Rejected(err));
            }
        };

        inner.state = working;
        inner.save_state()?;
        info!(
            ?event,
            ?command,
            history_len = inner.history.len(),
            "Event committed"
        );

        self.fan_out.publish(&inner.state, command.as_ref());
        Ok(EventOutcome::Committed { command })
    }

    /// Publish the current state without changing it.
    pub fn publish(&self, command: Option<&EventCommand>) {
        let inner = self.lock();
        self.fan_out.publish(&inner.state, command);
    }

    /// Commit the current state: append it to the history and write both
    /// persistence files.
    pub fn save_state(&self) -> Result<(), ControllerError> {
        let mut inner = self.lock();
        inner.ensure_healthy()?;
        inner.save_state()
    }

    /// Restore the state before the last committed action.
    ///
    /// See [`StateHistory::undo_last_action`] for the exact semantics.
    /// Returns `false` when there was nothing to undo. After a successful
    /// undo the recovery snapshot is rewritten and the restored state is
    /// published as a heartbeat.
    pub fn undo_last_action(&self) -> Result<bool, ControllerError> {
        let mut inner = self.lock();
        inner.ensure_healthy()?;

        let Some(restored) = inner.history.undo_last_action() else {
            debug!("Nothing to undo");
            return Ok(false);
        };
        inner.state = restored;

        let Inner { state, store, .. } = &mut *inner;
        if let Err(err) = store.save_latest_state(state) {
            return Err(inner.fail(err));
        }
        info!(history_len = inner.history.len(), "Last action undone");

        self.fan_out.publish(&inner.state, None);
        Ok(true)
    }

    /// A copy of the current state.
    pub fn state(&self) -> MatchState {
        self.lock().state.clone()
    }

    /// Number of entries in the undo history.
    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }

    /// Fail if an earlier fatal error stopped the controller.
    pub fn check_health(&self) -> Result<(), ControllerError> {
        self.lock().ensure_healthy()
    }
}
