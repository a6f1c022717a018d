//! Shared application state for the Observer API server.
//!
//! [`StateHub`] is the session-oriented publish sink: the controller pushes
//! every published snapshot into a [`watch`] channel, and each `WebSocket`
//! session reads the newest value from it. A slow client never blocks the
//! controller and never queues stale frames; it simply skips ahead.
//!
//! [`AppState`] bundles the hub with an optional handle to the
//! [`GameController`] for the write endpoints.

use std::sync::Arc;

use refbox_core::controller::GameController;
use refbox_core::publish::StateSink;
use refbox_types::{EventCommand, MatchState};
use tokio::sync::watch;

/// One published snapshot as seen by viewers.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PublishedState {
    /// Monotonic publish counter, starting at 0 for the seed value.
    pub revision: u64,
    /// The command that accompanied the publish, if any.
    pub command: Option<EventCommand>,
    /// The full match state.
    pub state: MatchState,
}

/// Latest-value fan-out to live viewers.
#[derive(Debug)]
pub struct StateHub {
    tx: watch::Sender<PublishedState>,
}

impl StateHub {
    /// Create a hub seeded with `initial` at revision 0.
    pub fn new(initial: MatchState) -> Self {
        let (tx, _rx) = watch::channel(PublishedState {
            revision: 0,
            command: None,
            state: initial,
        });
        Self { tx }
    }

    /// Subscribe to published snapshots.
    ///
    /// The receiver's current value counts as seen; call
    /// [`watch::Receiver::borrow_and_update`] to read it.
    pub fn subscribe(&self) -> watch::Receiver<PublishedState> {
        self.tx.subscribe()
    }

    /// A copy of the newest snapshot.
    pub fn latest(&self) -> PublishedState {
        self.tx.borrow().clone()
    }

    /// Number of connected viewers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl StateSink for StateHub {
    fn name(&self) -> &'static str {
        "observer"
    }

    fn publish(&self, state: &MatchState, command: Option<&EventCommand>) {
        // send_modify stores the value even with no receivers attached.
        self.tx.send_modify(|published| {
            published.revision = published.revision.saturating_add(1);
            published.command = command.copied();
            published.state.clone_from(state);
        });
    }
}

/// Shared state passed to every Axum handler.
pub struct AppState {
    /// Latest published snapshot and its subscribers.
    pub hub: Arc<StateHub>,
    /// The controller, absent when the server runs view-only.
    pub controller: Option<Arc<GameController>>,
}

impl AppState {
    /// Create application state around `hub`, optionally with a controller.
    pub const fn new(hub: Arc<StateHub>, controller: Option<Arc<GameController>>) -> Self {
        Self { hub, controller }
    }

    /// The controller, or [`ObserverError::Unavailable`] in view-only mode.
    ///
    /// [`ObserverError::Unavailable`]: crate::error::ObserverError::Unavailable
    pub fn controller(&self) -> Result<Arc<GameController>, crate::error::ObserverError> {
        self.controller
            .as_ref()
            .map(Arc::clone)
            .ok_or(crate::error::ObserverError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use refbox_types::{CommandKind, RunMode};

    use super::*;

    #[test]
    fn publish_bumps_revision_and_keeps_command() {
        let hub = StateHub::new(MatchState::default());
        let mut rx = hub.subscribe();
        assert_eq!(rx.borrow_and_update().revision, 0);

        let mut state = MatchState::default();
        state.run_mode = RunMode::Stopped;
        let command = EventCommand::neutral(CommandKind::Stop);
        hub.publish(&state, Some(&command));

        assert!(rx.has_changed().unwrap_or(false));
        let latest = rx.borrow_and_update().clone();
        assert_eq!(latest.revision, 1);
        assert_eq!(latest.command, Some(command));
        assert_eq!(latest.state.run_mode, RunMode::Stopped);
    }

    #[test]
    fn publish_without_viewers_still_updates_latest() {
        let hub = StateHub::new(MatchState::default());
        assert_eq!(hub.receiver_count(), 0);

        hub.publish(&MatchState::default(), None);
        hub.publish(&MatchState::default(), None);

        let latest = hub.latest();
        assert_eq!(latest.revision, 2);
        assert_eq!(latest.command, None);
    }
}
