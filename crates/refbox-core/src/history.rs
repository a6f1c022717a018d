//! Undo history of committed match states.
//!
//! One full [`MatchState`] snapshot is appended for every committed event
//! (never for ticks). The only operation that shrinks the history is
//! [`StateHistory::undo_last_action`].

use refbox_types::MatchState;

/// Ordered, append-only record of committed states.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateHistory {
    entries: Vec<MatchState>,
}

impl StateHistory {
    /// Create an empty history.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record a committed state.
    pub fn push(&mut self, state: MatchState) {
        self.entries.push(state);
    }

    /// Number of recorded states.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been committed yet.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All recorded states, oldest first.
    pub fn entries(&self) -> &[MatchState] {
        &self.entries
    }

    /// Step back to the state before the last committed one.
    ///
    /// With entries `[S0 .. Sn]` this returns `S(n-1)` for the caller to
    /// restore and truncates the history to `[S0 .. S(n-2)]`: both the last
    /// entry and the one being restored are removed. With fewer than two
    /// entries nothing changes and `None` is returned.
    pub fn undo_last_action(&mut self) -> Option<MatchState> {
        let restore_index = self.entries.len().checked_sub(2)?;
        self.entries.truncate(restore_index.saturating_add(1));
        self.entries.pop()
    }
}

#[cfg(test)]
mod tests {
    use refbox_types::{GameDuration, TeamInfo};

    use super::*;

    fn state(marker: i64) -> MatchState {
        let mut state = MatchState::new(&TeamInfo::default());
        state.stage_time_elapsed = GameDuration::from_secs(marker);
        state
    }

    #[test]
    fn undo_pops_two_and_restores_the_older() {
        let mut history = StateHistory::new();
        history.push(state(0));
        history.push(state(1));
        history.push(state(2));

        let restored = history.undo_last_action();

        assert_eq!(restored, Some(state(1)));
        assert_eq!(history.entries(), &[state(0)]);
    }

    #[test]
    fn undo_with_two_entries_empties_history() {
        let mut history = StateHistory::new();
        history.push(state(0));
        history.push(state(1));

        assert_eq!(history.undo_last_action(), Some(state(0)));
        assert!(history.is_empty());
    }

    #[test]
    fn undo_with_one_entry_is_a_no_op() {
        let mut history = StateHistory::new();
        history.push(state(0));

        assert_eq!(history.undo_last_action(), None);
        assert_eq!(history.entries(), &[state(0)]);
    }

    #[test]
    fn undo_on_empty_history_is_a_no_op() {
        let mut history = StateHistory::new();
        assert_eq!(history.undo_last_action(), None);
        assert_eq!(history.len(), 0);
    }
}
