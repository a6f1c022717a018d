//! Tick cycle: per-second advancement of the match timers.
//!
//! Each tick applies the measured elapsed interval to the [`MatchState`]:
//!
//! 1. **Running** -- stage time elapsed grows and stage time left shrinks by
//!    the same delta (stage time left may go negative; ending the stage is
//!    the rules engine's job). Every active yellow card of every team runs
//!    down, and cards that reach zero are dropped.
//!
//! 2. **Timeout** -- only the timeout budget of the team in timeout runs down.
//!
//! 3. **Match duration** -- once the match has a start instant, the total
//!    duration is recomputed from the wall clock.
//!
//! In every other run mode the stage, card, and timeout timers are frozen.
//! The tick never touches the undo history and never persists; publishing
//! the result is up to the caller.

use chrono::{DateTime, Utc};
use refbox_types::{GameDuration, MatchState, RunMode};

/// Summary of a single tick's effect on the match state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    /// The delta that was applied.
    pub delta: GameDuration,
    /// Run mode during this tick.
    pub run_mode: RunMode,
    /// Number of yellow cards that expired this tick, across both teams.
    pub cards_expired: usize,
}

/// Advance `state` by `delta`, observing the wall-clock instant `now`.
pub fn advance_timers(
    state: &mut MatchState,
    delta: GameDuration,
    now: DateTime<Utc>,
) -> TickSummary {
    let mut cards_expired: usize = 0;

    match state.run_mode {
        RunMode::Running => {
            state.stage_time_elapsed = state.stage_time_elapsed.saturating_add(delta);
            state.stage_time_left = state.stage_time_left.saturating_sub(delta);

            for info in state.teams.values_mut() {
                cards_expired = cards_expired.saturating_add(info.expire_yellow_cards(delta));
            }
        }
        RunMode::Timeout => {
            if let Some(info) = state.run_mode_for.and_then(|team| state.teams.get_mut(&team)) {
                info.timeout_time_left = info.timeout_time_left.saturating_sub(delta);
            }
        }
        RunMode::Halted | RunMode::Stopped => {}
    }

    if let Some(start) = state.match_start {
        state.match_duration = GameDuration::between(start, now);
    }

    TickSummary {
        delta,
        run_mode: state.run_mode,
        cards_expired,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;
    use refbox_types::{Team, TeamInfo};

    use super::*;

    fn secs(s: i64) -> GameDuration {
        GameDuration::from_secs(s)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 20, 14, 0, 0).single().unwrap()
    }

    fn state_with(run_mode: RunMode) -> MatchState {
        let mut state = MatchState::new(&TeamInfo::new("Team", 4, secs(300)));
        state.run_mode = run_mode;
        state.stage_time_left = secs(600);
        state
    }

    #[test]
    fn running_moves_stage_timers_in_lockstep() {
        let mut state = state_with(RunMode::Running);
        let delta = GameDuration::from_millis(1_037);
        advance_timers(&mut state, delta, now());
        assert_eq!(state.stage_time_elapsed, delta);
        assert_eq!(state.stage_time_left, secs(600).saturating_sub(delta));
        assert_eq!(
            state.stage_time_elapsed.saturating_add(state.stage_time_left),
            secs(600)
        );
    }

    #[test]
    fn stage_time_left_goes_negative() {
        let mut state = state_with(RunMode::Running);
        state.stage_time_left = secs(1);
        advance_timers(&mut state, secs(3), now());
        assert_eq!(state.stage_time_left, secs(-2));
    }

    #[test]
    fn halted_and_stopped_freeze_timers() {
        for mode in [RunMode::Halted, RunMode::Stopped] {
            let mut state = state_with(mode);
            state.teams.get_mut(&Team::Yellow).unwrap().yellow_card_times = vec![secs(5)];
            let before = state.clone();
            let summary = advance_timers(&mut state, secs(10), now());
            assert_eq!(state, before);
            assert_eq!(summary.cards_expired, 0);
        }
    }

    #[test]
    fn cards_expire_only_when_reaching_zero() {
        let mut state = state_with(RunMode::Running);
        state.teams.get_mut(&Team::Yellow).unwrap().yellow_card_times =
            vec![secs(3), secs(1), secs(2)];
        state.teams.get_mut(&Team::Blue).unwrap().yellow_card_times = vec![secs(1)];

        let summary = advance_timers(&mut state, secs(1), now());

        assert_eq!(summary.cards_expired, 2);
        assert_eq!(
            state.teams[&Team::Yellow].yellow_card_times,
            vec![secs(2), secs(1)]
        );
        assert!(state.teams[&Team::Blue].yellow_card_times.is_empty());
    }

    #[test]
    fn timeout_only_charges_the_team_in_timeout() {
        let mut state = state_with(RunMode::Timeout);
        state.run_mode_for = Some(Team::Blue);
        state.teams.get_mut(&Team::Yellow).unwrap().yellow_card_times = vec![secs(30)];

        advance_timers(&mut state, secs(2), now());

        assert_eq!(state.teams[&Team::Blue].timeout_time_left, secs(298));
        assert_eq!(state.teams[&Team::Yellow].timeout_time_left, secs(300));
        assert_eq!(state.teams[&Team::Yellow].yellow_card_times, vec![secs(30)]);
        assert_eq!(state.stage_time_elapsed, GameDuration::ZERO);
    }

    #[test]
    fn timeout_without_team_changes_nothing() {
        let mut state = state_with(RunMode::Timeout);
        let before = state.clone();
        advance_timers(&mut state, secs(2), now());
        assert_eq!(state, before);
    }

    #[test]
    fn match_duration_tracks_wall_clock_once_started() {
        let mut state = state_with(RunMode::Halted);
        advance_timers(&mut state, secs(1), now());
        assert_eq!(state.match_duration, GameDuration::ZERO);

        let start = Utc.with_ymd_and_hms(2024, 7, 20, 13, 50, 0).single().unwrap();
        state.match_start = Some(start);
        advance_timers(&mut state, secs(1), now());
        assert_eq!(state.match_duration, secs(600));
    }

    #[test]
    fn five_second_then_card_expiry_scenario() {
        let mut state = state_with(RunMode::Running);
        state.teams.get_mut(&Team::Yellow).unwrap().yellow_card_times = vec![secs(120)];

        for _ in 0..5 {
            advance_timers(&mut state, secs(1), now());
        }
        assert_eq!(state.stage_time_elapsed, secs(5));
        assert_eq!(state.stage_time_left, secs(595));
        assert_eq!(state.teams[&Team::Yellow].yellow_card_times, vec![secs(115)]);

        for _ in 5..119 {
            advance_timers(&mut state, secs(1), now());
        }
        assert_eq!(state.teams[&Team::Yellow].yellow_card_times, vec![secs(1)]);

        advance_timers(&mut state, secs(1), now());
        assert!(state.teams[&Team::Yellow].yellow_card_times.is_empty());

        for _ in 120..125 {
            advance_timers(&mut state, secs(1), now());
        }
        assert_eq!(state.stage_time_elapsed, secs(125));
        assert!(state.teams[&Team::Yellow].yellow_card_times.is_empty());
    }
}
