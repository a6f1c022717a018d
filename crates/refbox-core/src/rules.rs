//! Rules engine seam and a minimal default rule set.
//!
//! The controller never decides on its own whether an event is legal. It
//! hands every inbound [`MatchEvent`] to a [`RulesEngine`] together with a
//! working copy of the state. The engine either rejects the event or mutates
//! the copy and names the command (if any) that broadcast sinks should
//! forward to the teams.
//!
//! [`BasicRules`] covers the handful of transitions an operator needs to run
//! a match by hand: run-mode commands, timeouts, goals, cards, stage changes,
//! and a full reset.

use chrono::{DateTime, Utc};
use refbox_types::{
    CardKind, CommandKind, EventCommand, GameDuration, MatchEvent, MatchState, RunMode, Stage,
    StageOperation, Team, TriggerKind,
};

use crate::config::{GameConfig, StageTimes};

/// Reasons an event is illegal in the current state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// The command needs a team but none was given.
    #[error("{command:?} requires a team")]
    MissingTeam {
        /// The command.
        command: CommandKind,
    },

    /// The team is not part of the match state.
    #[error("unknown team {team:?}")]
    UnknownTeam {
        /// The team.
        team: Team,
    },

    /// The team has used all of its timeouts.
    #[error("{team:?} has no timeouts left")]
    NoTimeoutsLeft {
        /// The team.
        team: Team,
    },

    /// There is no stage in the requested direction.
    #[error("no stage {operation:?} of {stage:?}")]
    NoSuchStage {
        /// The current stage.
        stage: Stage,
        /// The requested direction.
        operation: StageOperation,
    },

    /// Play can not resume after the match has ended.
    #[error("match is over")]
    MatchOver,
}

/// Validates events and applies them to the match state.
pub trait RulesEngine: Send + Sync {
    /// Apply `event` to `state`.
    ///
    /// On success returns the command to broadcast, if any. On error `state`
    /// may have been partially modified; callers pass a working copy and
    /// discard it.
    fn process(
        &self,
        state: &mut MatchState,
        event: &MatchEvent,
        now: DateTime<Utc>,
    ) -> Result<Option<EventCommand>, RuleError>;
}

/// A minimal rule set driven entirely by operator input.
#[derive(Debug, Clone)]
pub struct BasicRules {
    stage_times: StageTimes,
    yellow_card_duration: GameDuration,
    overtime_timeouts: u32,
    overtime_timeout_time: GameDuration,
    initial_state: MatchState,
}

impl BasicRules {
    /// Build the rule set from the game configuration.
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            stage_times: config.stage_times(),
            yellow_card_duration: config.yellow_card_duration(),
            overtime_timeouts: config.overtime.timeouts,
            overtime_timeout_time: GameDuration::from_secs(i64::from(
                config.overtime.timeout_duration_secs,
            )),
            initial_state: config.initial_state(),
        }
    }

    fn process_command(
        state: &mut MatchState,
        command: EventCommand,
        now: DateTime<Utc>,
    ) -> Result<Option<EventCommand>, RuleError> {
        match command.command {
            CommandKind::Halt => set_run_mode(state, RunMode::Halted, None),
            CommandKind::Stop => set_run_mode(state, RunMode::Stopped, None),
            CommandKind::NormalStart | CommandKind::ForceStart => {
                if state.stage == Stage::PostGame {
                    return Err(RuleError::MatchOver);
                }
                set_run_mode(state, RunMode::Running, None);
                if state.match_start.is_none() {
                    state.match_start = Some(now);
                }
            }
            CommandKind::Timeout => {
                let team = required_team(command)?;
                let info = state
                    .team_mut(team)
                    .ok_or(RuleError::UnknownTeam { team })?;
                info.timeouts_left = info
                    .timeouts_left
                    .checked_sub(1)
                    .ok_or(RuleError::NoTimeoutsLeft { team })?;
                set_run_mode(state, RunMode::Timeout, Some(team));
            }
            CommandKind::Kickoff => {
                let team = required_team(command)?;
                set_run_mode(state, RunMode::Stopped, Some(team));
            }
            CommandKind::Goal => {
                let team = required_team(command)?;
                let info = state
                    .team_mut(team)
                    .ok_or(RuleError::UnknownTeam { team })?;
                info.goals = info.goals.saturating_add(1);
                set_run_mode(state, RunMode::Stopped, None);
            }
        }
        Ok(Some(command))
    }

    fn change_stage(
        &self,
        state: &mut MatchState,
        operation: StageOperation,
    ) -> Result<Option<EventCommand>, RuleError> {
        let target = match operation {
            StageOperation::Next => state.stage.next(),
            StageOperation::Previous => state.stage.previous(),
        }
        .ok_or(RuleError::NoSuchStage {
            stage: state.stage,
            operation,
        })?;

        state.stage = target;
        state.stage_time_elapsed = GameDuration::ZERO;
        state.stage_time_left = self.stage_times.get(target);
        set_run_mode(state, RunMode::Halted, None);

        if target == Stage::OvertimeFirstHalf && operation == StageOperation::Next {
            for info in state.teams.values_mut() {
                info.timeouts_left = self.overtime_timeouts;
                info.timeout_time_left = self.overtime_timeout_time;
            }
        }
        Ok(Some(EventCommand::neutral(CommandKind::Halt)))
    }
}

impl RulesEngine for BasicRules {
    fn process(
        &self,
        state: &mut MatchState,
        event: &MatchEvent,
        now: DateTime<Utc>,
    ) -> Result<Option<EventCommand>, RuleError> {
        match *event {
            MatchEvent::Command(command) => Self::process_command(state, command, now),
            MatchEvent::Card(card) => {
                let info = state
                    .team_mut(card.team)
                    .ok_or(RuleError::UnknownTeam { team: card.team })?;
                match card.card {
                    CardKind::Yellow => {
                        info.yellow_cards = info.yellow_cards.saturating_add(1);
                        info.yellow_card_times.push(self.yellow_card_duration);
                    }
                    CardKind::Red => info.red_cards = info.red_cards.saturating_add(1),
                }
                Ok(None)
            }
            MatchEvent::Stage(stage) => self.change_stage(state, stage.operation),
            MatchEvent::Trigger(trigger) => match trigger.trigger {
                TriggerKind::ResetMatch => {
                    state.clone_from(&self.initial_state);
                    Ok(Some(EventCommand::neutral(CommandKind::Halt)))
                }
            },
        }
    }
}

const fn set_run_mode(state: &mut MatchState, run_mode: RunMode, for_team: Option<Team>) {
    state.run_mode = run_mode;
    state.run_mode_for = for_team;
}

const fn required_team(command: EventCommand) -> Result<Team, RuleError> {
    match command.for_team {
        Some(team) => Ok(team),
        None => Err(RuleError::MissingTeam {
            command: command.command,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;
    use refbox_types::{EventCard, EventStage, EventTrigger};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 20, 14, 0, 0).single().unwrap()
    }

    fn rules() -> BasicRules {
        BasicRules::from_config(&GameConfig::default())
    }

    fn apply(
        rules: &BasicRules,
        state: &mut MatchState,
        event: MatchEvent,
    ) -> Result<Option<EventCommand>, RuleError> {
        rules.process(state, &event, now())
    }

    #[test]
    fn first_start_records_match_start() {
        let rules = rules();
        let mut state = GameConfig::default().initial_state();
        let cmd = EventCommand::neutral(CommandKind::NormalStart);

        let result = apply(&rules, &mut state, MatchEvent::Command(cmd)).unwrap();

        assert_eq!(result, Some(cmd));
        assert_eq!(state.run_mode, RunMode::Running);
        assert_eq!(state.match_start, Some(now()));
    }

    #[test]
    fn timeout_consumes_one_timeout() {
        let rules = rules();
        let mut state = GameConfig::default().initial_state();
        let cmd = EventCommand::for_team(CommandKind::Timeout, Team::Yellow);

        apply(&rules, &mut state, MatchEvent::Command(cmd)).unwrap();

        assert_eq!(state.run_mode, RunMode::Timeout);
        assert_eq!(state.run_mode_for, Some(Team::Yellow));
        assert_eq!(state.teams[&Team::Yellow].timeouts_left, 3);
        assert_eq!(state.teams[&Team::Blue].timeouts_left, 4);
    }

    #[test]
    fn timeout_without_budget_is_rejected() {
        let rules = rules();
        let mut state = GameConfig::default().initial_state();
        state.teams.get_mut(&Team::Blue).unwrap().timeouts_left = 0;
        let cmd = EventCommand::for_team(CommandKind::Timeout, Team::Blue);

        let result = apply(&rules, &mut state, MatchEvent::Command(cmd));
        assert_eq!(result, Err(RuleError::NoTimeoutsLeft { team: Team::Blue }));
    }

    #[test]
    fn team_commands_require_a_team() {
        let rules = rules();
        let mut state = MatchState::default();
        let result = apply(
            &rules,
            &mut state,
            MatchEvent::Command(EventCommand::neutral(CommandKind::Goal)),
        );
        assert_eq!(
            result,
            Err(RuleError::MissingTeam {
                command: CommandKind::Goal
            })
        );
    }

    #[test]
    fn yellow_card_appends_a_timer_and_broadcasts_nothing() {
        let rules = rules();
        let mut state = GameConfig::default().initial_state();
        let card = MatchEvent::Card(EventCard {
            team: Team::Blue,
            card: CardKind::Yellow,
        });

        assert_eq!(apply(&rules, &mut state, card).unwrap(), None);
        assert_eq!(apply(&rules, &mut state, card).unwrap(), None);

        let blue = &state.teams[&Team::Blue];
        assert_eq!(blue.yellow_cards, 2);
        assert_eq!(
            blue.yellow_card_times,
            vec![GameDuration::from_secs(120), GameDuration::from_secs(120)]
        );
    }

    #[test]
    fn next_stage_loads_the_scheduled_duration() {
        let rules = rules();
        let mut state = GameConfig::default().initial_state();
        state.run_mode = RunMode::Running;
        state.stage_time_elapsed = GameDuration::from_secs(12);
        let next = MatchEvent::Stage(EventStage {
            operation: StageOperation::Next,
        });

        let result = apply(&rules, &mut state, next).unwrap();

        assert_eq!(result, Some(EventCommand::neutral(CommandKind::Halt)));
        assert_eq!(state.stage, Stage::FirstHalf);
        assert_eq!(state.stage_time_elapsed, GameDuration::ZERO);
        assert_eq!(state.stage_time_left, GameDuration::from_secs(300));
        assert_eq!(state.run_mode, RunMode::Halted);
    }

    #[test]
    fn entering_overtime_resets_timeout_budget() {
        let rules = rules();
        let mut state = GameConfig::default().initial_state();
        state.stage = Stage::OvertimeBreak;
        state.teams.get_mut(&Team::Yellow).unwrap().timeouts_left = 0;
        let next = MatchEvent::Stage(EventStage {
            operation: StageOperation::Next,
        });

        apply(&rules, &mut state, next).unwrap();

        assert_eq!(state.stage, Stage::OvertimeFirstHalf);
        for info in state.teams.values() {
            assert_eq!(info.timeouts_left, 2);
            assert_eq!(info.timeout_time_left, GameDuration::from_secs(150));
        }
    }

    #[test]
    fn no_stage_before_pre_game() {
        let rules = rules();
        let mut state = MatchState::default();
        let prev = MatchEvent::Stage(EventStage {
            operation: StageOperation::Previous,
        });
        assert!(matches!(
            apply(&rules, &mut state, prev),
            Err(RuleError::NoSuchStage { .. })
        ));
    }

    #[test]
    fn start_after_post_game_is_rejected() {
        let rules = rules();
        let mut state = MatchState {
            stage: Stage::PostGame,
            ..MatchState::default()
        };
        let start = MatchEvent::Command(EventCommand::neutral(CommandKind::ForceStart));
        assert_eq!(apply(&rules, &mut state, start), Err(RuleError::MatchOver));
    }

    #[test]
    fn reset_restores_initial_state() {
        let rules = rules();
        let mut state = GameConfig::default().initial_state();
        state.stage = Stage::SecondHalf;
        state.teams.get_mut(&Team::Blue).unwrap().goals = 3;
        let reset = MatchEvent::Trigger(EventTrigger {
            trigger: TriggerKind::ResetMatch,
        });

        apply(&rules, &mut state, reset).unwrap();

        assert_eq!(state, GameConfig::default().initial_state());
    }
}
