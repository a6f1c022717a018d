//! Core match state structs.
//!
//! [`MatchState`] is the single authoritative record the controller
//! advances, persists, and publishes. It is cloned wholesale into the undo
//! history and the audit log, so it stays a plain data type with no
//! behaviour beyond small, pure helpers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::duration::GameDuration;
use crate::enums::{RunMode, Stage, Team};

// ---------------------------------------------------------------------------
// TeamInfo
// ---------------------------------------------------------------------------

/// Per-team bookkeeping: score, discipline, and timeout budget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TeamInfo {
    /// Display name of the team.
    pub name: String,
    /// Goals scored.
    pub goals: u32,
    /// Number of red cards received.
    pub red_cards: u32,
    /// Number of yellow cards received over the whole match.
    pub yellow_cards: u32,
    /// Remaining suspension time of each active yellow card, in issuance order.
    pub yellow_card_times: Vec<GameDuration>,
    /// Number of timeouts the team may still call.
    pub timeouts_left: u32,
    /// Remaining timeout time budget.
    pub timeout_time_left: GameDuration,
}

impl TeamInfo {
    /// Create a team with a fresh timeout budget and no cards.
    pub fn new(name: impl Into<String>, timeouts: u32, timeout_time: GameDuration) -> Self {
        Self {
            name: name.into(),
            timeouts_left: timeouts,
            timeout_time_left: timeout_time,
            ..Self::default()
        }
    }

    /// Run every active yellow card down by `delta` and drop the expired ones.
    ///
    /// A card survives only while its remaining time stays strictly positive.
    /// Surviving cards keep their issuance order. Returns the number of cards
    /// that expired.
    pub fn expire_yellow_cards(&mut self, delta: GameDuration) -> usize {
        let before = self.yellow_card_times.len();
        self.yellow_card_times = self
            .yellow_card_times
            .iter()
            .map(|remaining| remaining.saturating_sub(delta))
            .filter(|remaining| remaining.is_positive())
            .collect();
        before.saturating_sub(self.yellow_card_times.len())
    }
}

// ---------------------------------------------------------------------------
// MatchState
// ---------------------------------------------------------------------------

/// The full, authoritative state of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MatchState {
    /// Current phase of the match schedule.
    pub stage: Stage,
    /// Current run mode.
    pub run_mode: RunMode,
    /// Team the run mode refers to (the team in timeout, the kicking team).
    pub run_mode_for: Option<Team>,
    /// Time played in the current stage.
    pub stage_time_elapsed: GameDuration,
    /// Time left in the current stage. Negative once the stage overruns.
    pub stage_time_left: GameDuration,
    /// Wall-clock time since the match started. Zero until it starts.
    pub match_duration: GameDuration,
    /// Instant the match was started, if it has been.
    pub match_start: Option<DateTime<Utc>>,
    /// Per-team bookkeeping.
    pub teams: BTreeMap<Team, TeamInfo>,
}

impl MatchState {
    /// Create a halted pre-game state with both teams set up from `template`.
    pub fn new(template: &TeamInfo) -> Self {
        let teams = Team::ALL
            .into_iter()
            .map(|team| (team, template.clone()))
            .collect();
        Self {
            stage: Stage::PreGame,
            run_mode: RunMode::Halted,
            run_mode_for: None,
            stage_time_elapsed: GameDuration::ZERO,
            stage_time_left: GameDuration::ZERO,
            match_duration: GameDuration::ZERO,
            match_start: None,
            teams,
        }
    }

    /// Look up a team's info.
    pub fn team(&self, team: Team) -> Option<&TeamInfo> {
        self.teams.get(&team)
    }

    /// Look up a team's info mutably.
    pub fn team_mut(&mut self, team: Team) -> Option<&mut TeamInfo> {
        self.teams.get_mut(&team)
    }
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new(&TeamInfo::default())
    }
}
