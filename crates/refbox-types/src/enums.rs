//! Enumeration types for the Refbox game controller.
//!
//! Teams, run modes, the stage schedule, and the vocabulary of inbound
//! referee commands.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

/// One of the two competing teams, identified by marker colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Team {
    /// The team playing with yellow markers.
    Yellow,
    /// The team playing with blue markers.
    Blue,
}

impl Team {
    /// Both teams, in a stable order.
    pub const ALL: [Self; 2] = [Self::Yellow, Self::Blue];
}

// ---------------------------------------------------------------------------
// Run mode
// ---------------------------------------------------------------------------

/// Top-level status of play.
///
/// The rules engine owns transitions between run modes; the tick loop only
/// reads it to decide which timers advance.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum RunMode {
    /// All robots must stop immediately. No timer advances.
    #[default]
    Halted,
    /// Robots must keep distance from the ball. No timer advances.
    Stopped,
    /// Play is live. Stage and yellow card timers advance.
    Running,
    /// A team has called a timeout. Only that team's timeout budget advances.
    Timeout,
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// A named phase of the match schedule.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum Stage {
    /// Before kickoff of the first half.
    #[default]
    PreGame,
    /// First half of regulation time.
    FirstHalf,
    /// Break between the regulation halves.
    HalfTime,
    /// Second half of regulation time.
    SecondHalf,
    /// Break before overtime.
    OvertimeBreak,
    /// First half of overtime.
    OvertimeFirstHalf,
    /// Break between the overtime halves.
    OvertimeHalfTime,
    /// Second half of overtime.
    OvertimeSecondHalf,
    /// Break before the penalty shootout.
    ShootoutBreak,
    /// Penalty shootout.
    Shootout,
    /// The match is over.
    PostGame,
}

impl Stage {
    /// Every stage in schedule order.
    pub const ALL: [Self; 11] = [
        Self::PreGame,
        Self::FirstHalf,
        Self::HalfTime,
        Self::SecondHalf,
        Self::OvertimeBreak,
        Self::OvertimeFirstHalf,
        Self::OvertimeHalfTime,
        Self::OvertimeSecondHalf,
        Self::ShootoutBreak,
        Self::Shootout,
        Self::PostGame,
    ];

    /// The stage that follows this one, or `None` after [`Stage::PostGame`].
    pub fn next(self) -> Option<Self> {
        let idx = Self::ALL.iter().position(|s| *s == self)?;
        Self::ALL.get(idx.checked_add(1)?).copied()
    }

    /// The stage that precedes this one, or `None` before [`Stage::PreGame`].
    pub fn previous(self) -> Option<Self> {
        let idx = Self::ALL.iter().position(|s| *s == self)?;
        Self::ALL.get(idx.checked_sub(1)?).copied()
    }
}

// ---------------------------------------------------------------------------
// Inbound event vocabulary
// ---------------------------------------------------------------------------

/// A referee command that changes the run mode or announces a situation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum CommandKind {
    /// Halt all robots.
    Halt,
    /// Stop play; robots keep distance from the ball.
    Stop,
    /// Resume play after a prepared set piece.
    NormalStart,
    /// Resume play immediately.
    ForceStart,
    /// Start a timeout for the given team.
    Timeout,
    /// Prepare a kickoff for the given team.
    Kickoff,
    /// Award a goal to the given team.
    Goal,
}

/// Disciplinary card type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum CardKind {
    /// Temporary suspension of one robot.
    Yellow,
    /// Permanent removal of one robot.
    Red,
}

/// Direction of a manual stage change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum StageOperation {
    /// Advance to the next stage.
    Next,
    /// Go back to the previous stage.
    Previous,
}

/// Operator triggers that are not referee commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum TriggerKind {
    /// Discard the current match and start from a fresh state.
    ResetMatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_schedule_walks_forward_and_back() {
        assert_eq!(Stage::PreGame.next(), Some(Stage::FirstHalf));
        assert_eq!(Stage::SecondHalf.next(), Some(Stage::OvertimeBreak));
        assert_eq!(Stage::PostGame.next(), None);
        assert_eq!(Stage::FirstHalf.previous(), Some(Stage::PreGame));
        assert_eq!(Stage::PreGame.previous(), None);
    }
}
