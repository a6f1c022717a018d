//! Inbound events and the resulting command descriptors.
//!
//! A [`MatchEvent`] is whatever an operator, autonomous referee, or team
//! submits to the controller. When the rules engine accepts an event it may
//! produce an [`EventCommand`] that broadcast sinks forward to the teams.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{CardKind, CommandKind, StageOperation, Team, TriggerKind};

/// A referee command, optionally addressed to one team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventCommand {
    /// The command.
    pub command: CommandKind,
    /// The team the command applies to, if any.
    #[serde(default)]
    pub for_team: Option<Team>,
}

impl EventCommand {
    /// A command that applies to nobody in particular.
    pub const fn neutral(command: CommandKind) -> Self {
        Self {
            command,
            for_team: None,
        }
    }

    /// A command addressed to `team`.
    pub const fn for_team(command: CommandKind, team: Team) -> Self {
        Self {
            command,
            for_team: Some(team),
        }
    }
}

/// A disciplinary card issued to a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventCard {
    /// The penalized team.
    pub team: Team,
    /// Card type.
    pub card: CardKind,
}

/// A manual stage change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventStage {
    /// Direction of the change.
    pub operation: StageOperation,
}

/// An operator trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventTrigger {
    /// The trigger.
    pub trigger: TriggerKind,
}

/// Any event a collaborator can submit to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum MatchEvent {
    /// A referee command.
    Command(EventCommand),
    /// A card.
    Card(EventCard),
    /// A stage change.
    Stage(EventStage),
    /// An operator trigger.
    Trigger(EventTrigger),
}
