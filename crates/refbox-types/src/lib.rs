//! Shared type definitions for the Refbox game controller.
//!
//! This crate is the single source of truth for the match data model used
//! across the workspace. Types defined here flow downstream to `TypeScript`
//! via `ts-rs` for the operator UI.
//!
//! # Modules
//!
//! - [`duration`] -- Signed nanosecond [`GameDuration`] used by all timers
//! - [`enums`] -- Teams, run modes, stages, and the command vocabulary
//! - [`structs`] -- [`MatchState`] and [`TeamInfo`]
//! - [`events`] -- Inbound [`MatchEvent`]s and resulting [`EventCommand`]s

pub mod duration;
pub mod enums;
pub mod events;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use duration::GameDuration;
pub use enums::{CardKind, CommandKind, RunMode, Stage, StageOperation, Team, TriggerKind};
pub use events::{EventCard, EventCommand, EventStage, EventTrigger, MatchEvent};
pub use structs::{MatchState, TeamInfo};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the operator UI.

    #[test]
    fn export_bindings() {
        // ts-rs writes the bindings into `bindings/` relative to the crate
        // root when `export_all` is called.
        use ts_rs::TS;

        let _ = crate::duration::GameDuration::export_all();

        let _ = crate::enums::Team::export_all();
        let _ = crate::enums::RunMode::export_all();
        let _ = crate::enums::Stage::export_all();
        let _ = crate::enums::CommandKind::export_all();
        let _ = crate::enums::CardKind::export_all();
        let _ = crate::enums::StageOperation::export_all();
        let _ = crate::enums::TriggerKind::export_all();

        let _ = crate::structs::TeamInfo::export_all();
        let _ = crate::structs::MatchState::export_all();

        let _ = crate::events::EventCommand::export_all();
        let _ = crate::events::EventCard::export_all();
        let _ = crate::events::EventStage::export_all();
        let _ = crate::events::EventTrigger::export_all();
        let _ = crate::events::MatchEvent::export_all();
    }
}
