//! Match clock, tick cycle, persistence, and orchestration for the Refbox
//! game controller.
//!
//! This crate owns the real-time core of the controller: the single
//! authoritative [`MatchState`](refbox_types::MatchState), the once-per-second
//! tick that advances it, the commit pipeline for inbound events, crash-safe
//! persistence, undo, and the publish fan-out contract.
//!
//! # Modules
//!
//! - [`clock`] -- Wall-clock aligned [`MatchClock`](clock::MatchClock)
//!   reporting measured tick deltas.
//! - [`config`] -- Configuration loading from `refbox-config.yaml` into
//!   strongly-typed structs, and the stage schedule.
//! - [`controller`] -- [`GameController`], the serialized owner of state,
//!   history, and persistence handles.
//! - [`history`] -- Undo history of committed states.
//! - [`persist`] -- Recovery snapshot and append-only audit log.
//! - [`publish`] -- [`StateSink`](publish::StateSink) trait and fan-out.
//! - [`rules`] -- [`RulesEngine`](rules::RulesEngine) seam and a basic rule set.
//! - [`runner`] -- The tick loop.
//! - [`tick`] -- Timer advancement applied on each tick.
//!
//! [`GameController`]: controller::GameController

pub mod clock;
pub mod config;
pub mod controller;
pub mod history;
pub mod persist;
pub mod publish;
pub mod rules;
pub mod runner;
pub mod tick;
