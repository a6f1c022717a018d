//! Operator and live-viewer server for the Refbox game controller.
//!
//! This crate provides an Axum HTTP server with REST endpoints and a
//! `WebSocket` stream. It is the session-oriented publish sink: the
//! [`StateHub`](state::StateHub) registered with the controller's fan-out
//! keeps the newest snapshot, and each viewer session reads from it at its
//! own pace.
//!
//! # Modules
//!
//! - [`error`] -- Observer-specific error types with Axum response conversion.
//! - [`handlers`] -- Status page, state reads, event submission.
//! - [`operator`] -- Undo and forced publish.
//! - [`router`] -- Route table construction.
//! - [`server`] -- Server startup and lifecycle.
//! - [`state`] -- [`StateHub`](state::StateHub) and shared handler state.
//! - [`ws`] -- `WebSocket` state streaming.

pub mod error;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;
