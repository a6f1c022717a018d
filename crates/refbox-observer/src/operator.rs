//! Operator REST API handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/operator/undo` | Restore the state before the last action |
//! | `POST` | `/api/operator/publish` | Re-publish the current state |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use tracing::info;

use crate::error::ObserverError;
use crate::state::AppState;

/// Generic response body for operator actions.
#[derive(Debug, serde::Serialize)]
pub struct OperatorResponse {
    /// Whether the action changed anything.
    pub ok: bool,
    /// Human-readable status message.
    pub message: String,
}

/// Undo the last committed action.
///
/// Responds with `ok: false` when the history has nothing to undo.
pub async fn undo(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ObserverError> {
    let controller = state.controller()?;

    let undone = tokio::task::spawn_blocking(move || controller.undo_last_action())
        .await
        .map_err(|e| ObserverError::Internal(format!("undo task failed: {e}")))?
        .map_err(|e| ObserverError::Internal(e.to_string()))?;

    let message = if undone {
        info!("Operator undid the last action");
        String::from("Last action undone")
    } else {
        String::from("Nothing to undo")
    };

    Ok(Json(OperatorResponse {
        ok: undone,
        message,
    }))
}

/// Publish the current state to every sink without changing it.
pub async fn publish(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let controller = state.controller()?;

    tokio::task::spawn_blocking(move || controller.publish(None))
        .await
        .map_err(|e| ObserverError::Internal(format!("publish task failed: {e}")))?;
    info!("Operator forced a publish");

    Ok(Json(OperatorResponse {
        ok: true,
        message: String::from("State published"),
    }))
}
