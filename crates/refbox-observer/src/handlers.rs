//! REST API endpoint handlers for the Observer server.
//!
//! Reads are served from the [`StateHub`](crate::state::StateHub) so they
//! never contend with the tick loop. Event submission goes through the
//! controller on a blocking thread, since a commit writes to disk.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/state` | Newest published snapshot |
//! | `GET` | `/api/history` | Undo history length |
//! | `POST` | `/api/events` | Submit a match event |

use std::fmt::Write as _;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use refbox_core::controller::EventOutcome;
use refbox_types::{EventCommand, GameDuration, MatchEvent, Team};
use tracing::info;

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Response body for `GET /api/history`.
#[derive(Debug, serde::Serialize)]
pub struct HistoryResponse {
    /// Number of committed states held for undo.
    pub entries: usize,
}

/// Response body for a committed `POST /api/events`.
#[derive(Debug, serde::Serialize)]
pub struct EventResponse {
    /// Always `true`; rejections are reported as errors.
    pub ok: bool,
    /// The command produced by the commit, if any.
    pub command: Option<EventCommand>,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Format a signed duration as `[-]mm:ss`.
fn clock_face(duration: GameDuration) -> String {
    let secs = duration.as_secs();
    let abs = secs.unsigned_abs();
    let minutes = abs.checked_div(60).unwrap_or_default();
    let seconds = abs.checked_rem(60).unwrap_or_default();
    let sign = if secs < 0 { "-" } else { "" };
    format!("{sign}{minutes:02}:{seconds:02}")
}

/// Minimal HTML escaping for operator-supplied team names.
fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serve a minimal HTML page showing the match state and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let published = state.hub.latest();
    let snapshot = &published.state;
    let stage = format!("{:?}", snapshot.stage);
    let run_mode = format!("{:?}", snapshot.run_mode);
    let time_left = clock_face(snapshot.stage_time_left);
    let revision = published.revision;
    let mode = if state.controller.is_some() {
        "OPERATOR"
    } else {
        "VIEW ONLY"
    };

    let mut teams = String::new();
    for team in Team::ALL {
        if let Some(info) = snapshot.team(team) {
            let _ = write!(
                teams,
                r#"
        <div class="metric">
            <div class="label">{team:?}: {name}</div>
            <div class="value">{goals}</div>
            <div class="label">yellow {yellow} / red {red} / timeouts {timeouts}</div>
        </div>"#,
                name = escape_html(&info.name),
                goals = info.goals,
                yellow = info.yellow_cards,
                red = info.red_cards,
                timeouts = info.timeouts_left,
            );
        }
    }

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Refbox</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        .status {{ color: #3fb950; font-weight: bold; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Refbox</h1>
    <p class="subtitle">Match controller</p>

    <p>Mode: <span class="status">{mode}</span></p>

    <div>
        <div class="metric">
            <div class="label">Stage</div>
            <div class="value">{stage}</div>
        </div>
        <div class="metric">
            <div class="label">Run mode</div>
            <div class="value">{run_mode}</div>
        </div>
        <div class="metric">
            <div class="label">Stage time left</div>
            <div class="value">{time_left}</div>
        </div>
        <div class="metric">
            <div class="label">Revision</div>
            <div class="value">{revision}</div>
        </div>
    </div>

    <div>{teams}
    </div>

    <hr>

    <ul>
        <li>GET <a href="/api/state">/api/state</a></li>
        <li>GET <a href="/api/history">/api/history</a></li>
        <li>WS /ws/state</li>
        <li>POST /api/events</li>
        <li>POST /api/operator/undo</li>
        <li>POST /api/operator/publish</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/state, GET /api/history
// ---------------------------------------------------------------------------

/// Return the newest published snapshot.
pub async fn get_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.hub.latest())
}

/// Return the number of entries in the undo history.
pub async fn get_history(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let controller = state.controller()?;

    let entries = tokio::task::spawn_blocking(move || controller.history_len())
        .await
        .map_err(|e| ObserverError::Internal(format!("history task failed: {e}")))?;

    Ok(Json(HistoryResponse { entries }))
}

// ---------------------------------------------------------------------------
// POST /api/events
// ---------------------------------------------------------------------------

/// Submit a match event to the controller.
///
/// A committed event returns 200 with the resulting command. A rejected
/// event returns 422 and changes nothing. A persistence failure returns 500.
pub async fn post_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<MatchEvent>,
) -> Result<impl IntoResponse, ObserverError> {
    let controller = state.controller()?;

    let outcome = tokio::task::spawn_blocking(move || controller.on_new_event(&event))
        .await
        .map_err(|e| ObserverError::Internal(format!("event task failed: {e}")))?
        .map_err(|e| ObserverError::Internal(e.to_string()))?;

    match outcome {
        EventOutcome::Committed { command } => {
            info!(?command, "Operator event committed");
            Ok(Json(EventResponse { ok: true, command }))
        }
        EventOutcome::Rejected(err) => Err(ObserverError::Rejected(err.to_string())),
    }
}
