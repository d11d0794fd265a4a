use crate::diagnostics::DiagnosticsLog;
use crate::hub::HubContext;
use crate::negotiation::NegotiationState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tether_core::RemoteId;

#[derive(Clone)]
pub struct DiagnosticsState {
    pub log: DiagnosticsLog,
    pub context: HubContext,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSummary {
    pub remote_id: RemoteId,
    pub state: NegotiationState,
    pub channel_open: bool,
}

/// Read-only HTTP view of the hub: `GET /remotes` and `GET /logs`.
pub fn router(log: DiagnosticsLog, context: HubContext) -> Router {
    Router::new()
        .route("/remotes", get(list_remotes))
        .route("/logs", get(list_logs))
        .with_state(DiagnosticsState { log, context })
}

async fn list_remotes(State(state): State<DiagnosticsState>) -> Json<Vec<RemoteSummary>> {
    let remotes = state
        .context
        .snapshot()
        .into_iter()
        .map(|(remote_id, negotiation)| RemoteSummary {
            channel_open: state.context.has_open_channel(&remote_id),
            remote_id,
            state: negotiation,
        })
        .collect();
    Json(remotes)
}

async fn list_logs(State(state): State<DiagnosticsState>) -> Json<Vec<String>> {
    Json(state.log.lines().await)
}
