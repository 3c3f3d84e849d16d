//! Database Commands
//!
//! The two generic endpoints the client uses: one full read, one mutation.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::domain::{MutationCommand, MutationRequest, SyncSnapshot};
use crate::AppState;
use super::error::ApiError;

/// GET /db/sync
pub async fn sync(State(state): State<AppState>) -> Result<Json<SyncSnapshot>, ApiError> {
    let snapshot = state.snapshots.load_snapshot().await.map_err(|e| {
        log::error!("Sync failed: {}", e);
        ApiError::Upstream("Server fetch error".to_string())
    })?;
    Ok(Json(snapshot))
}

/// POST /db/mutate
pub async fn mutate(
    State(state): State<AppState>,
    payload: Result<Json<MutationRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let command = MutationCommand::from_request(&request)?;
    state.mutations.apply(&command).await.map_err(|e| {
        if e.is_rejection() {
            log::warn!("Mutation rejected: {} {}: {}", request.table, request.action, e);
        } else {
            log::error!(
                "Mutation failed: {} {} {}: {}",
                request.table,
                request.action,
                request.payload,
                e
            );
        }
        ApiError::from(e)
    })?;

    Ok(Json(json!({ "success": true })))
}
