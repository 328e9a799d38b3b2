//! Approval decisions (§6): `POST /approvals/{approval_id}/decide`.

use crate::api::models::DecideApprovalRequest;
use crate::api::{internal_error, AppState};
use crate::domain::ids::ApprovalId;
use crate::error::{EngineError, SoarError};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::json;

pub async fn decide(
    State(state): State<AppState>,
    Path(approval_id_raw): Path<String>,
    Json(request): Json<DecideApprovalRequest>,
) -> axum::response::Response {
    let approval_id = ApprovalId::from(approval_id_raw);

    match state
        .engine
        .decide_approval(&approval_id, request.decision.into(), request.actor)
        .await
    {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "decided" }))).into_response(),
        Err(SoarError::Engine(EngineError::AlreadyDecided)) => (
            StatusCode::CONFLICT,
            Json(json!({ "status": "error", "reason": "ALREADY_DECIDED" })),
        )
            .into_response(),
        Err(SoarError::Persistence(crate::error::PersistenceError::NotFound(_))) => {
            (StatusCode::NOT_FOUND, Json(json!({ "status": "error", "reason": "NOT_FOUND" }))).into_response()
        }
        Err(e) => internal_error(e.to_string()),
    }
}
