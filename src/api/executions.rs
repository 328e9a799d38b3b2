//! Manual trigger (§6): `POST /executions/trigger` runs the same admission
//! pipeline as webhook ingestion, minus webhook authentication.
//!
//! Triggers bind 1:1 to a webhook in this persistence contract (§9), not to
//! a playbook, so there is no index this endpoint can use to look up
//! predicates for a playbook on its own. Manual triggers are therefore
//! always treated as pre-matched — equivalent to `bypass_trigger: true` —
//! regardless of the flag's value; the flag is accepted for forward
//! compatibility with a future playbook-keyed trigger index.

use crate::api::models::ManualTriggerRequest;
use crate::api::{dropped, internal_error, AppState};
use crate::domain::execution::Execution;
use crate::domain::ids::{PlaybookId, WebhookId};
use crate::domain::sla::{SlaStatus, SlaThresholds};
use crate::domain::trigger::{MatchMode, TriggerSnapshot};
use crate::{normalizer, value_path};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use chrono::Utc;
use serde_json::json;

/// Synthetic identity standing in for "no webhook" in fingerprinting and the
/// execution's `webhook_id` field, since both are non-optional by contract.
fn manual_webhook_id() -> WebhookId {
    WebhookId::from("WHK-MANUAL-TRIGGER".to_string())
}

pub async fn trigger(
    State(state): State<AppState>,
    Json(request): Json<ManualTriggerRequest>,
) -> axum::response::Response {
    let received_at = Utc::now();
    let playbook_id = PlaybookId::from(request.playbook_id);

    let playbook = match state.engine.playbooks.get(&playbook_id).await {
        Ok(Some(p)) => p,
        Ok(None) => return dropped("playbook_disabled"),
        Err(e) => return internal_error(e.to_string()),
    };
    if !playbook.enabled {
        return dropped("playbook_disabled");
    }

    let webhook_id = manual_webhook_id();
    let normalized = normalizer::normalize_event_time(&request.trigger_data, received_at);
    let fingerprint = normalizer::fingerprint(
        &webhook_id,
        &request.trigger_data,
        normalized.event_time,
        state.security_config.fingerprint_bucket_secs,
    );

    let dedup_floor = received_at - chrono::Duration::seconds(state.security_config.dedup_window_secs as i64);
    match state.engine.executions.find_by_fingerprint(&fingerprint, dedup_floor).await {
        Ok(Some(_)) => return dropped("duplicate_fingerprint"),
        Ok(None) => {}
        Err(e) => return internal_error(e.to_string()),
    }

    let snapshot = TriggerSnapshot {
        trigger_id: crate::domain::ids::TriggerId::from("TRG-MANUAL-TRIGGER".to_string()),
        version: 0,
        predicates: Vec::new(),
        match_mode: MatchMode::All,
    };
    let placeholder_thresholds = SlaThresholds { acknowledge_ms: 0, containment_ms: 0, resolution_ms: 0 };
    let execution = Execution::new(
        playbook_id.clone(),
        playbook.name.clone(),
        request.trigger_data,
        snapshot,
        normalized.event_time,
        normalized.event_time_source.to_string(),
        webhook_id,
        fingerprint,
        SlaStatus::new(received_at, &placeholder_thresholds),
    );

    let severity = value_path::get_path(&execution.trigger_data, "severity")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    match state.engine.admit_execution(execution, severity).await {
        Ok(execution_id) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "status": "accepted",
                "execution_id": execution_id.to_string(),
                "playbook_id": playbook_id.to_string(),
                "bypass_trigger": request.bypass_trigger,
            })),
        )
            .into_response(),
        Err(e) => internal_error(e.to_string()),
    }
}
