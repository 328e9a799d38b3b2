//! Webhook ingestion (§6): `POST /webhooks/{webhook_id}` runs the full
//! pipeline — Security Filter, Webhook Authenticator, Trigger Evaluator,
//! Event Normalizer, dedup, then execution admission.

use crate::api::{dropped, ingestion_rejection, internal_error, AppState};
use crate::domain::execution::Execution;
use crate::domain::ids::WebhookId;
use crate::domain::sla::{SlaStatus, SlaThresholds};
use crate::domain::trigger::TriggerSnapshot;
use crate::error::IngestionError;
use crate::security::filter::AdmitRequest;
use crate::{normalizer, security, trigger_eval, value_path};
use axum::body::Bytes;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

fn extract_secret(headers: &HeaderMap, query: &HashMap<String, String>) -> String {
    headers
        .get("x-webhook-secret")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| query.get("secret").cloned())
        .unwrap_or_default()
}

pub async fn ingest(
    State(state): State<AppState>,
    Path(webhook_id_raw): Path<String>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> axum::response::Response {
    let request_start = Instant::now();
    let received_at = Utc::now();
    let webhook_id = WebhookId::from(webhook_id_raw);

    let webhook = match state.webhooks.get(&webhook_id).await {
        Ok(Some(w)) => w,
        Ok(None) | Err(_) => return ingestion_rejection(IngestionError::UnknownWebhook),
    };

    let client_ip: IpAddr = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(peer.ip());

    let canonical_payload = String::from_utf8_lossy(&body).into_owned();
    let timestamp_header = headers.get("x-cybersentinel-timestamp").and_then(|v| v.to_str().ok());
    let signature_header = headers.get("x-cybersentinel-signature").and_then(|v| v.to_str().ok());

    let admit_req = AdmitRequest {
        client_ip,
        webhook_id: &webhook_id,
        playbook_id: &webhook.playbook_id,
        raw_body: &body,
        canonical_payload: &canonical_payload,
        timestamp_header,
        signature_header,
        webhook_secret: &webhook.secret,
        now: received_at,
        monotonic_now: Instant::now(),
    };
    if let Err(e) = state.security.admit(&admit_req) {
        return ingestion_rejection(e);
    }

    let presented_secret = extract_secret(&headers, &query);
    let webhook = match security::auth::authenticate(state.webhooks.as_ref(), &webhook_id, &presented_secret).await {
        Ok(w) => w,
        Err(e) => return ingestion_rejection(e),
    };

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return dropped("schema_validation_failed"),
    };

    let playbook = match state.engine.playbooks.get(&webhook.playbook_id).await {
        Ok(Some(p)) => p,
        Ok(None) => return dropped("playbook_disabled"),
        Err(e) => return internal_error(e.to_string()),
    };
    if !playbook.enabled {
        return dropped("playbook_disabled");
    }

    let trigger = match state.triggers.find_by_webhook(&webhook_id).await {
        Ok(Some(t)) => t,
        Ok(None) => return dropped("trigger_disabled"),
        Err(e) => return internal_error(e.to_string()),
    };
    if !trigger.enabled {
        return dropped("trigger_disabled");
    }

    let eval = trigger_eval::evaluate(&trigger, &payload);
    if !eval.matched {
        return dropped(eval.drop_reason.unwrap_or("matching_rules_not_satisfied"));
    }

    let normalized = normalizer::normalize_event_time(&payload, received_at);
    let fingerprint = normalizer::fingerprint(
        &webhook_id,
        &payload,
        normalized.event_time,
        state.security_config.fingerprint_bucket_secs,
    );

    let dedup_floor = received_at - chrono::Duration::seconds(state.security_config.dedup_window_secs as i64);
    match state.engine.executions.find_by_fingerprint(&fingerprint, dedup_floor).await {
        Ok(Some(_)) => return dropped("duplicate_fingerprint"),
        Ok(None) => {}
        Err(e) => return internal_error(e.to_string()),
    }

    let snapshot = TriggerSnapshot::from(&trigger);
    // Thresholds here are a placeholder: `Engine::admit_execution` resolves
    // the real policy and overwrites `sla_status` before acknowledging.
    let placeholder_thresholds = SlaThresholds { acknowledge_ms: 0, containment_ms: 0, resolution_ms: 0 };
    let execution = Execution::new(
        webhook.playbook_id.clone(),
        playbook.name.clone(),
        payload,
        snapshot,
        normalized.event_time,
        normalized.event_time_source.to_string(),
        webhook_id.clone(),
        fingerprint,
        SlaStatus::new(received_at, &placeholder_thresholds),
    );

    let severity = value_path::get_path(&execution.trigger_data, "severity")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let execution_id = match state.engine.admit_execution(execution, severity).await {
        Ok(id) => id,
        Err(e) => return internal_error(e.to_string()),
    };

    let latency_ms = request_start.elapsed().as_millis() as u64;
    (
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "accepted",
            "execution_id": execution_id.to_string(),
            "playbook_id": webhook.playbook_id.to_string(),
            "trigger_id": trigger.trigger_id.to_string(),
            "latency_ms": latency_ms,
        })),
    )
        .into_response()
}
