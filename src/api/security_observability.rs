//! Security observability (§6): `GET /security/metrics`, `GET /security/config`.

use crate::api::AppState;
use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

pub async fn metrics(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::to_value(state.security.metrics_snapshot()).unwrap_or(Value::Null))
}

/// Sanitized thresholds only — never the trusted-IP list or any secret.
pub async fn config(State(state): State<AppState>) -> Json<Value> {
    let c = &state.security_config;
    Json(json!({
        "rate_limit_window_secs": c.rate_limit_window_secs,
        "rate_limit_max_requests": c.rate_limit_max_requests,
        "burst_window_secs": c.burst_window_secs,
        "burst_max_requests": c.burst_max_requests,
        "ip_cooloff_secs": c.ip_cooloff_secs,
        "replay_window_secs": c.replay_window_secs,
        "timestamp_skew_secs": c.timestamp_skew_secs,
        "playbook_flood_per_min": c.playbook_flood_per_min,
        "global_flood_per_min": c.global_flood_per_min,
        "dedup_window_secs": c.dedup_window_secs,
        "fingerprint_bucket_secs": c.fingerprint_bucket_secs,
        "approval_sweep_interval_secs": c.approval_sweep_interval_secs,
    }))
}
