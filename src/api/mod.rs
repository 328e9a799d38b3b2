//! HTTP surface (§6): webhook ingestion, approval decisions, manual
//! triggers, and security/health observability, composed over one shared
//! `AppState`.

pub mod approvals;
pub mod executions;
pub mod models;
pub mod security_observability;
pub mod webhooks;

use crate::config::SecurityConfig;
use crate::engine::Engine;
use crate::error::SoarError;
use crate::persistence::{AuditStore, TriggerStore, WebhookStore};
use crate::security::filter::SecurityFilter;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub security: Arc<SecurityFilter>,
    pub webhooks: Arc<dyn WebhookStore>,
    pub triggers: Arc<dyn TriggerStore>,
    pub audit: Arc<dyn AuditStore>,
    pub security_config: SecurityConfig,
    pub approval_sweeper: Arc<tokio::task::JoinHandle<()>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhooks/:webhook_id", post(webhooks::ingest))
        .route("/approvals/:approval_id/decide", post(approvals::decide))
        .route("/executions/trigger", post(executions::trigger))
        .route("/security/metrics", get(security_observability::metrics))
        .route("/security/config", get(security_observability::config))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    let sweeper_alive = !state.approval_sweeper.is_finished();
    let status = if sweeper_alive { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(json!({ "alive": true, "approval_sweeper_alive": sweeper_alive })))
}

/// `{status:"dropped", reason}` — 200, never creates an execution (§6).
pub(crate) fn dropped(reason: &str) -> axum::response::Response {
    (StatusCode::OK, Json(json!({ "status": "dropped", "reason": reason }))).into_response()
}

/// Maps an ingestion-pipeline rejection to its documented status code and body (§6, §7).
pub(crate) fn ingestion_rejection(error: crate::error::IngestionError) -> axum::response::Response {
    use crate::error::IngestionError as E;
    let code = SoarError::Ingestion(error.clone()).code();
    match error {
        E::UnknownWebhook | E::WebhookDisabled => {
            (StatusCode::NOT_FOUND, Json(json!({ "status": "rejected", "reason": code }))).into_response()
        }
        E::InvalidSecret => (StatusCode::UNAUTHORIZED, Json(json!({ "status": "rejected", "reason": code }))).into_response(),
        E::PlaybookDisabled | E::TriggerDisabled => dropped(&code.to_lowercase()),
        E::RateLimitExceeded { retry_after_secs }
        | E::BurstLimitExceeded { retry_after_secs }
        | E::IpBlocked { retry_after_secs } => (
            StatusCode::TOO_MANY_REQUESTS,
            [("Retry-After", retry_after_secs.to_string())],
            Json(json!({ "status": "rejected", "reason": code })),
        )
            .into_response(),
        E::PlaybookFloodLimit | E::GlobalFloodLimit => (
            StatusCode::TOO_MANY_REQUESTS,
            [("Retry-After", "60".to_string())],
            Json(json!({ "status": "rejected", "reason": code })),
        )
            .into_response(),
        E::MissingTimestamp | E::InvalidTimestamp | E::TimestampSkew | E::DuplicateNonce | E::InvalidSignature => {
            (StatusCode::BAD_REQUEST, Json(json!({ "status": "rejected", "reason": code }))).into_response()
        }
    }
}

pub(crate) fn internal_error(message: impl Into<String>) -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "status": "error", "reason": "INTERNAL_ERROR", "message": message.into() })),
    )
        .into_response()
}
