//! Persistence Contract (§4.J): storage traits the engine depends on,
//! plus the in-process implementation this core ships. A durable,
//! crash-safe backing store is a pluggable swap-in and out of scope here.

pub mod memory;

use crate::domain::approval::Approval;
use crate::domain::audit::AuditEvent;
use crate::domain::execution::{Execution, ExecutionState};
use crate::domain::ids::{ApprovalId, ExecutionId, PlaybookId, TriggerId, WebhookId};
use crate::domain::playbook::Playbook;
use crate::domain::sla::SlaPolicy;
use crate::domain::trigger::Trigger;
use crate::domain::webhook::Webhook;
use crate::error::SoarResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn save(&self, execution: &Execution) -> SoarResult<()>;
    async fn get(&self, execution_id: &ExecutionId) -> SoarResult<Option<Execution>>;
    async fn find_by_fingerprint(&self, fingerprint: &str, within: DateTime<Utc>) -> SoarResult<Option<Execution>>;
    async fn list_by_state(&self, state: ExecutionState, limit: usize) -> SoarResult<Vec<Execution>>;
    async fn list_by_webhook(&self, webhook_id: &WebhookId, limit: usize) -> SoarResult<Vec<Execution>>;
}

#[async_trait]
pub trait PlaybookStore: Send + Sync {
    async fn save(&self, playbook: &Playbook) -> SoarResult<()>;
    async fn get(&self, playbook_id: &PlaybookId) -> SoarResult<Option<Playbook>>;
}

#[async_trait]
pub trait TriggerStore: Send + Sync {
    async fn save(&self, trigger: &Trigger) -> SoarResult<()>;
    async fn get(&self, trigger_id: &TriggerId) -> SoarResult<Option<Trigger>>;
    /// At most one trigger is bound to a given webhook (§9 open-question resolution).
    async fn find_by_webhook(&self, webhook_id: &WebhookId) -> SoarResult<Option<Trigger>>;
}

#[async_trait]
pub trait WebhookStore: Send + Sync {
    async fn save(&self, webhook: &Webhook) -> SoarResult<()>;
    async fn get(&self, webhook_id: &WebhookId) -> SoarResult<Option<Webhook>>;
}

#[async_trait]
pub trait ApprovalStore: Send + Sync {
    async fn save(&self, approval: &Approval) -> SoarResult<()>;
    async fn get(&self, approval_id: &ApprovalId) -> SoarResult<Option<Approval>>;
    /// Pending approvals whose `expires_at` has passed, for the sweeper.
    async fn find_expired_pending(&self, now: DateTime<Utc>) -> SoarResult<Vec<Approval>>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn record(&self, event: AuditEvent) -> SoarResult<()>;
}

#[async_trait]
pub trait SlaPolicyStore: Send + Sync {
    async fn save(&self, policy: &SlaPolicy) -> SoarResult<()>;
    /// Resolves the applicable policy by playbook, then severity, then global (first match).
    async fn resolve(&self, playbook_id: &PlaybookId, severity: Option<&str>) -> SoarResult<Option<SlaPolicy>>;
}
