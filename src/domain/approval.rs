//! Approval data model (§3, §4.H).

use crate::domain::ids::{ApprovalId, ExecutionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    Pending,
    Decided,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub approval_id: ApprovalId,
    pub execution_id: ExecutionId,
    pub step_id: String,
    pub approvers: Vec<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub state: ApprovalState,
    pub decision: Option<ApprovalDecision>,
    pub decider: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl Approval {
    pub fn new(
        execution_id: ExecutionId,
        step_id: String,
        approvers: Vec<String>,
        message: String,
        timeout_hours: f64,
    ) -> Self {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::milliseconds((timeout_hours * 3_600_000.0) as i64);
        Self {
            approval_id: ApprovalId::generate(),
            execution_id,
            step_id,
            approvers,
            message,
            created_at: now,
            expires_at,
            state: ApprovalState::Pending,
            decision: None,
            decider: None,
            decided_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.state == ApprovalState::Pending && now >= self.expires_at
    }
}
