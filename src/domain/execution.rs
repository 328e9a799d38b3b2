//! Execution state machine (§3, §4.G), modeled on the same
//! create/start/complete/fail/suspend/resume shape used for case lifecycles
//! elsewhere in this codebase's lineage, generalized to the step-result
//! bookkeeping a playbook run needs.

use crate::domain::ids::{ApprovalId, ExecutionId, PlaybookId, WebhookId};
use crate::domain::sla::SlaStatus;
use crate::domain::trigger::TriggerSnapshot;
use crate::error::{EngineError, SoarError, SoarResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Executing,
    WaitingApproval,
    Completed,
    Failed,
}

impl ExecutionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionState::Completed | ExecutionState::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Executing,
    Completed,
    Failed,
    Skipped,
}

impl StepState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepState::Completed | StepState::Failed | StepState::Skipped
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub state: StepState,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub retry_count: u32,
}

impl StepResult {
    pub fn pending(step_id: &str) -> Self {
        Self {
            step_id: step_id.to_string(),
            state: StepState::Pending,
            started_at: None,
            ended_at: None,
            output: None,
            error: None,
            retry_count: 0,
        }
    }
}

/// Failure detail attached to a terminal FAILED execution (§7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureDetail {
    pub code: String,
    pub message: String,
    pub step_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub execution_id: ExecutionId,
    pub playbook_id: PlaybookId,
    pub playbook_name: String,
    pub state: ExecutionState,
    pub trigger_data: Value,
    pub trigger_snapshot: TriggerSnapshot,
    pub event_time: DateTime<Utc>,
    pub event_time_source: String,
    pub webhook_id: WebhookId,
    pub fingerprint: String,
    /// Per-step results, keyed by step_id, preserving declared order via the playbook.
    pub steps: HashMap<String, StepResult>,
    pub current_step_id: Option<String>,
    pub step_dispatch_count: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub sla_policy_id: Option<String>,
    pub sla_status: SlaStatus,
    pub drop_reason: Option<String>,
    pub approval_id: Option<ApprovalId>,
    pub failure: Option<FailureDetail>,
    pub cancel_requested: bool,
    /// Accumulated milliseconds spent in `WAITING_APPROVAL`, used by the SLA
    /// breach-reason heuristic (§4.I).
    pub waiting_approval_ms: i64,
    waiting_approval_started_at: Option<DateTime<Utc>>,
    /// Set when a connector call exceeded its step timeout, for the SLA
    /// breach-reason heuristic.
    pub had_step_timeout: bool,
    pub had_step_failure: bool,
}

impl Execution {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        playbook_id: PlaybookId,
        playbook_name: String,
        trigger_data: Value,
        trigger_snapshot: TriggerSnapshot,
        event_time: DateTime<Utc>,
        event_time_source: String,
        webhook_id: WebhookId,
        fingerprint: String,
        sla_status: SlaStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            execution_id: ExecutionId::generate(),
            playbook_id,
            playbook_name,
            state: ExecutionState::Executing,
            trigger_data,
            trigger_snapshot,
            event_time,
            event_time_source,
            webhook_id,
            fingerprint,
            steps: HashMap::new(),
            current_step_id: None,
            step_dispatch_count: 0,
            created_at: now,
            started_at: now,
            completed_at: None,
            duration_ms: None,
            sla_policy_id: None,
            sla_status,
            drop_reason: None,
            approval_id: None,
            failure: None,
            cancel_requested: false,
            waiting_approval_ms: 0,
            waiting_approval_started_at: None,
            had_step_timeout: false,
            had_step_failure: false,
        }
    }

    fn finish(&mut self, state: ExecutionState) {
        debug_assert!(state.is_terminal());
        self.state = state;
        let now = Utc::now();
        self.completed_at = Some(now);
        self.duration_ms = Some((now - self.started_at).num_milliseconds());
    }

    pub fn complete(&mut self) -> SoarResult<()> {
        if self.state.is_terminal() {
            return Err(SoarError::Engine(EngineError::Cancelled));
        }
        self.finish(ExecutionState::Completed);
        Ok(())
    }

    pub fn fail(&mut self, code: &str, message: String, step_id: Option<String>) -> SoarResult<()> {
        if self.state.is_terminal() {
            return Err(SoarError::Engine(EngineError::Cancelled));
        }
        self.failure = Some(FailureDetail {
            code: code.to_string(),
            message,
            step_id,
            timestamp: Utc::now(),
        });
        self.finish(ExecutionState::Failed);
        Ok(())
    }

    pub fn suspend_for_approval(&mut self, approval_id: ApprovalId) -> SoarResult<()> {
        if self.state != ExecutionState::Executing {
            return Err(SoarError::Engine(EngineError::Cancelled));
        }
        self.state = ExecutionState::WaitingApproval;
        self.approval_id = Some(approval_id);
        self.waiting_approval_started_at = Some(Utc::now());
        Ok(())
    }

    pub fn resume(&mut self) -> SoarResult<()> {
        if self.state != ExecutionState::WaitingApproval {
            return Err(SoarError::Engine(EngineError::Cancelled));
        }
        if let Some(started) = self.waiting_approval_started_at.take() {
            self.waiting_approval_ms += (Utc::now() - started).num_milliseconds().max(0);
        }
        self.state = ExecutionState::Executing;
        self.approval_id = None;
        Ok(())
    }

    pub fn request_cancel(&mut self) {
        self.cancel_requested = true;
    }

    /// Fraction of total elapsed wall-clock time spent in `WAITING_APPROVAL`,
    /// used by the SLA breach-reason heuristic (§4.I).
    pub fn waiting_approval_fraction(&self) -> f64 {
        let elapsed_ms = (Utc::now() - self.started_at).num_milliseconds().max(1);
        self.waiting_approval_ms as f64 / elapsed_ms as f64
    }
}
