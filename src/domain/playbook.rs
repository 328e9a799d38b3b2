//! Playbook data model (§3, §9): a declarative step graph with polymorphic
//! step types, modeled as a tagged sum over a shared header plus a variant
//! payload.

use crate::domain::ids::PlaybookId;
use crate::domain::trigger::{Operator, Predicate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Sentinel step-id value meaning "terminate the execution here".
pub const END: &str = "__END__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnFailure {
    Stop,
    Continue,
    Retry,
    Skip,
}

/// How to advance after a step completes successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OnSuccess {
    Continue,
    End,
    Goto { step_id: String },
}

impl Default for OnSuccess {
    fn default() -> Self {
        OnSuccess::Continue
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// 1..=10
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    /// 1..=5
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

/// `on_timeout` target for an approval step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalTimeoutAction {
    Fail,
    Continue,
    Skip,
    End,
    Goto(String),
}

/// `on_rejected` target for an approval step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectedAction {
    Fail,
    Stop,
    Goto(String),
}

/// Variant payload, one per step `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    Enrichment {
        connector_id: String,
        action_type: String,
        #[serde(default)]
        output_projection: Option<Vec<String>>,
    },
    Action {
        connector_id: String,
        action_type: String,
        #[serde(default)]
        output_projection: Option<Vec<String>>,
    },
    Notification {
        connector_id: String,
        action_type: String,
        #[serde(default)]
        output_projection: Option<Vec<String>>,
    },
    Condition {
        field: String,
        operator: Operator,
        #[serde(default)]
        value: Value,
        on_true: String,
        on_false: String,
    },
    Approval {
        approvers: Vec<String>,
        message: String,
        timeout_hours: f64,
        on_approved: String,
        on_rejected: RejectedAction,
        on_timeout: ApprovalTimeoutAction,
    },
}

impl StepKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            StepKind::Enrichment { .. } => "enrichment",
            StepKind::Action { .. } => "action",
            StepKind::Notification { .. } => "notification",
            StepKind::Condition { .. } => "condition",
            StepKind::Approval { .. } => "approval",
        }
    }

    pub fn is_connector_backed(&self) -> bool {
        matches!(
            self,
            StepKind::Enrichment { .. } | StepKind::Action { .. } | StepKind::Notification { .. }
        )
    }
}

/// A single playbook step: shared header plus a type-specific payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Lowercase identifier, unique within the playbook: `[a-z][a-z0-9_]*`.
    pub step_id: String,
    pub name: String,
    pub timeout_seconds: u64,
    #[serde(default)]
    pub on_success: OnSuccess,
    pub on_failure: OnFailure,
    #[serde(default)]
    pub retry_policy: Option<RetryPolicy>,
    #[serde(default)]
    pub input: HashMap<String, String>,
    #[serde(flatten)]
    pub kind: StepKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playbook {
    pub playbook_id: PlaybookId,
    pub name: String,
    pub version: String,
    pub enabled: bool,
    pub shadow_mode: bool,
    pub steps: Vec<Step>,
}

impl Playbook {
    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    /// The implicit entry point: the first declared step.
    pub fn entry_step_id(&self) -> Option<&str> {
        self.steps.first().map(|s| s.step_id.as_str())
    }

    /// The step declared immediately after `step_id`, if any (used by the
    /// default `on_success: continue` advance).
    pub fn next_declared(&self, step_id: &str) -> Option<&str> {
        let idx = self.steps.iter().position(|s| s.step_id == step_id)?;
        self.steps.get(idx + 1).map(|s| s.step_id.as_str())
    }
}
