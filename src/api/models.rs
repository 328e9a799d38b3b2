//! Request/response DTOs for the HTTP surface (§6).

use crate::domain::approval::ApprovalDecision;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct DecideApprovalRequest {
    pub decision: ApprovalDecisionDto,
    pub actor: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecisionDto {
    Approved,
    Rejected,
}

impl From<ApprovalDecisionDto> for ApprovalDecision {
    fn from(dto: ApprovalDecisionDto) -> Self {
        match dto {
            ApprovalDecisionDto::Approved => ApprovalDecision::Approved,
            ApprovalDecisionDto::Rejected => ApprovalDecision::Rejected,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ManualTriggerRequest {
    pub playbook_id: String,
    pub trigger_data: Value,
    #[serde(default)]
    pub bypass_trigger: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub reason: String,
}
