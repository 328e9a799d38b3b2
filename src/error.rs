//! Error taxonomy for the SOAR engine
//!
//! One variant family per subsystem layer, composed into a single crate-level
//! error via `#[from]`, in the style of a comprehensive per-crate error enum.

use thiserror::Error;

/// Result type used throughout the engine.
pub type SoarResult<T> = Result<T, SoarError>;

/// Validator errors, fatal at playbook save time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("playbook is missing an id")]
    MissingPlaybookId,
    #[error("step '{0}' has an invalid type")]
    InvalidStepType(String),
    #[error("condition step '{0}' is missing on_true/on_false")]
    ConditionMissingBranch(String),
    #[error("approval step '{0}' is missing on_timeout")]
    ApprovalMissingOnTimeout(String),
    #[error("step '{0}' goto target '{1}' does not exist")]
    InvalidGotoTarget(String, String),
    #[error("duplicate step id '{0}'")]
    DuplicateStepId(String),
    #[error("step '{0}' is unreachable from the playbook entry")]
    UnreachableStep(String),
    #[error("step '{0}' participates in a cycle")]
    Cycle(String),
    #[error("step '{0}': {1}")]
    MissingField(String, String),
}

/// Ingestion-pipeline rejections. Never result in an execution being created.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestionError {
    #[error("invalid webhook secret")]
    InvalidSecret,
    #[error("webhook is disabled")]
    WebhookDisabled,
    #[error("playbook is disabled")]
    PlaybookDisabled,
    #[error("trigger is disabled")]
    TriggerDisabled,
    #[error("timestamp header missing")]
    MissingTimestamp,
    #[error("timestamp header could not be parsed")]
    InvalidTimestamp,
    #[error("timestamp skew exceeds the allowed window")]
    TimestampSkew,
    #[error("nonce already seen")]
    DuplicateNonce,
    #[error("HMAC signature did not verify")]
    InvalidSignature,
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },
    #[error("burst limit exceeded, retry after {retry_after_secs}s")]
    BurstLimitExceeded { retry_after_secs: u64 },
    #[error("client ip is blocked, retry after {retry_after_secs}s")]
    IpBlocked { retry_after_secs: u64 },
    #[error("per-playbook flood limit exceeded")]
    PlaybookFloodLimit,
    #[error("global flood limit exceeded")]
    GlobalFloodLimit,
    #[error("unknown webhook")]
    UnknownWebhook,
}

/// Execution-time failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("step timed out")]
    StepTimeout,
    #[error("connector failure: {0}")]
    ConnectorFailure(String),
    #[error("missing required input: {0}")]
    MissingInput(String),
    #[error("loop cap exceeded")]
    LoopDetected,
    #[error("approval timed out")]
    ApprovalTimeout,
    #[error("approval rejected")]
    ApprovalRejected,
    #[error("execution cancelled")]
    Cancelled,
    #[error("approval already decided")]
    AlreadyDecided,
    #[error("unknown connector '{0}'")]
    UnknownConnector(String),
}

/// Persistence-layer failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Crate-level error composing every subsystem's taxonomy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SoarError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Ingestion(#[from] IngestionError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("configuration error: {0}")]
    Config(String),
}

impl SoarError {
    /// Stable machine-readable reason code, surfaced on every rejected/dropped
    /// ingestion response and every terminal FAILED execution.
    pub fn code(&self) -> &'static str {
        match self {
            SoarError::Validation(e) => match e {
                ValidationError::MissingPlaybookId => "MISSING_PLAYBOOK_ID",
                ValidationError::InvalidStepType(_) => "INVALID_STEP_TYPE",
                ValidationError::ConditionMissingBranch(_) => "CONDITION_MISSING_ON_TRUE_OR_FALSE",
                ValidationError::ApprovalMissingOnTimeout(_) => "APPROVAL_MISSING_ON_TIMEOUT",
                ValidationError::InvalidGotoTarget(_, _) => "INVALID_GOTO_TARGET",
                ValidationError::DuplicateStepId(_) => "DUPLICATE_STEP_IDS",
                ValidationError::UnreachableStep(_) | ValidationError::Cycle(_) => {
                    "INVALID_PLAYBOOK"
                }
                ValidationError::MissingField(_, _) => "INVALID_PLAYBOOK",
            },
            SoarError::Ingestion(e) => match e {
                IngestionError::InvalidSecret => "INVALID_SECRET",
                IngestionError::WebhookDisabled => "WEBHOOK_DISABLED",
                IngestionError::PlaybookDisabled => "PLAYBOOK_DISABLED",
                IngestionError::TriggerDisabled => "TRIGGER_DISABLED",
                IngestionError::MissingTimestamp => "MISSING_TIMESTAMP",
                IngestionError::InvalidTimestamp => "INVALID_TIMESTAMP",
                IngestionError::TimestampSkew => "TIMESTAMP_SKEW",
                IngestionError::DuplicateNonce => "DUPLICATE_NONCE",
                IngestionError::InvalidSignature => "INVALID_SIGNATURE",
                IngestionError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
                IngestionError::BurstLimitExceeded { .. } => "BURST_LIMIT_EXCEEDED",
                IngestionError::IpBlocked { .. } => "IP_BLOCKED",
                IngestionError::PlaybookFloodLimit => "PLAYBOOK_FLOOD_LIMIT",
                IngestionError::GlobalFloodLimit => "GLOBAL_FLOOD_LIMIT",
                IngestionError::UnknownWebhook => "UNKNOWN_WEBHOOK",
            },
            SoarError::Engine(e) => match e {
                EngineError::StepTimeout => "STEP_TIMEOUT",
                EngineError::ConnectorFailure(_) => "CONNECTOR_FAILURE",
                EngineError::MissingInput(_) => "MISSING_INPUT",
                EngineError::LoopDetected => "LOOP_DETECTED",
                EngineError::ApprovalTimeout => "APPROVAL_TIMEOUT",
                EngineError::ApprovalRejected => "APPROVAL_REJECTED",
                EngineError::Cancelled => "CANCELLED",
                EngineError::AlreadyDecided => "ALREADY_DECIDED",
                EngineError::UnknownConnector(_) => "UNKNOWN_CONNECTOR",
            },
            SoarError::Persistence(_) => "PERSISTENCE_ERROR",
            SoarError::Config(_) => "CONFIG_ERROR",
        }
    }
}
