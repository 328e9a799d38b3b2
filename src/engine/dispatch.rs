//! Per-step dispatch (§4.G): resolves inputs, invokes the step's behavior by
//! type, and decides the next step id.

use crate::domain::execution::{Execution, StepResult, StepState};
use crate::domain::playbook::{
    ApprovalTimeoutAction, OnFailure, OnSuccess, Playbook, RejectedAction, Step, StepKind, END,
};
use crate::engine::retry::backoff_delay;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::resolver::{self, ResolutionContext};
use crate::trigger_eval::evaluate_field;
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

/// What happened to a step after a single dispatch attempt.
pub enum StepOutcome {
    /// Advance to the named step id, or terminate if it's `__END__`.
    Advance(String),
    /// Suspend the execution pending an approval decision.
    Suspended,
    /// The execution as a whole should terminate FAILED.
    TerminalFailure { code: &'static str, message: String },
    /// The execution as a whole should terminate COMPLETED.
    TerminalSuccess,
}

/// Drives exactly one step of `execution` against `playbook`, mutating
/// `execution` in place. Returns the outcome used by the caller's loop to
/// decide whether to keep dispatching.
pub async fn dispatch_one(engine: &Engine, execution: &mut Execution, playbook: &Playbook) -> StepOutcome {
    let step_id = execution
        .current_step_id
        .clone()
        .or_else(|| playbook.entry_step_id().map(str::to_string));

    let Some(step_id) = step_id else {
        return StepOutcome::TerminalSuccess;
    };

    let Some(step) = playbook.step(&step_id).cloned() else {
        return StepOutcome::TerminalFailure {
            code: "MISSING_INPUT",
            message: format!("step '{step_id}' does not exist in playbook", ),
        };
    };

    execution.current_step_id = Some(step_id.clone());
    execution.step_dispatch_count += 1;
    if execution.step_dispatch_count > crate::engine::MAX_STEP_EXECUTIONS {
        return StepOutcome::TerminalFailure {
            code: "LOOP_DETECTED",
            message: "step dispatch count exceeded MAX_STEP_EXECUTIONS".to_string(),
        };
    }

    let started_at = Utc::now();
    execution.steps.insert(
        step_id.clone(),
        StepResult {
            step_id: step_id.clone(),
            state: StepState::Executing,
            started_at: Some(started_at),
            ended_at: None,
            output: None,
            error: None,
            retry_count: execution.steps.get(&step_id).map(|s| s.retry_count).unwrap_or(0),
        },
    );

    info!(execution_id = %execution.execution_id, step_id = %step_id, kind = step.kind.type_name(), "dispatching step");

    let step_outputs: std::collections::HashMap<String, Value> = execution
        .steps
        .iter()
        .filter_map(|(id, r)| r.output.clone().map(|o| (id.clone(), o)))
        .collect();
    let ctx = ResolutionContext {
        trigger_data: &execution.trigger_data,
        step_outputs: &step_outputs,
        playbook,
    };
    let (resolved_inputs, missing) = resolver::resolve_inputs(&ctx, &step.input);
    if !missing.is_empty() {
        return fail_step(
            execution,
            &step,
            playbook,
            EngineError::MissingInput(missing.join(", ")),
        )
        .await;
    }

    match &step.kind {
        StepKind::Condition { field, operator, value, on_true, on_false } => {
            let resolved = resolver::resolve(&ctx, field);
            let result = evaluate_field(*operator, resolved.as_ref(), value);
            let next = if result { on_true.clone() } else { on_false.clone() };
            let output = json!({
                "result": result,
                "evaluated_value": resolved,
                "branch_taken": if result { "on_true" } else { "on_false" },
                "next_step": next,
            });
            complete_step(execution, &step_id, output);
            StepOutcome::Advance(next)
        }
        StepKind::Approval { approvers, message, timeout_hours, .. } => {
            let rendered_message = resolver::render_template(&ctx, message);
            match engine
                .start_approval(execution, &step_id, approvers.clone(), rendered_message, *timeout_hours)
                .await
            {
                Ok(()) => StepOutcome::Suspended,
                Err(e) => fail_step(execution, &step, playbook, e).await,
            }
        }
        StepKind::Enrichment { connector_id, action_type, output_projection }
        | StepKind::Action { connector_id, action_type, output_projection }
        | StepKind::Notification { connector_id, action_type, output_projection } => {
            dispatch_connector_step(engine, execution, &step, connector_id, action_type, output_projection, resolved_inputs, playbook).await
        }
    }
}

async fn dispatch_connector_step(
    engine: &Engine,
    execution: &mut Execution,
    step: &Step,
    connector_id: &str,
    action_type: &str,
    _output_projection: &Option<Vec<String>>,
    resolved_inputs: std::collections::HashMap<String, Value>,
    playbook: &Playbook,
) -> StepOutcome {
    let is_action = matches!(step.kind, StepKind::Action { .. });

    if playbook.shadow_mode && is_action {
        let output = json!({
            "skipped": true,
            "reason": "shadow_mode",
            "would_execute": { "connector": connector_id, "action": action_type, "inputs": resolved_inputs },
        });
        complete_step(execution, &step.step_id, output);
        return advance_after_success(execution, step, playbook);
    }

    let deadline = Duration::from_secs(step.timeout_seconds);
    let result = engine
        .connectors
        .invoke(connector_id, action_type, &resolved_inputs, deadline)
        .await;

    match result {
        Ok(output) => {
            complete_step(execution, &step.step_id, output.data);
            if is_action {
                crate::sla_accounting::record_containment(execution, Utc::now());
            }
            advance_after_success(execution, step, playbook)
        }
        Err(crate::connectors::ConnectorError::Timeout) => {
            execution.had_step_timeout = true;
            fail_step(execution, step, playbook, EngineError::StepTimeout).await
        }
        Err(e) => fail_step(execution, step, playbook, EngineError::ConnectorFailure(e.to_string())).await,
    }
}

fn complete_step(execution: &mut Execution, step_id: &str, output: Value) {
    if let Some(result) = execution.steps.get_mut(step_id) {
        result.state = StepState::Completed;
        result.ended_at = Some(Utc::now());
        result.output = Some(output);
    }
}

fn advance_after_success(execution: &Execution, step: &Step, playbook: &Playbook) -> StepOutcome {
    match &step.on_success {
        OnSuccess::End => StepOutcome::Advance(END.to_string()),
        OnSuccess::Goto { step_id } => StepOutcome::Advance(step_id.clone()),
        OnSuccess::Continue => match playbook.next_declared(&step.step_id) {
            Some(next) => StepOutcome::Advance(next.to_string()),
            // Last declared step with on_success: continue resolves COMPLETED (§4.G, §9).
            None => StepOutcome::Advance(END.to_string()),
        },
    }
}

async fn fail_step(execution: &mut Execution, step: &Step, playbook: &Playbook, error: EngineError) -> StepOutcome {
    warn!(execution_id = %execution.execution_id, step_id = %step.step_id, %error, "step failed");
    execution.had_step_failure = true;
    let message = error.to_string();
    let code = crate::error::SoarError::Engine(error).code();

    if let Some(result) = execution.steps.get_mut(&step.step_id) {
        result.ended_at = Some(Utc::now());
        result.error = Some(message.clone());
    }

    match step.on_failure {
        OnFailure::Stop => {
            if let Some(result) = execution.steps.get_mut(&step.step_id) {
                result.state = StepState::Failed;
            }
            StepOutcome::TerminalFailure { code, message }
        }
        OnFailure::Continue => {
            if let Some(result) = execution.steps.get_mut(&step.step_id) {
                result.state = StepState::Failed;
            }
            advance_after_success(execution, step, playbook)
        }
        OnFailure::Skip => {
            if let Some(result) = execution.steps.get_mut(&step.step_id) {
                result.state = StepState::Skipped;
            }
            StepOutcome::TerminalSuccess
        }
        OnFailure::Retry => {
            let retry_count = execution.steps.get(&step.step_id).map(|s| s.retry_count).unwrap_or(0);
            let Some(policy) = &step.retry_policy else {
                if let Some(result) = execution.steps.get_mut(&step.step_id) {
                    result.state = StepState::Failed;
                }
                return StepOutcome::TerminalFailure { code, message };
            };
            if retry_count + 1 >= policy.max_attempts {
                if let Some(result) = execution.steps.get_mut(&step.step_id) {
                    result.state = StepState::Failed;
                }
                return StepOutcome::TerminalFailure { code, message };
            }
            let delay = backoff_delay(policy, retry_count + 1);
            tokio::time::sleep(delay).await;
            if let Some(result) = execution.steps.get_mut(&step.step_id) {
                result.retry_count += 1;
                result.state = StepState::Pending;
            }
            StepOutcome::Advance(step.step_id.clone())
        }
    }
}

/// Finalizes the approval step's own `StepResult` on resumption (§4.H):
/// approved completes it, rejected fails it, and timed_out fails it unless
/// `on_timeout: skip`. Without this the step is left `Executing` forever,
/// even once the execution itself reaches a terminal state.
pub fn finalize_approval_step(
    execution: &mut Execution,
    step: &Step,
    decision: crate::domain::approval::ApprovalDecision,
) {
    use crate::domain::approval::ApprovalDecision;
    let (state, error) = match decision {
        ApprovalDecision::Approved => (StepState::Completed, None),
        ApprovalDecision::Rejected => (StepState::Failed, Some("approval rejected".to_string())),
        ApprovalDecision::TimedOut => match &step.kind {
            StepKind::Approval { on_timeout: ApprovalTimeoutAction::Skip, .. } => (StepState::Skipped, None),
            _ => (StepState::Failed, Some("approval timed out".to_string())),
        },
    };
    if let Some(result) = execution.steps.get_mut(&step.step_id) {
        result.state = state;
        result.ended_at = Some(Utc::now());
        result.error = error;
    }
}

/// Used by approval resumption (§4.H) to compute the next step id from the
/// decision outcome, without re-running the step dispatch itself.
pub fn advance_after_approval_decision(
    step: &Step,
    playbook: &Playbook,
    decision: crate::domain::approval::ApprovalDecision,
) -> StepOutcome {
    use crate::domain::approval::ApprovalDecision;
    let StepKind::Approval { on_approved, on_rejected, on_timeout, .. } = &step.kind else {
        return StepOutcome::TerminalFailure {
            code: "MISSING_INPUT",
            message: "approval decision delivered to a non-approval step".to_string(),
        };
    };
    match decision {
        ApprovalDecision::Approved => StepOutcome::Advance(on_approved.clone()),
        ApprovalDecision::Rejected => match on_rejected {
            RejectedAction::Fail | RejectedAction::Stop => StepOutcome::TerminalFailure {
                code: "APPROVAL_REJECTED",
                message: "approval rejected".to_string(),
            },
            RejectedAction::Goto(target) => StepOutcome::Advance(target.clone()),
        },
        ApprovalDecision::TimedOut => match on_timeout {
            ApprovalTimeoutAction::Fail => StepOutcome::TerminalFailure {
                code: "APPROVAL_TIMEOUT",
                message: "approval timed out".to_string(),
            },
            ApprovalTimeoutAction::Continue => match playbook.next_declared(&step.step_id) {
                Some(next) => StepOutcome::Advance(next.to_string()),
                None => StepOutcome::Advance(END.to_string()),
            },
            ApprovalTimeoutAction::Skip | ApprovalTimeoutAction::End => StepOutcome::Advance(END.to_string()),
            ApprovalTimeoutAction::Goto(target) => StepOutcome::Advance(target.clone()),
        },
    }
}
