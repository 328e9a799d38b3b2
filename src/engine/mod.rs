//! Execution Engine (§4.G): drives the per-execution state machine,
//! dispatches steps, enforces the loop cap, and owns approval suspension.

pub mod dispatch;
pub mod retry;

use crate::config::SlaDefaults;
use crate::connectors::registry::ConnectorRegistry;
use crate::domain::approval::{Approval, ApprovalDecision};
use crate::domain::execution::{Execution, ExecutionState};
use crate::domain::ids::{ApprovalId, ExecutionId};
use crate::domain::playbook::Playbook;
use crate::error::{EngineError, SoarError, SoarResult};
use crate::persistence::{ApprovalStore, ExecutionStore, PlaybookStore, SlaPolicyStore};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

/// Hard ceiling on step dispatches per execution (§4.G), guaranteeing
/// termination of an arbitrary declarative graph even if the validator was
/// bypassed.
pub const MAX_STEP_EXECUTIONS: u32 = 100;

/// Drives every in-flight execution. Cheap to clone (all fields are `Arc`);
/// one instance is shared across the HTTP handlers, the approval sweeper,
/// and every spawned per-execution worker task.
#[derive(Clone)]
pub struct Engine {
    pub playbooks: Arc<dyn PlaybookStore>,
    pub executions: Arc<dyn ExecutionStore>,
    pub approvals: Arc<dyn ApprovalStore>,
    pub sla_policies: Arc<dyn SlaPolicyStore>,
    pub connectors: Arc<ConnectorRegistry>,
    pub sla_defaults: SlaDefaults,
    /// Process-wide cap on concurrent execution workers (§5).
    semaphore: Arc<Semaphore>,
}

impl Engine {
    pub fn new(
        playbooks: Arc<dyn PlaybookStore>,
        executions: Arc<dyn ExecutionStore>,
        approvals: Arc<dyn ApprovalStore>,
        sla_policies: Arc<dyn SlaPolicyStore>,
        connectors: Arc<ConnectorRegistry>,
        sla_defaults: SlaDefaults,
        max_concurrent_executions: usize,
    ) -> Self {
        Self {
            playbooks,
            executions,
            approvals,
            sla_policies,
            connectors,
            sla_defaults,
            semaphore: Arc::new(Semaphore::new(max_concurrent_executions)),
        }
    }

    /// Persists a freshly created execution, resolves its SLA thresholds,
    /// records the acknowledgement instant, and spawns its worker task.
    pub async fn admit_execution(&self, mut execution: Execution, severity: Option<String>) -> SoarResult<ExecutionId> {
        let thresholds = crate::sla_accounting::resolve_thresholds(
            self.sla_policies.as_ref(),
            &execution.playbook_id,
            severity.as_deref(),
            &self.sla_defaults,
        )
        .await;
        execution.sla_status = crate::domain::sla::SlaStatus::new(execution.sla_status.webhook_received_at, &thresholds);
        crate::sla_accounting::record_acknowledgement(&mut execution, Utc::now());

        let execution_id = execution.execution_id.clone();
        self.executions.save(&execution).await?;

        let engine = self.clone();
        let spawned_execution_id = execution_id.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.drive(&spawned_execution_id).await {
                error!(%spawned_execution_id, error = %e, "execution worker terminated with an error");
            }
        });

        Ok(execution_id)
    }

    /// The logical worker for one execution: dispatches steps until the
    /// execution reaches a terminal state or suspends on approval.
    pub async fn drive(&self, execution_id: &ExecutionId) -> SoarResult<()> {
        let _permit = self.semaphore.acquire().await.map_err(|_| {
            SoarError::Engine(EngineError::Cancelled)
        })?;

        loop {
            let Some(mut execution) = self.executions.get(execution_id).await? else {
                return Ok(());
            };
            if execution.state.is_terminal() {
                return Ok(());
            }
            if execution.cancel_requested {
                let _ = execution.fail("CANCELLED", "execution cancelled".to_string(), execution.current_step_id.clone());
                self.executions.save(&execution).await?;
                return Ok(());
            }

            let Some(playbook) = self.playbooks.get(&execution.playbook_id).await? else {
                let _ = execution.fail("MISSING_INPUT", "playbook no longer exists".to_string(), None);
                self.executions.save(&execution).await?;
                return Ok(());
            };

            let outcome = dispatch::dispatch_one(self, &mut execution, &playbook).await;
            self.apply_outcome(&mut execution, outcome);
            self.executions.save(&execution).await?;

            if execution.state.is_terminal() || execution.state == ExecutionState::WaitingApproval {
                if execution.state.is_terminal() {
                    info!(execution_id = %execution.execution_id, state = ?execution.state, "execution reached terminal state");
                }
                return Ok(());
            }
        }
    }

    fn apply_outcome(&self, execution: &mut Execution, outcome: dispatch::StepOutcome) {
        match outcome {
            dispatch::StepOutcome::Advance(next) => {
                if next == crate::domain::playbook::END {
                    let _ = execution.complete();
                    crate::sla_accounting::record_resolution(execution, Utc::now());
                } else {
                    execution.current_step_id = Some(next);
                }
            }
            dispatch::StepOutcome::Suspended => {}
            dispatch::StepOutcome::TerminalSuccess => {
                let _ = execution.complete();
                crate::sla_accounting::record_resolution(execution, Utc::now());
            }
            dispatch::StepOutcome::TerminalFailure { code, message } => {
                let step_id = execution.current_step_id.clone();
                let _ = execution.fail(code, message, step_id);
                crate::sla_accounting::record_resolution(execution, Utc::now());
            }
        }
    }

    /// Persists a pending Approval and transitions the execution to
    /// `WAITING_APPROVAL` (§4.G, §4.H).
    pub async fn start_approval(
        &self,
        execution: &mut Execution,
        step_id: &str,
        approvers: Vec<String>,
        message: String,
        timeout_hours: f64,
    ) -> Result<(), EngineError> {
        let approval = Approval::new(execution.execution_id.clone(), step_id.to_string(), approvers, message, timeout_hours);
        self.approvals
            .save(&approval)
            .await
            .map_err(|_| EngineError::ConnectorFailure("failed to persist approval".to_string()))?;
        execution
            .suspend_for_approval(approval.approval_id)
            .map_err(|_| EngineError::Cancelled)?;
        Ok(())
    }

    /// Resolves an operator's decision (approve/reject) on a pending approval,
    /// resumes the owning execution, and continues dispatch (§4.H).
    pub async fn decide_approval(
        &self,
        approval_id: &ApprovalId,
        decision: ApprovalDecision,
        decider: String,
    ) -> SoarResult<()> {
        let Some(mut approval) = self.approvals.get(approval_id).await? else {
            return Err(SoarError::Persistence(crate::error::PersistenceError::NotFound(
                approval_id.to_string(),
            )));
        };
        if approval.state == crate::domain::approval::ApprovalState::Decided {
            return Err(SoarError::Engine(EngineError::AlreadyDecided));
        }

        approval.state = crate::domain::approval::ApprovalState::Decided;
        approval.decision = Some(decision);
        approval.decider = Some(decider);
        approval.decided_at = Some(Utc::now());
        self.approvals.save(&approval).await?;

        self.resume_execution_after_decision(&approval, decision).await
    }

    /// Invoked both by operator decisions and by the approval sweeper
    /// (timeout path) to resume a suspended execution.
    pub async fn resume_execution_after_decision(
        &self,
        approval: &Approval,
        decision: ApprovalDecision,
    ) -> SoarResult<()> {
        let Some(mut execution) = self.executions.get(&approval.execution_id).await? else {
            return Ok(());
        };
        if execution.state != ExecutionState::WaitingApproval {
            return Ok(());
        }
        let Some(playbook) = self.playbooks.get(&execution.playbook_id).await? else {
            return Ok(());
        };
        let Some(step) = playbook.step(&approval.step_id) else {
            return Ok(());
        };

        execution.resume().map_err(|_| SoarError::Engine(EngineError::Cancelled))?;
        dispatch::finalize_approval_step(&mut execution, step, decision);
        let outcome = dispatch::advance_after_approval_decision(step, &playbook, decision);
        self.apply_outcome(&mut execution, outcome);
        self.executions.save(&execution).await?;

        if !execution.state.is_terminal() {
            self.drive(&execution.execution_id).await?;
        }
        Ok(())
    }

    /// One sweep over pending approvals (§4.H): times out anything past its
    /// `expires_at` and resumes the owning execution. Errors resuming one
    /// approval don't stop the sweep from processing the rest.
    pub async fn sweep_expired_approvals(&self, now: chrono::DateTime<Utc>) -> SoarResult<usize> {
        let expired = self.approvals.find_expired_pending(now).await?;
        let mut timed_out = 0;
        for mut approval in expired {
            approval.state = crate::domain::approval::ApprovalState::Decided;
            approval.decision = Some(ApprovalDecision::TimedOut);
            approval.decider = Some("system:approval_sweeper".to_string());
            approval.decided_at = Some(now);
            if let Err(e) = self.approvals.save(&approval).await {
                error!(approval_id = %approval.approval_id, error = %e, "failed to persist timed-out approval");
                continue;
            }
            if let Err(e) = self
                .resume_execution_after_decision(&approval, ApprovalDecision::TimedOut)
                .await
            {
                error!(approval_id = %approval.approval_id, error = %e, "failed to resume execution after approval timeout");
                continue;
            }
            timed_out += 1;
        }
        Ok(timed_out)
    }

    /// Spawns the periodic background sweeper (§4.H: fixed cadence, default
    /// 30s). The returned handle is liveness-checkable via `is_finished()`.
    pub fn spawn_approval_sweeper(self, interval: std::time::Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match self.sweep_expired_approvals(Utc::now()).await {
                    Ok(n) if n > 0 => info!(count = n, "approval sweep timed out pending approvals"),
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "approval sweep failed"),
                }
            }
        })
    }
}
