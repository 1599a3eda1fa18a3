//! Strategy executor: the outbound seam for approved proposals.
//!
//! The executor is a trait so that the facade can be tested with a
//! simulated executor (no real capital deployment) while production plugs
//! in an options-trading or settlement backend. It is invoked exactly once
//! per approved proposal and never retried by the ledger.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use syndicate_types::{ExecutionReceipt, GroupId, ProposalId, ProposalType};

// ── Approved Action ─────────────────────────────────────────────────────

/// What the engine hands to the executor once a proposal has been approved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedAction {
    pub proposal_id: ProposalId,
    pub group_id: GroupId,
    pub proposal_type: ProposalType,
    /// Passed through untouched from the proposal.
    pub payload: Vec<u8>,
    pub votes_for: u32,
    pub required_quorum: u32,
    pub approved_at: DateTime<Utc>,
}

// ── Executor Trait ──────────────────────────────────────────────────────

/// Failure reported by a strategy executor.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutorError {
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Turns an approved proposal's payload into an actual capital action.
pub trait StrategyExecutor: Send + Sync {
    /// Dispatch an approved action and return the executor's receipt.
    fn execute(&self, action: &ApprovedAction) -> Result<ExecutionReceipt, ExecutorError>;

    /// Name of this executor for logging and receipts.
    fn name(&self) -> &str;
}

// ── Simulated Executor ─────────────────────────────────────────────────

/// A simulated executor that records dispatches without moving capital.
///
/// Configurable to succeed or fail; every dispatch is kept so tests can
/// assert it happened exactly once.
pub struct SimulatedExecutor {
    should_succeed: bool,
    dispatched: Mutex<Vec<ApprovedAction>>,
}

impl SimulatedExecutor {
    /// If `should_succeed` is true, all executions succeed. Otherwise, they fail.
    pub fn new(should_succeed: bool) -> Self {
        Self {
            should_succeed,
            dispatched: Mutex::new(Vec::new()),
        }
    }

    /// Actions dispatched so far, in order
    pub fn dispatched(&self) -> Vec<ApprovedAction> {
        match self.dispatched.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatched().len()
    }
}

impl StrategyExecutor for SimulatedExecutor {
    fn execute(&self, action: &ApprovedAction) -> Result<ExecutionReceipt, ExecutorError> {
        match self.dispatched.lock() {
            Ok(mut guard) => guard.push(action.clone()),
            Err(poisoned) => poisoned.into_inner().push(action.clone()),
        }

        if self.should_succeed {
            Ok(ExecutionReceipt::new(
                format!("sim-{}-{}", action.group_id, action.proposal_id),
                self.name(),
                Utc::now(),
            )
            .with_detail("proposalType", action.proposal_type.as_str())
            .with_detail("payloadBytes", action.payload.len().to_string()))
        } else {
            Err(ExecutorError::Rejected(format!(
                "simulated failure of {} for proposal {}",
                action.proposal_type, action.proposal_id
            )))
        }
    }

    fn name(&self) -> &str {
        "simulated-executor"
    }
}
