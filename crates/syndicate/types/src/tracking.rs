//! Read projections over a group's proposals

use crate::{Group, Proposal, ProposalStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A proposal with its derived status and the quorum it must reach
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalView {
    #[serde(flatten)]
    pub proposal: Proposal,
    pub status: ProposalStatus,
    pub required_quorum: u32,
}

impl ProposalView {
    /// Whether FOR votes already meet the quorum
    pub fn is_quorate(&self) -> bool {
        self.proposal.votes_for >= self.required_quorum
    }
}

/// Governance tracking for one group, as observed at `as_of`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupTracking {
    pub group: Group,
    /// Quorum a proposal created now would need under live membership
    pub current_quorum: u32,
    pub pending: usize,
    pub executed: usize,
    pub cancelled: usize,
    pub expired: usize,
    pub proposals: Vec<ProposalView>,
    pub as_of: DateTime<Utc>,
}

impl GroupTracking {
    pub fn new(group: Group, current_quorum: u32, as_of: DateTime<Utc>) -> Self {
        Self {
            group,
            current_quorum,
            pending: 0,
            executed: 0,
            cancelled: 0,
            expired: 0,
            proposals: Vec::new(),
            as_of,
        }
    }

    /// Append a proposal view and bump the matching status counter
    pub fn push(&mut self, view: ProposalView) {
        match view.status {
            ProposalStatus::Pending => self.pending += 1,
            ProposalStatus::Executed => self.executed += 1,
            ProposalStatus::Cancelled => self.cancelled += 1,
            ProposalStatus::Expired => self.expired += 1,
        }
        self.proposals.push(view);
    }

    pub fn total(&self) -> usize {
        self.proposals.len()
    }
}
