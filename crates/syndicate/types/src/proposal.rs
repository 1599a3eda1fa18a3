//! Proposal types: what a group can vote on, and how votes are recorded
//!
//! A proposal is created by a member, collects at most one vote per member
//! until its deadline, and is executed once a strict majority votes FOR.
//! Expiry is never stored; it is derived from the deadline at read time.

use crate::{GroupId, MemberId, ProposalId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Voting window applied when the proposer does not pick one
pub const DEFAULT_VOTING_HOURS: u32 = 48;

/// Longest voting window a proposal may ask for (ten years)
pub const MAX_VOTING_HOURS: u32 = 24 * 365 * 10;

/// The action a proposal asks the group to take
///
/// The numeric codes are the wire values used by the settlement layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalType {
    /// Deploy pooled capital into an option-selling strategy
    ExecuteStrategy,
    /// Withdraw realized profit or capital
    Withdraw,
    /// Admit a member
    AddMember,
    /// Remove a member
    RemoveMember,
    /// Hand the admin role to another member
    ChangeAdmin,
}

impl ProposalType {
    pub const ALL: [ProposalType; 5] = [
        ProposalType::ExecuteStrategy,
        ProposalType::Withdraw,
        ProposalType::AddMember,
        ProposalType::RemoveMember,
        ProposalType::ChangeAdmin,
    ];

    pub fn code(&self) -> u8 {
        match self {
            ProposalType::ExecuteStrategy => 0,
            ProposalType::Withdraw => 1,
            ProposalType::AddMember => 2,
            ProposalType::RemoveMember => 3,
            ProposalType::ChangeAdmin => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalType::ExecuteStrategy => "EXECUTE_STRATEGY",
            ProposalType::Withdraw => "WITHDRAW",
            ProposalType::AddMember => "ADD_MEMBER",
            ProposalType::RemoveMember => "REMOVE_MEMBER",
            ProposalType::ChangeAdmin => "CHANGE_ADMIN",
        }
    }
}

impl std::fmt::Display for ProposalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProposalType {
    type Err = String;

    /// Accepts the wire name (`WITHDRAW`, `withdraw`) or the numeric code (`1`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.parse::<u8>() {
            return Self::from_code(code).ok_or_else(|| format!("unknown proposal type code {}", code));
        }
        let normalized = s.trim().to_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown proposal type '{}'", s))
    }
}

/// A member's vote
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteChoice {
    For,
    Against,
}

impl std::str::FromStr for VoteChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "for" | "yes" | "support" => Ok(VoteChoice::For),
            "against" | "no" => Ok(VoteChoice::Against),
            other => Err(format!("unknown vote choice '{}'", other)),
        }
    }
}

/// Derived lifecycle state of a proposal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    /// Open for votes and execution
    Pending,
    /// Executed (terminal)
    Executed,
    /// Cancelled before execution (terminal)
    Cancelled,
    /// Deadline passed without execution (terminal by inaction)
    Expired,
}

impl ProposalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProposalStatus::Pending)
    }
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProposalStatus::Pending => "PENDING",
            ProposalStatus::Executed => "EXECUTED",
            ProposalStatus::Cancelled => "CANCELLED",
            ProposalStatus::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

/// Receipt returned by the strategy executor for a dispatched proposal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReceipt {
    /// Executor-side reference (transaction hash, order id)
    pub reference: String,
    /// Name of the executor that produced the receipt
    pub executor: String,
    /// When the executor completed the action
    pub executed_at: DateTime<Utc>,
    /// Executor-specific details
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

impl ExecutionReceipt {
    pub fn new(
        reference: impl Into<String>,
        executor: impl Into<String>,
        executed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            reference: reference.into(),
            executor: executor.into(),
            executed_at,
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// A governance proposal scoped to one group
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    /// Globally unique proposal identifier
    pub id: ProposalId,
    /// The group the proposal acts on
    pub group_id: GroupId,
    /// Member who opened the proposal
    pub proposer: MemberId,
    /// Requested action
    pub proposal_type: ProposalType,
    /// Opaque to the ledger; interpreted only by the strategy executor
    pub payload: Vec<u8>,
    /// Member counts, not weighted by contribution
    pub votes_for: u32,
    pub votes_against: u32,
    /// Members that have voted, at most once each
    pub voters: BTreeSet<MemberId>,
    /// When the proposal was opened
    pub created_at: DateTime<Utc>,
    /// Last instant at which votes and execution are accepted
    pub deadline: DateTime<Utc>,
    /// Group size when the proposal was created (snapshot quorum policy)
    pub member_count_at_creation: u32,
    /// Set once by execution; never cleared
    pub executed: bool,
    /// Set once by cancellation; exclusive with `executed`
    pub cancelled: bool,
    /// When the proposal was executed or cancelled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    /// Receipt from a successful dispatch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_receipt: Option<ExecutionReceipt>,
    /// Executor error from a failed dispatch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_error: Option<String>,
}

impl Proposal {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ProposalId,
        group_id: GroupId,
        proposer: MemberId,
        proposal_type: ProposalType,
        payload: Vec<u8>,
        created_at: DateTime<Utc>,
        deadline: DateTime<Utc>,
        member_count_at_creation: u32,
    ) -> Self {
        Self {
            id,
            group_id,
            proposer,
            proposal_type,
            payload,
            votes_for: 0,
            votes_against: 0,
            voters: BTreeSet::new(),
            created_at,
            deadline,
            member_count_at_creation,
            executed: false,
            cancelled: false,
            closed_at: None,
            execution_receipt: None,
            execution_error: None,
        }
    }

    /// Derive the lifecycle state at `now`
    ///
    /// Voting stays open through the deadline instant itself.
    pub fn status_at(&self, now: DateTime<Utc>) -> ProposalStatus {
        if self.executed {
            ProposalStatus::Executed
        } else if self.cancelled {
            ProposalStatus::Cancelled
        } else if now > self.deadline {
            ProposalStatus::Expired
        } else {
            ProposalStatus::Pending
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }

    pub fn has_voted(&self, member: &MemberId) -> bool {
        self.voters.contains(member)
    }

    /// Record one vote; returns false if the member had already voted
    pub fn record_vote(&mut self, member: MemberId, choice: VoteChoice) -> bool {
        if !self.voters.insert(member) {
            return false;
        }
        match choice {
            VoteChoice::For => self.votes_for += 1,
            VoteChoice::Against => self.votes_against += 1,
        }
        true
    }

    pub fn total_votes(&self) -> u32 {
        self.votes_for + self.votes_against
    }
}
