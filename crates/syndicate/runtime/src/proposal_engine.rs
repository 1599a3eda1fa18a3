//! Proposal Engine: proposal lifecycle and quorum-gated resolution
//!
//! A proposal moves from `Pending` to `Executed` or `Cancelled`, or is
//! left behind as `Expired` once its deadline passes. Expiry is never
//! stored; every check compares the deadline against the clock.
//!
//! Operations take the proposal's group state already locked by the
//! registry, so tallies are serialized with joins and deposits. Proposal
//! ids are global, and a ledger-wide index maps each id to its group.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use syndicate_types::{
    ExecutionReceipt, GroupId, GroupTracking, LedgerReceipt, MemberId, Proposal, ProposalId,
    ProposalStatus, ProposalType, ProposalView, ReceiptType, SyndicateError, SyndicateResult,
    VoteChoice, DEFAULT_VOTING_HOURS, MAX_VOTING_HOURS,
};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::QuorumPolicy;
use crate::executor::ApprovedAction;
use crate::group_state::GroupState;
use crate::sequence::IdSequence;

/// Strict majority of `member_count`
pub fn required_quorum(member_count: u32) -> u32 {
    member_count / 2 + 1
}

/// Whether FOR votes reach the quorum; AGAINST votes never block
pub fn is_approved(votes_for: u32, quorum: u32) -> bool {
    votes_for >= quorum
}

/// The Proposal Engine: creates, tallies and resolves proposals
pub struct ProposalEngine {
    sequence: Arc<IdSequence>,
    /// Proposal id → owning group
    index: DashMap<ProposalId, GroupId>,
    clock: Arc<dyn Clock>,
    default_voting_hours: u32,
    quorum_policy: QuorumPolicy,
}

impl ProposalEngine {
    pub fn new(sequence: Arc<IdSequence>, clock: Arc<dyn Clock>) -> Self {
        Self {
            sequence,
            index: DashMap::new(),
            clock,
            default_voting_hours: DEFAULT_VOTING_HOURS,
            quorum_policy: QuorumPolicy::default(),
        }
    }

    pub fn with_default_voting_hours(mut self, hours: u32) -> Self {
        self.default_voting_hours = hours;
        self
    }

    pub fn with_quorum_policy(mut self, policy: QuorumPolicy) -> Self {
        self.quorum_policy = policy;
        self
    }

    /// Index the proposals of a restored group
    pub fn register_group(&self, state: &GroupState) -> SyndicateResult<()> {
        for id in state.proposals.keys() {
            if id.value() >= self.sequence.peek() {
                return Err(SyndicateError::Storage(format!(
                    "proposal {} is ahead of the proposal id sequence",
                    id
                )));
            }
            if self.index.insert(*id, state.id).is_some() {
                return Err(SyndicateError::Storage(format!("proposal {} is filed twice", id)));
            }
        }
        Ok(())
    }

    /// The group a proposal belongs to
    pub fn locate(&self, proposal_id: ProposalId) -> SyndicateResult<GroupId> {
        self.index
            .get(&proposal_id)
            .map(|entry| *entry.value())
            .ok_or(SyndicateError::ProposalNotFound(proposal_id))
    }

    /// Open a proposal on behalf of a member
    pub fn create_proposal(
        &self,
        state: &mut GroupState,
        proposer: &MemberId,
        proposal_type: ProposalType,
        payload: Vec<u8>,
        voting_period_hours: Option<u32>,
    ) -> SyndicateResult<Proposal> {
        state.ensure_active()?;
        state.ensure_member(proposer)?;

        let hours = voting_period_hours.unwrap_or(self.default_voting_hours);
        if hours == 0 || hours > MAX_VOTING_HOURS {
            return Err(SyndicateError::InvalidProposal(format!(
                "voting period must be between 1 and {} hours, got {}",
                MAX_VOTING_HOURS, hours
            )));
        }

        let now = self.clock.now();
        let deadline = Duration::try_hours(i64::from(hours))
            .and_then(|window| now.checked_add_signed(window))
            .ok_or_else(|| {
                SyndicateError::InvalidProposal(format!(
                    "a {} hour voting period overflows the calendar",
                    hours
                ))
            })?;
        let id = ProposalId::new(self.sequence.next_id());
        let proposal = Proposal::new(
            id,
            state.id,
            proposer.clone(),
            proposal_type,
            payload,
            now,
            deadline,
            state.member_count(),
        );

        state.journal.log_receipt(
            LedgerReceipt::new(
                state.id,
                ReceiptType::ProposalCreated,
                proposer.clone(),
                format!("Proposal {} ({}) created", id, proposal_type),
                now,
            )
            .with_metadata("proposalId", id)
            .with_metadata("deadline", proposal.deadline.to_rfc3339()),
        );

        state.proposals.insert(id, proposal.clone());
        self.index.insert(id, state.id);

        info!(
            group = %state.id,
            proposal = %id,
            proposer = %proposer,
            proposal_type = %proposal_type,
            deadline = %proposal.deadline,
            "Proposal created"
        );

        Ok(proposal)
    }

    /// Cast one unweighted vote
    pub fn vote(
        &self,
        state: &mut GroupState,
        proposal_id: ProposalId,
        member_id: &MemberId,
        choice: VoteChoice,
    ) -> SyndicateResult<Proposal> {
        let now = self.clock.now();
        let group_id = state.id;
        let is_member = state.is_member(member_id);

        let proposal = state
            .proposals
            .get_mut(&proposal_id)
            .ok_or(SyndicateError::ProposalNotFound(proposal_id))?;

        if !is_member {
            return Err(SyndicateError::NotAMember {
                group: group_id,
                member: member_id.clone(),
            });
        }
        if proposal.has_voted(member_id) {
            return Err(SyndicateError::AlreadyVoted {
                proposal: proposal_id,
                member: member_id.clone(),
            });
        }
        if proposal.status_at(now) != ProposalStatus::Pending {
            return Err(SyndicateError::ProposalClosed(proposal_id));
        }

        proposal.record_vote(member_id.clone(), choice);
        let snapshot = proposal.clone();

        state.journal.log_receipt(
            LedgerReceipt::new(
                group_id,
                ReceiptType::VoteCast,
                member_id.clone(),
                format!("Voted {:?} on proposal {}", choice, proposal_id),
                now,
            )
            .with_metadata("proposalId", proposal_id)
            .with_metadata("choice", format!("{:?}", choice).to_uppercase()),
        );

        info!(
            group = %group_id,
            proposal = %proposal_id,
            member = %member_id,
            choice = ?choice,
            votes_for = snapshot.votes_for,
            votes_against = snapshot.votes_against,
            "Vote cast"
        );

        Ok(snapshot)
    }

    /// Mark a quorate proposal executed and hand back the action to dispatch
    ///
    /// `executed` is set before the executor sees the action; a failed
    /// dispatch does not revert it.
    pub fn execute_if_approved(
        &self,
        state: &mut GroupState,
        proposal_id: ProposalId,
    ) -> SyndicateResult<ApprovedAction> {
        let now = self.clock.now();
        let group_id = state.id;
        let live_count = state.member_count();
        let policy = self.quorum_policy;

        let proposal = state
            .proposals
            .get_mut(&proposal_id)
            .ok_or(SyndicateError::ProposalNotFound(proposal_id))?;

        if proposal.executed {
            return Err(SyndicateError::AlreadyExecuted(proposal_id));
        }
        if proposal.cancelled {
            return Err(SyndicateError::ProposalClosed(proposal_id));
        }
        if proposal.is_expired_at(now) {
            return Err(SyndicateError::ProposalExpired(proposal_id));
        }

        let quorum = required_quorum(quorum_base(policy, live_count, proposal));
        if !is_approved(proposal.votes_for, quorum) {
            return Err(SyndicateError::QuorumNotMet {
                required: quorum,
                current: proposal.votes_for,
            });
        }

        proposal.executed = true;
        proposal.closed_at = Some(now);

        let action = ApprovedAction {
            proposal_id,
            group_id,
            proposal_type: proposal.proposal_type,
            payload: proposal.payload.clone(),
            votes_for: proposal.votes_for,
            required_quorum: quorum,
            approved_at: now,
        };
        let proposer = proposal.proposer.clone();

        state.journal.log_receipt(
            LedgerReceipt::new(
                group_id,
                ReceiptType::ProposalExecuted,
                proposer,
                format!("Proposal {} approved and executed", proposal_id),
                now,
            )
            .with_metadata("proposalId", proposal_id)
            .with_metadata("votesFor", action.votes_for)
            .with_metadata("quorum", quorum),
        );

        info!(
            group = %group_id,
            proposal = %proposal_id,
            votes_for = action.votes_for,
            quorum,
            "Proposal executed"
        );

        Ok(action)
    }

    /// Attach the executor's outcome to an executed proposal
    pub fn record_execution_outcome(
        &self,
        state: &mut GroupState,
        proposal_id: ProposalId,
        outcome: Result<ExecutionReceipt, String>,
    ) -> SyndicateResult<Proposal> {
        let group_id = state.id;
        let proposal = state
            .proposals
            .get_mut(&proposal_id)
            .ok_or(SyndicateError::ProposalNotFound(proposal_id))?;

        if !proposal.executed {
            return Err(SyndicateError::InvalidProposal(format!(
                "proposal {} has not been executed",
                proposal_id
            )));
        }

        match outcome {
            Ok(receipt) => {
                proposal.execution_receipt = Some(receipt);
                proposal.execution_error = None;
            }
            Err(reason) => {
                warn!(
                    group = %group_id,
                    proposal = %proposal_id,
                    reason = %reason,
                    "Strategy execution failed"
                );
                proposal.execution_error = Some(reason.clone());
                let proposer = proposal.proposer.clone();
                state.journal.log_receipt(
                    LedgerReceipt::new(
                        group_id,
                        ReceiptType::ExecutionFailed,
                        proposer,
                        format!("Execution of proposal {} failed", proposal_id),
                        self.clock.now(),
                    )
                    .with_metadata("proposalId", proposal_id)
                    .with_metadata("reason", reason),
                );
            }
        }

        state
            .proposals
            .get(&proposal_id)
            .cloned()
            .ok_or(SyndicateError::ProposalNotFound(proposal_id))
    }

    /// Withdraw a pending proposal; only its proposer or the group admin may
    pub fn cancel_proposal(
        &self,
        state: &mut GroupState,
        proposal_id: ProposalId,
        actor: &MemberId,
    ) -> SyndicateResult<Proposal> {
        let now = self.clock.now();
        let group_id = state.id;
        let is_admin = state.is_admin(actor);

        let proposal = state
            .proposals
            .get_mut(&proposal_id)
            .ok_or(SyndicateError::ProposalNotFound(proposal_id))?;

        if proposal.proposer != *actor && !is_admin {
            return Err(SyndicateError::Unauthorized {
                actor: actor.clone(),
                action: format!("cancel proposal {}", proposal_id),
            });
        }
        match proposal.status_at(now) {
            ProposalStatus::Pending => {}
            ProposalStatus::Executed => return Err(SyndicateError::AlreadyExecuted(proposal_id)),
            ProposalStatus::Cancelled => {
                return Err(SyndicateError::InvalidProposal(format!(
                    "proposal {} is already cancelled",
                    proposal_id
                )))
            }
            ProposalStatus::Expired => return Err(SyndicateError::ProposalClosed(proposal_id)),
        }

        proposal.cancelled = true;
        proposal.closed_at = Some(now);
        let snapshot = proposal.clone();

        state.journal.log_receipt(
            LedgerReceipt::new(
                group_id,
                ReceiptType::ProposalCancelled,
                actor.clone(),
                format!("Proposal {} cancelled", proposal_id),
                now,
            )
            .with_metadata("proposalId", proposal_id),
        );

        info!(
            group = %group_id,
            proposal = %proposal_id,
            actor = %actor,
            "Proposal cancelled"
        );

        Ok(snapshot)
    }

    /// Quorum a proposal must reach under the configured policy
    pub fn quorum_for(&self, state: &GroupState, proposal: &Proposal) -> u32 {
        required_quorum(quorum_base(self.quorum_policy, state.member_count(), proposal))
    }

    /// A proposal with its derived status, as of now
    pub fn view(&self, state: &GroupState, proposal_id: ProposalId) -> SyndicateResult<ProposalView> {
        let proposal = state
            .proposals
            .get(&proposal_id)
            .ok_or(SyndicateError::ProposalNotFound(proposal_id))?;
        Ok(self.view_at(state, proposal, self.clock.now()))
    }

    /// Per-status counts and every proposal of the group, oldest first
    pub fn tracking(&self, state: &GroupState) -> GroupTracking {
        let now = self.clock.now();
        let mut tracking =
            GroupTracking::new(state.group(), required_quorum(state.member_count()), now);
        for proposal in state.proposals.values() {
            tracking.push(self.view_at(state, proposal, now));
        }
        tracking
    }

    pub fn proposal_count(&self) -> usize {
        self.index.len()
    }

    pub fn quorum_policy(&self) -> QuorumPolicy {
        self.quorum_policy
    }

    pub fn sequence(&self) -> &Arc<IdSequence> {
        &self.sequence
    }

    fn view_at(&self, state: &GroupState, proposal: &Proposal, now: DateTime<Utc>) -> ProposalView {
        ProposalView {
            status: proposal.status_at(now),
            required_quorum: self.quorum_for(state, proposal),
            proposal: proposal.clone(),
        }
    }
}

fn quorum_base(policy: QuorumPolicy, live_count: u32, proposal: &Proposal) -> u32 {
    match policy {
        QuorumPolicy::Live => live_count,
        QuorumPolicy::Snapshot => proposal.member_count_at_creation,
    }
}
