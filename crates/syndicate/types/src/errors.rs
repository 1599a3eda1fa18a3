//! Error types for the governance ledger

use crate::{GroupId, MemberId, ProposalId};

/// Errors that can occur in ledger operations
///
/// Every public operation is total over its documented subset of these
/// kinds; there is no partial success.
#[derive(Debug, thiserror::Error)]
pub enum SyndicateError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    #[error("Member not found: {member} in group {group}")]
    MemberNotFound { group: GroupId, member: MemberId },

    #[error("Proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    #[error("Group {group} is full ({max_members} members)")]
    GroupFull { group: GroupId, max_members: u32 },

    #[error("{member} is already a member of group {group}")]
    AlreadyMember { group: GroupId, member: MemberId },

    #[error("{member} is not a member of group {group}")]
    NotAMember { group: GroupId, member: MemberId },

    #[error("{member} already voted on proposal {proposal}")]
    AlreadyVoted { proposal: ProposalId, member: MemberId },

    #[error("Proposal {0} is closed for voting")]
    ProposalClosed(ProposalId),

    #[error("Proposal {0} has expired")]
    ProposalExpired(ProposalId),

    #[error("Proposal {0} was already executed")]
    AlreadyExecuted(ProposalId),

    #[error("Quorum not met: required {required} votes, have {current}")]
    QuorumNotMet { required: u32, current: u32 },

    #[error("Execution of proposal {proposal} failed: {reason}")]
    ExecutionFailed { proposal: ProposalId, reason: String },

    #[error("Invalid proposal operation: {0}")]
    InvalidProposal(String),

    #[error("{actor} is not allowed to {action}")]
    Unauthorized { actor: MemberId, action: String },

    #[error("Group not active: {0}")]
    GroupInactive(GroupId),

    #[error("Custodian balance mismatch: {0}")]
    CustodianMismatch(String),

    #[error("Custodian unavailable: {0}")]
    CustodianUnavailable(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyndicateError {
    /// Stable machine-readable code for API consumers
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::GroupNotFound(_) => "GROUP_NOT_FOUND",
            Self::MemberNotFound { .. } => "MEMBER_NOT_FOUND",
            Self::ProposalNotFound(_) => "PROPOSAL_NOT_FOUND",
            Self::GroupFull { .. } => "GROUP_FULL",
            Self::AlreadyMember { .. } => "ALREADY_MEMBER",
            Self::NotAMember { .. } => "NOT_A_MEMBER",
            Self::AlreadyVoted { .. } => "ALREADY_VOTED",
            Self::ProposalClosed(_) => "PROPOSAL_CLOSED",
            Self::ProposalExpired(_) => "PROPOSAL_EXPIRED",
            Self::AlreadyExecuted(_) => "ALREADY_EXECUTED",
            Self::QuorumNotMet { .. } => "QUORUM_NOT_MET",
            Self::ExecutionFailed { .. } => "EXECUTION_FAILED",
            Self::InvalidProposal(_) => "INVALID_PROPOSAL",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::GroupInactive(_) => "GROUP_INACTIVE",
            Self::CustodianMismatch(_) => "CUSTODIAN_MISMATCH",
            Self::CustodianUnavailable(_) => "CUSTODIAN_UNAVAILABLE",
            Self::LockPoisoned(_) => "LOCK_POISONED",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Whether the error is a per-call rejection of the request itself,
    /// as opposed to an infrastructure failure around it
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            Self::LockPoisoned(_)
                | Self::Storage(_)
                | Self::Serialization(_)
                | Self::Config(_)
                | Self::CustodianUnavailable(_)
        )
    }
}

/// Result type alias for ledger operations
pub type SyndicateResult<T> = Result<T, SyndicateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        let err = SyndicateError::GroupFull {
            group: GroupId::new(1),
            max_members: 10,
        };
        assert_eq!(err.code(), "GROUP_FULL");
        assert_eq!(err.to_string(), "Group 1 is full (10 members)");

        let err = SyndicateError::QuorumNotMet {
            required: 3,
            current: 2,
        };
        assert_eq!(err.code(), "QUORUM_NOT_MET");
    }

    #[test]
    fn test_rejections_vs_infrastructure() {
        assert!(SyndicateError::ProposalClosed(ProposalId::new(1)).is_rejection());
        assert!(!SyndicateError::Storage("disk full".into()).is_rejection());
    }
}
