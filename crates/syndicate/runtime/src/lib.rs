//! Syndicate Runtime
//!
//! This crate provides the runtime for pooled-fund groups: members pool
//! capital, own a proportional share of the pool, and vote on proposals
//! that deploy or withdraw it.
//!
//! # Architecture
//!
//! The [`GovernanceFacade`] is the main entry point. It composes:
//!
//! - [`ShareLedger`] - Contribution accounting and basis-point shares
//! - [`MembershipRegistry`] - Group capacity, admin designation, join and deposit rules
//! - [`ProposalEngine`] - Proposal lifecycle, one-member-one-vote tallies, quorum and deadlines
//! - [`StrategyExecutor`] - Outbound seam that turns an approved proposal into a capital action
//! - [`CapitalCustodian`] - Read-only seam to the external holder of funds
//! - [`SnapshotStore`] - Snapshot persistence so the ledger survives restarts
//!
//! # Key Invariants
//!
//! 1. A group's total deposited equals the sum of its members' contributions
//! 2. A group never exceeds its member capacity
//! 3. A member votes at most once per proposal
//! 4. Executed and cancelled are exclusive and permanent
//! 5. Every mutation of a group is serialized and produces a receipt
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use syndicate_runtime::{GovernanceFacade, SimulatedExecutor};
//! use syndicate_types::{Amount, BasisPoints, MemberId, ProposalType, VoteChoice};
//!
//! let facade = GovernanceFacade::new(Arc::new(SimulatedExecutor::new(true)));
//! let (alice, bob) = (MemberId::new("alice"), MemberId::new("bob"));
//!
//! let group = facade.create_group("Grup Test", alice.clone(), Amount::new(1000)).unwrap();
//! facade.join_group(group.id, bob.clone(), Amount::new(1000)).unwrap();
//! assert_eq!(facade.share_of(group.id, &alice).unwrap(), BasisPoints::new(5000));
//!
//! let proposal = facade
//!     .create_proposal(group.id, &alice, ProposalType::Withdraw, vec![], None)
//!     .unwrap();
//! facade.vote(proposal, &alice, VoteChoice::For).unwrap();
//! facade.vote(proposal, &bob, VoteChoice::For).unwrap();
//! assert!(facade.execute_if_approved(proposal).is_ok());
//! ```

#![deny(unsafe_code)]

pub mod clock;
pub mod config;
pub mod continuity;
pub mod custodian;
pub mod executor;
pub mod governance;
pub mod group_state;
pub mod membership_registry;
pub mod proposal_engine;
pub mod sequence;
pub mod share_ledger;
pub mod telemetry;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{GovernanceConfig, LoggingConfig, QuorumPolicy, StorageConfig};
pub use continuity::{
    FileSnapshotStore, InMemorySnapshotStore, LedgerLock, LedgerSnapshot, SnapshotStore,
};
pub use custodian::{CapitalCustodian, InMemoryCustodian};
pub use executor::{ApprovedAction, ExecutorError, SimulatedExecutor, StrategyExecutor};
pub use governance::{CustodianSyncReport, ExecutionResult, GovernanceFacade};
pub use group_state::GroupState;
pub use membership_registry::{GroupCell, MembershipRegistry};
pub use proposal_engine::{is_approved, required_quorum, ProposalEngine};
pub use sequence::IdSequence;
pub use share_ledger::ShareLedger;
pub use telemetry::init_tracing;
