//! Governance Facade: the single entry point for collaborators
//!
//! Composes the membership registry, share ledger and proposal engine,
//! hands approved proposals to the strategy executor, reconciles against
//! the capital custodian, and persists a snapshot after every successful
//! mutation when a store is attached. It keeps no state of its own.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use syndicate_types::{
    Amount, ApiResponse, AuditJournal, BasisPoints, ExecutionReceipt, Group, GroupId,
    GroupMembers, GroupTracking, LedgerReceipt, MemberId, Proposal, ProposalId, ProposalType,
    ProposalView, ReceiptType, SyndicateError, SyndicateResult, VoteChoice,
};
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{GovernanceConfig, StorageConfig};
use crate::continuity::{FileSnapshotStore, InMemorySnapshotStore, LedgerSnapshot, SnapshotStore};
use crate::custodian::CapitalCustodian;
use crate::executor::StrategyExecutor;
use crate::membership_registry::MembershipRegistry;
use crate::proposal_engine::ProposalEngine;
use crate::sequence::IdSequence;

/// Outcome of a successfully dispatched proposal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub proposal_id: ProposalId,
    pub group_id: GroupId,
    pub proposal_type: ProposalType,
    pub receipt: ExecutionReceipt,
    /// False when the snapshot store refused the outcome; the ledger keeps
    /// it in memory and writes it with the next successful persist
    pub persisted: bool,
}

/// Contributions credited by a custodian sync
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustodianSyncReport {
    pub group_id: GroupId,
    /// Members whose recorded contribution was raised, with the amount added
    pub credited: Vec<(MemberId, Amount)>,
    pub total_deposited: Amount,
}

pub struct GovernanceFacade {
    registry: MembershipRegistry,
    engine: ProposalEngine,
    executor: Arc<dyn StrategyExecutor>,
    custodian: Option<Arc<dyn CapitalCustodian>>,
    store: Option<Arc<dyn SnapshotStore>>,
    clock: Arc<dyn Clock>,
    /// Serializes snapshot writes so the last write holds the newest state
    persist_lock: Mutex<()>,
}

impl GovernanceFacade {
    /// An in-memory ledger with default settings and the system clock
    pub fn new(executor: Arc<dyn StrategyExecutor>) -> Self {
        Self::with_parts(
            &GovernanceConfig::default(),
            Arc::new(SystemClock),
            Arc::new(IdSequence::new()),
            Arc::new(IdSequence::new()),
            executor,
        )
    }

    /// Assemble a ledger from explicit collaborators and id sequences
    pub fn with_parts(
        config: &GovernanceConfig,
        clock: Arc<dyn Clock>,
        group_ids: Arc<IdSequence>,
        proposal_ids: Arc<IdSequence>,
        executor: Arc<dyn StrategyExecutor>,
    ) -> Self {
        let registry = MembershipRegistry::new(group_ids, Arc::clone(&clock))
            .with_max_members(config.max_members);
        let engine = build_engine(config, proposal_ids, Arc::clone(&clock));
        Self::assemble(registry, engine, clock, executor)
    }

    /// Attach the custodian consulted by [`sync_from_custodian`](Self::sync_from_custodian)
    pub fn with_custodian(mut self, custodian: Arc<dyn CapitalCustodian>) -> Self {
        self.custodian = Some(custodian);
        self
    }

    /// Persist a snapshot into `store` after every mutation
    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Open the ledger described by `config`, resuming from its store
    pub fn open(
        config: &GovernanceConfig,
        clock: Arc<dyn Clock>,
        executor: Arc<dyn StrategyExecutor>,
    ) -> SyndicateResult<Self> {
        config.validate()?;
        let store: Arc<dyn SnapshotStore> = match &config.storage {
            StorageConfig::Memory => Arc::new(InMemorySnapshotStore::new()),
            StorageConfig::File { path } => Arc::new(FileSnapshotStore::new(path.clone())),
        };

        let facade = match store.load_latest()? {
            Some(snapshot) => Self::restore(snapshot, config, clock, executor)?,
            None => Self::with_parts(
                config,
                clock,
                Arc::new(IdSequence::new()),
                Arc::new(IdSequence::new()),
                executor,
            ),
        };

        info!(store = store.name(), groups = facade.registry.group_count(), "Ledger opened");
        Ok(facade.with_store(store))
    }

    /// Rebuild a ledger from a snapshot, re-verifying every invariant
    pub fn restore(
        snapshot: LedgerSnapshot,
        config: &GovernanceConfig,
        clock: Arc<dyn Clock>,
        executor: Arc<dyn StrategyExecutor>,
    ) -> SyndicateResult<Self> {
        snapshot.verify()?;

        let engine = build_engine(
            config,
            Arc::new(IdSequence::starting_at(snapshot.next_proposal_id)),
            Arc::clone(&clock),
        );
        for state in &snapshot.groups {
            engine.register_group(state)?;
        }

        let snapshot_id = snapshot.snapshot_id;
        let registry = MembershipRegistry::from_states(
            snapshot.groups,
            Arc::new(IdSequence::starting_at(snapshot.next_group_id)),
            Arc::clone(&clock),
            config.max_members,
        )?;

        info!(
            snapshot_id = %snapshot_id,
            groups = registry.group_count(),
            proposals = engine.proposal_count(),
            "Ledger restored from snapshot"
        );

        Ok(Self::assemble(registry, engine, clock, executor))
    }

    fn assemble(
        registry: MembershipRegistry,
        engine: ProposalEngine,
        clock: Arc<dyn Clock>,
        executor: Arc<dyn StrategyExecutor>,
    ) -> Self {
        Self {
            registry,
            engine,
            executor,
            custodian: None,
            store: None,
            clock,
            persist_lock: Mutex::new(()),
        }
    }

    // ── Membership ──────────────────────────────────────────────────────

    pub fn create_group(
        &self,
        name: impl Into<String>,
        admin: MemberId,
        initial_deposit: Amount,
    ) -> SyndicateResult<Group> {
        let group = self.registry.create_group(name, admin, initial_deposit)?;
        self.persist()?;
        Ok(group)
    }

    pub fn join_group(
        &self,
        group_id: GroupId,
        member_id: MemberId,
        deposit: Amount,
    ) -> SyndicateResult<Group> {
        let group = self.registry.join_group(group_id, member_id, deposit)?;
        self.persist()?;
        Ok(group)
    }

    pub fn deposit(
        &self,
        group_id: GroupId,
        member_id: &MemberId,
        amount: Amount,
    ) -> SyndicateResult<Group> {
        let group = self.registry.deposit(group_id, member_id, amount)?;
        self.persist()?;
        Ok(group)
    }

    // ── Proposals ───────────────────────────────────────────────────────

    pub fn create_proposal(
        &self,
        group_id: GroupId,
        proposer: &MemberId,
        proposal_type: ProposalType,
        payload: Vec<u8>,
        voting_period_hours: Option<u32>,
    ) -> SyndicateResult<ProposalId> {
        let proposal = self.registry.with_group(group_id, |state| {
            self.engine
                .create_proposal(state, proposer, proposal_type, payload, voting_period_hours)
        })?;
        self.persist()?;
        Ok(proposal.id)
    }

    pub fn vote(
        &self,
        proposal_id: ProposalId,
        member_id: &MemberId,
        choice: VoteChoice,
    ) -> SyndicateResult<Proposal> {
        let group_id = self.engine.locate(proposal_id)?;
        let proposal = self.registry.with_group(group_id, |state| {
            self.engine.vote(state, proposal_id, member_id, choice)
        })?;
        self.persist()?;
        Ok(proposal)
    }

    /// Execute a quorate proposal and dispatch it to the strategy executor
    ///
    /// The proposal is marked executed before dispatch and dispatched
    /// exactly once, whether or not its snapshot could be written. A failed
    /// dispatch is recorded on the proposal and surfaced as
    /// `ExecutionFailed`; it is never rolled back or retried here.
    pub fn execute_if_approved(&self, proposal_id: ProposalId) -> SyndicateResult<ExecutionResult> {
        let group_id = self.engine.locate(proposal_id)?;
        let action = self.registry.with_group(group_id, |state| {
            self.engine.execute_if_approved(state, proposal_id)
        })?;
        if let Err(e) = self.persist() {
            warn!(
                proposal = %proposal_id,
                error = %e,
                "Dispatching before the executed flag was persisted"
            );
        }

        debug!(
            proposal = %proposal_id,
            executor = self.executor.name(),
            "Dispatching approved proposal"
        );
        let outcome = self.executor.execute(&action);

        let recorded = outcome.clone().map_err(|e| e.to_string());
        self.registry.with_group(group_id, |state| {
            self.engine
                .record_execution_outcome(state, proposal_id, recorded)
        })?;

        let persisted = self.persist();
        if let Err(e) = &persisted {
            error!(
                proposal = %proposal_id,
                error = %e,
                "Execution outcome not persisted"
            );
        }

        match outcome {
            Ok(receipt) => Ok(ExecutionResult {
                proposal_id,
                group_id,
                proposal_type: action.proposal_type,
                receipt,
                persisted: persisted.is_ok(),
            }),
            Err(e) => Err(SyndicateError::ExecutionFailed {
                proposal: proposal_id,
                reason: e.to_string(),
            }),
        }
    }

    pub fn cancel_proposal(&self, proposal_id: ProposalId, actor: &MemberId) -> SyndicateResult<Proposal> {
        let group_id = self.engine.locate(proposal_id)?;
        let proposal = self.registry.with_group(group_id, |state| {
            self.engine.cancel_proposal(state, proposal_id, actor)
        })?;
        self.persist()?;
        Ok(proposal)
    }

    // ── Custodian ───────────────────────────────────────────────────────

    /// Raise recorded contributions to the custodian's balances
    ///
    /// All-or-nothing: if the custodian holds less than the ledger records
    /// for any member, nothing changes.
    pub fn sync_from_custodian(&self, group_id: GroupId) -> SyndicateResult<CustodianSyncReport> {
        let custodian = self
            .custodian
            .as_ref()
            .ok_or_else(|| SyndicateError::CustodianUnavailable("no custodian attached".into()))?;

        let report = self.registry.with_group(group_id, |state| {
            state.ensure_active()?;

            let mut credited = Vec::new();
            for record in state.shares.records() {
                let held = custodian.balance_of(group_id, &record.member_id)?;
                match held.checked_sub(record.contribution) {
                    None => {
                        return Err(SyndicateError::CustodianMismatch(format!(
                            "custodian holds {} for {} but the ledger records {}",
                            held, record.member_id, record.contribution
                        )))
                    }
                    Some(delta) if delta.is_zero() => {}
                    Some(delta) => credited.push((record.member_id.clone(), delta)),
                }
            }

            let expected = credited
                .iter()
                .try_fold(state.shares.total_deposited(), |total, (_, delta)| {
                    total.checked_add(*delta)
                })
                .ok_or_else(|| {
                    SyndicateError::CustodianMismatch(
                        "custodian balances overflow the pool total".into(),
                    )
                })?;
            let custodian_total = custodian.total_deposited(group_id)?;
            if custodian_total < expected {
                return Err(SyndicateError::CustodianMismatch(format!(
                    "custodian total {} is below the ledger total {}",
                    custodian_total, expected
                )));
            }

            let now = self.clock.now();
            for (member_id, delta) in &credited {
                state.shares.record_contribution(member_id, *delta)?;
                state.journal.log_receipt(
                    LedgerReceipt::new(
                        group_id,
                        ReceiptType::CustodianSync,
                        member_id.clone(),
                        format!("Custodian credited {}", delta),
                        now,
                    )
                    .with_metadata("amount", delta),
                );
            }

            Ok(CustodianSyncReport {
                group_id,
                credited,
                total_deposited: state.shares.total_deposited(),
            })
        });

        let report = match report {
            Ok(report) => report,
            Err(e) => {
                warn!(group = %group_id, error = %e, "Custodian sync rejected");
                return Err(e);
            }
        };

        info!(
            group = %group_id,
            credited = report.credited.len(),
            total = %report.total_deposited,
            "Custodian sync applied"
        );

        if !report.credited.is_empty() {
            self.persist()?;
        }
        Ok(report)
    }

    // ── Reads ───────────────────────────────────────────────────────────

    pub fn get_group(&self, group_id: GroupId) -> SyndicateResult<Group> {
        self.registry.get_group(group_id)
    }

    pub fn get_group_members(&self, group_id: GroupId) -> SyndicateResult<GroupMembers> {
        self.registry.members(group_id)
    }

    pub fn get_tracking(&self, group_id: GroupId) -> SyndicateResult<GroupTracking> {
        self.registry
            .with_group(group_id, |state| Ok(self.engine.tracking(state)))
    }

    pub fn get_proposal(&self, proposal_id: ProposalId) -> SyndicateResult<ProposalView> {
        let group_id = self.engine.locate(proposal_id)?;
        self.registry
            .with_group(group_id, |state| self.engine.view(state, proposal_id))
    }

    pub fn share_of(&self, group_id: GroupId, member_id: &MemberId) -> SyndicateResult<BasisPoints> {
        self.registry.share_of(group_id, member_id)
    }

    pub fn is_member(&self, group_id: GroupId, member_id: &MemberId) -> bool {
        self.registry.is_member(group_id, member_id)
    }

    pub fn journal(&self, group_id: GroupId) -> SyndicateResult<AuditJournal> {
        self.registry
            .with_group(group_id, |state| Ok(state.journal.clone()))
    }

    pub fn registry(&self) -> &MembershipRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &ProposalEngine {
        &self.engine
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Capture the whole ledger
    pub fn snapshot(&self) -> SyndicateResult<LedgerSnapshot> {
        let groups = self.registry.states()?;
        // Read the counters after the groups so every captured id is below them
        LedgerSnapshot::new(
            groups,
            self.registry.sequence().peek(),
            self.engine.sequence().peek(),
            self.clock.now(),
        )
    }

    /// Write a snapshot to the attached store, if any
    pub fn persist(&self) -> SyndicateResult<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let _guard = self
            .persist_lock
            .lock()
            .map_err(|_| SyndicateError::LockPoisoned("persist".into()))?;

        let snapshot = self.snapshot()?;
        store.save(&snapshot)?;
        debug!(
            store = store.name(),
            snapshot_id = %snapshot.snapshot_id,
            "Ledger persisted"
        );
        Ok(())
    }

    /// Wrap a result in the collaborator-facing envelope
    pub fn respond<T>(result: SyndicateResult<T>) -> ApiResponse<T> {
        if let Err(e) = &result {
            debug!(code = e.code(), error = %e, "Request rejected");
        }
        result.into()
    }
}

fn build_engine(
    config: &GovernanceConfig,
    proposal_ids: Arc<IdSequence>,
    clock: Arc<dyn Clock>,
) -> ProposalEngine {
    ProposalEngine::new(proposal_ids, clock)
        .with_default_voting_hours(config.default_voting_hours)
        .with_quorum_policy(config.quorum_policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custodian::InMemoryCustodian;
    use crate::executor::SimulatedExecutor;

    fn make_facade() -> GovernanceFacade {
        GovernanceFacade::new(Arc::new(SimulatedExecutor::new(true)))
    }

    #[test]
    fn test_create_group_and_read_back() {
        let facade = make_facade();
        let group = facade
            .create_group("Grup Test", MemberId::new("alice"), Amount::new(1000))
            .unwrap();

        assert_eq!(facade.get_group(group.id).unwrap(), group);
        assert_eq!(facade.journal(group.id).unwrap().receipt_count(), 1);
    }

    #[test]
    fn test_execution_failure_is_surfaced_not_rolled_back() {
        let executor = Arc::new(SimulatedExecutor::new(false));
        let facade = GovernanceFacade::new(executor.clone());
        let group = facade
            .create_group("g", MemberId::new("alice"), Amount::new(10))
            .unwrap();
        let alice = MemberId::new("alice");
        let id = facade
            .create_proposal(group.id, &alice, ProposalType::ExecuteStrategy, vec![9], None)
            .unwrap();
        facade.vote(id, &alice, VoteChoice::For).unwrap();

        let err = facade.execute_if_approved(id).unwrap_err();
        assert!(matches!(err, SyndicateError::ExecutionFailed { .. }));

        let view = facade.get_proposal(id).unwrap();
        assert!(view.proposal.executed);
        assert!(view.proposal.execution_error.is_some());
        assert_eq!(executor.dispatch_count(), 1);

        assert!(matches!(
            facade.execute_if_approved(id),
            Err(SyndicateError::AlreadyExecuted(_))
        ));
        assert_eq!(executor.dispatch_count(), 1);
    }

    #[test]
    fn test_oversized_voting_window_leaves_group_usable() {
        let facade = make_facade();
        let alice = MemberId::new("alice");
        let group = facade.create_group("g", alice.clone(), Amount::new(10)).unwrap();

        assert!(matches!(
            facade.create_proposal(group.id, &alice, ProposalType::Withdraw, vec![], Some(u32::MAX)),
            Err(SyndicateError::InvalidProposal(_))
        ));

        facade.deposit(group.id, &alice, Amount::new(1)).unwrap();
        let id = facade
            .create_proposal(group.id, &alice, ProposalType::Withdraw, vec![], Some(1))
            .unwrap();
        assert_eq!(id, ProposalId::new(1));
    }

    #[test]
    fn test_unknown_proposal() {
        let facade = make_facade();
        assert!(matches!(
            facade.vote(ProposalId::new(5), &MemberId::new("a"), VoteChoice::For),
            Err(SyndicateError::ProposalNotFound(_))
        ));
        assert!(matches!(
            facade.execute_if_approved(ProposalId::new(5)),
            Err(SyndicateError::ProposalNotFound(_))
        ));
    }

    #[test]
    fn test_sync_requires_custodian() {
        let facade = make_facade();
        let group = facade
            .create_group("g", MemberId::new("alice"), Amount::new(10))
            .unwrap();
        assert!(matches!(
            facade.sync_from_custodian(group.id),
            Err(SyndicateError::CustodianUnavailable(_))
        ));
    }

    #[test]
    fn test_sync_credits_higher_balances() {
        let custodian = Arc::new(InMemoryCustodian::new());
        let facade = make_facade().with_custodian(custodian.clone());
        let group = facade
            .create_group("g", MemberId::new("alice"), Amount::new(100))
            .unwrap();
        facade
            .join_group(group.id, MemberId::new("bob"), Amount::new(100))
            .unwrap();

        custodian
            .set_balance(group.id, MemberId::new("alice"), Amount::new(300))
            .unwrap();
        custodian
            .set_balance(group.id, MemberId::new("bob"), Amount::new(100))
            .unwrap();

        let report = facade.sync_from_custodian(group.id).unwrap();
        assert_eq!(report.credited, vec![(MemberId::new("alice"), Amount::new(200))]);
        assert_eq!(report.total_deposited, Amount::new(400));
        assert_eq!(
            facade.share_of(group.id, &MemberId::new("alice")).unwrap(),
            BasisPoints::new(7500)
        );
    }

    #[test]
    fn test_sync_mismatch_changes_nothing() {
        let custodian = Arc::new(InMemoryCustodian::new());
        let facade = make_facade().with_custodian(custodian.clone());
        let group = facade
            .create_group("g", MemberId::new("alice"), Amount::new(100))
            .unwrap();
        facade
            .join_group(group.id, MemberId::new("bob"), Amount::new(100))
            .unwrap();

        custodian
            .set_balance(group.id, MemberId::new("alice"), Amount::new(500))
            .unwrap();
        custodian
            .set_balance(group.id, MemberId::new("bob"), Amount::new(50))
            .unwrap();

        assert!(matches!(
            facade.sync_from_custodian(group.id),
            Err(SyndicateError::CustodianMismatch(_))
        ));
        assert_eq!(facade.get_group(group.id).unwrap().total_deposited, Amount::new(200));
    }

    #[test]
    fn test_sync_rejects_balances_overflowing_the_pool() {
        let custodian = Arc::new(InMemoryCustodian::new());
        let facade = make_facade().with_custodian(custodian.clone());
        let alice = MemberId::new("alice");
        let group = facade.create_group("g", alice.clone(), Amount::new(100)).unwrap();
        facade
            .join_group(group.id, MemberId::new("bob"), Amount::new(100))
            .unwrap();

        custodian
            .set_balance(group.id, alice.clone(), Amount::new(u64::MAX))
            .unwrap();
        custodian
            .set_balance(group.id, MemberId::new("bob"), Amount::new(u64::MAX))
            .unwrap();

        assert!(matches!(
            facade.sync_from_custodian(group.id),
            Err(SyndicateError::CustodianMismatch(_))
        ));

        // the group stays usable and unchanged
        assert_eq!(facade.get_group(group.id).unwrap().total_deposited, Amount::new(200));
        let group = facade.deposit(group.id, &alice, Amount::new(1)).unwrap();
        assert_eq!(group.total_deposited, Amount::new(201));
    }

    #[test]
    fn test_respond_envelope() {
        let facade = make_facade();
        let ok = GovernanceFacade::respond(
            facade.create_group("g", MemberId::new("alice"), Amount::new(1)),
        );
        assert!(ok.success);
        assert_eq!(ok.data.map(|g| g.member_count), Some(1));

        let err = GovernanceFacade::respond(facade.get_group(GroupId::new(42)));
        assert!(!err.success);
        assert_eq!(err.code.as_deref(), Some("GROUP_NOT_FOUND"));
    }
}
