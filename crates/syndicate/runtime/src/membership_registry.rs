//! Membership Registry: group and member lifecycle
//!
//! Owns every group's state and enforces capacity, admin designation and
//! join rules. Each group sits behind its own mutex: all mutations of one
//! group are serialized, while operations on different groups run in
//! parallel. Member admissions and deposits emit journal receipts.

use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use syndicate_types::{
    Amount, BasisPoints, Group, GroupId, GroupMembers, LedgerReceipt, MemberId, MemberView,
    ReceiptType, SyndicateError, SyndicateResult, MAX_MEMBERS,
};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::group_state::GroupState;
use crate::sequence::IdSequence;
use crate::share_ledger::validate_amount;

/// A group's state behind its mutual-exclusion boundary
pub type GroupCell = Arc<Mutex<GroupState>>;

/// Lock a group cell, mapping poison to a ledger error
pub(crate) fn lock_cell(cell: &GroupCell) -> SyndicateResult<MutexGuard<'_, GroupState>> {
    cell.lock()
        .map_err(|_| SyndicateError::LockPoisoned("group state".into()))
}

/// Registry of all groups in the ledger
pub struct MembershipRegistry {
    groups: DashMap<GroupId, GroupCell>,
    sequence: Arc<IdSequence>,
    clock: Arc<dyn Clock>,
    max_members: u32,
}

impl MembershipRegistry {
    /// Create an empty registry drawing group ids from `sequence`
    pub fn new(sequence: Arc<IdSequence>, clock: Arc<dyn Clock>) -> Self {
        Self {
            groups: DashMap::new(),
            sequence,
            clock,
            max_members: MAX_MEMBERS,
        }
    }

    /// Override group capacity
    pub fn with_max_members(mut self, max_members: u32) -> Self {
        self.max_members = max_members;
        self
    }

    /// Rebuild a registry from restored group states
    pub fn from_states(
        states: Vec<GroupState>,
        sequence: Arc<IdSequence>,
        clock: Arc<dyn Clock>,
        max_members: u32,
    ) -> SyndicateResult<Self> {
        let registry = Self::new(sequence, clock).with_max_members(max_members);
        for state in states {
            state.verify(max_members)?;
            if state.id.value() >= registry.sequence.peek() {
                return Err(SyndicateError::Storage(format!(
                    "group {} is ahead of the group id sequence",
                    state.id
                )));
            }
            if registry
                .groups
                .insert(state.id, Arc::new(Mutex::new(state)))
                .is_some()
            {
                return Err(SyndicateError::Storage("duplicate group id".into()));
            }
        }
        Ok(registry)
    }

    /// Create a group with `admin` as its first member
    pub fn create_group(
        &self,
        name: impl Into<String>,
        admin: MemberId,
        initial_deposit: Amount,
    ) -> SyndicateResult<Group> {
        validate_amount(initial_deposit)?;

        let name = name.into();
        let now = self.clock.now();
        let id = GroupId::new(self.sequence.next_id());

        let mut state = GroupState::new(id, name.clone(), admin.clone(), now);
        state.shares.admit(admin.clone(), initial_deposit, now)?;
        state.journal.log_receipt(
            LedgerReceipt::new(
                id,
                ReceiptType::GroupCreated,
                admin.clone(),
                format!("Group '{}' created", name),
                now,
            )
            .with_metadata("initialDeposit", initial_deposit),
        );

        let group = state.group();
        self.groups.insert(id, Arc::new(Mutex::new(state)));

        info!(
            group = %id,
            admin = %admin,
            deposit = %initial_deposit,
            "Group created"
        );

        Ok(group)
    }

    /// Admit a new member with an initial deposit
    pub fn join_group(
        &self,
        group_id: GroupId,
        member_id: MemberId,
        deposit: Amount,
    ) -> SyndicateResult<Group> {
        self.with_group(group_id, |state| {
            state.ensure_active()?;
            if state.member_count() >= self.max_members {
                return Err(SyndicateError::GroupFull {
                    group: group_id,
                    max_members: self.max_members,
                });
            }

            let now = self.clock.now();
            let seat = state.shares.admit(member_id.clone(), deposit, now)?.seat;
            state.journal.log_receipt(
                LedgerReceipt::new(
                    group_id,
                    ReceiptType::MemberJoined,
                    member_id.clone(),
                    format!("Joined as member #{}", seat),
                    now,
                )
                .with_metadata("deposit", deposit),
            );

            info!(
                group = %group_id,
                member = %member_id,
                seat,
                deposit = %deposit,
                "Member joined group"
            );

            Ok(state.group())
        })
    }

    /// Add to an existing member's contribution
    pub fn deposit(
        &self,
        group_id: GroupId,
        member_id: &MemberId,
        amount: Amount,
    ) -> SyndicateResult<Group> {
        self.with_group(group_id, |state| {
            state.ensure_active()?;
            state.ensure_member(member_id)?;
            state.shares.record_contribution(member_id, amount)?;

            state.journal.log_receipt(
                LedgerReceipt::new(
                    group_id,
                    ReceiptType::DepositRecorded,
                    member_id.clone(),
                    format!("Deposit of {}", amount),
                    self.clock.now(),
                )
                .with_metadata("amount", amount),
            );

            info!(
                group = %group_id,
                member = %member_id,
                amount = %amount,
                total = %state.shares.total_deposited(),
                "Deposit recorded"
            );

            Ok(state.group())
        })
    }

    /// Whether `member_id` belongs to the group; false for unknown groups
    pub fn is_member(&self, group_id: GroupId, member_id: &MemberId) -> bool {
        self.with_group(group_id, |state| Ok(state.is_member(member_id)))
            .unwrap_or(false)
    }

    /// Floored share of the pool owned by a member
    pub fn share_of(&self, group_id: GroupId, member_id: &MemberId) -> SyndicateResult<BasisPoints> {
        self.with_group(group_id, |state| state.shares.share_of(member_id))
    }

    pub fn get_group(&self, group_id: GroupId) -> SyndicateResult<Group> {
        self.with_group(group_id, |state| Ok(state.group()))
    }

    /// Members in join order with their derived shares
    pub fn members(&self, group_id: GroupId) -> SyndicateResult<GroupMembers> {
        self.with_group(group_id, |state| {
            let members = state
                .shares
                .share_table()
                .into_iter()
                .map(|(record, share)| MemberView {
                    member_id: record.member_id.clone(),
                    contribution: record.contribution,
                    share_percent: share,
                    seat: record.seat,
                    is_admin: state.is_admin(&record.member_id),
                    joined_at: record.joined_at,
                })
                .collect();

            Ok(GroupMembers {
                group_id,
                total_deposited: state.shares.total_deposited(),
                members,
            })
        })
    }

    /// The lockable cell of a group
    pub fn cell(&self, group_id: GroupId) -> SyndicateResult<GroupCell> {
        self.groups
            .get(&group_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(SyndicateError::GroupNotFound(group_id))
    }

    /// Run `f` with the group's lock held
    pub fn with_group<R>(
        &self,
        group_id: GroupId,
        f: impl FnOnce(&mut GroupState) -> SyndicateResult<R>,
    ) -> SyndicateResult<R> {
        let cell = self.cell(group_id)?;
        let mut state = lock_cell(&cell)?;
        f(&mut *state)
    }

    /// All group ids, ascending
    pub fn group_ids(&self) -> Vec<GroupId> {
        let mut ids: Vec<_> = self.groups.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }

    /// Consistent copies of every group's state, ascending by id
    pub fn states(&self) -> SyndicateResult<Vec<GroupState>> {
        let mut states = Vec::with_capacity(self.groups.len());
        for id in self.group_ids() {
            states.push(self.with_group(id, |state| Ok(state.clone()))?);
        }
        debug!(groups = states.len(), "Copied group states");
        Ok(states)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn max_members(&self) -> u32 {
        self.max_members
    }

    pub fn sequence(&self) -> &Arc<IdSequence> {
        &self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    fn make_registry() -> MembershipRegistry {
        MembershipRegistry::new(Arc::new(IdSequence::new()), Arc::new(SystemClock))
    }

    #[test]
    fn test_create_group() {
        let registry = make_registry();
        let group = registry
            .create_group("Grup Test", MemberId::new("alice"), Amount::new(1000))
            .unwrap();

        assert_eq!(group.id, GroupId::new(1));
        assert_eq!(group.member_count, 1);
        assert_eq!(group.total_deposited, Amount::new(1000));
        assert_eq!(group.admin, MemberId::new("alice"));
        assert!(group.is_active);
        assert!(registry.is_member(group.id, &MemberId::new("alice")));
    }

    #[test]
    fn test_create_group_rejects_zero_deposit_without_consuming_id() {
        let registry = make_registry();
        let err = registry
            .create_group("g", MemberId::new("alice"), Amount::zero())
            .unwrap_err();
        assert!(matches!(err, SyndicateError::InvalidAmount(_)));
        assert_eq!(registry.group_count(), 0);

        let group = registry
            .create_group("g", MemberId::new("alice"), Amount::new(1))
            .unwrap();
        assert_eq!(group.id, GroupId::new(1));
    }

    #[test]
    fn test_group_ids_are_monotonic() {
        let registry = make_registry();
        let a = registry.create_group("a", MemberId::new("x"), Amount::new(1)).unwrap();
        let b = registry.create_group("b", MemberId::new("x"), Amount::new(1)).unwrap();
        assert!(b.id > a.id);
        assert_eq!(registry.group_ids(), vec![a.id, b.id]);
    }

    #[test]
    fn test_join_and_deposit() {
        let registry = make_registry();
        let group = registry
            .create_group("g", MemberId::new("alice"), Amount::new(1000))
            .unwrap();

        let group = registry
            .join_group(group.id, MemberId::new("bob"), Amount::new(1000))
            .unwrap();
        assert_eq!(group.member_count, 2);
        assert_eq!(group.total_deposited, Amount::new(2000));

        let group = registry
            .deposit(group.id, &MemberId::new("bob"), Amount::new(2000))
            .unwrap();
        assert_eq!(group.total_deposited, Amount::new(4000));
        assert_eq!(
            registry.share_of(group.id, &MemberId::new("bob")).unwrap(),
            BasisPoints::new(7500)
        );

        let journal = registry.with_group(group.id, |s| Ok(s.journal.clone())).unwrap();
        assert_eq!(journal.receipt_count(), 3);
        assert_eq!(journal.receipts_of_type(ReceiptType::DepositRecorded).len(), 1);
    }

    #[test]
    fn test_join_unknown_group() {
        let registry = make_registry();
        let err = registry
            .join_group(GroupId::new(99), MemberId::new("bob"), Amount::new(1))
            .unwrap_err();
        assert!(matches!(err, SyndicateError::GroupNotFound(_)));
        assert!(!registry.is_member(GroupId::new(99), &MemberId::new("bob")));
    }

    #[test]
    fn test_group_full_checked_before_duplicate() {
        let registry = make_registry().with_max_members(2);
        let group = registry
            .create_group("g", MemberId::new("alice"), Amount::new(1))
            .unwrap();
        registry
            .join_group(group.id, MemberId::new("bob"), Amount::new(1))
            .unwrap();

        let err = registry
            .join_group(group.id, MemberId::new("bob"), Amount::new(1))
            .unwrap_err();
        assert!(matches!(err, SyndicateError::GroupFull { max_members: 2, .. }));
    }

    #[test]
    fn test_deposit_by_non_member() {
        let registry = make_registry();
        let group = registry
            .create_group("g", MemberId::new("alice"), Amount::new(1))
            .unwrap();

        let err = registry
            .deposit(group.id, &MemberId::new("mallory"), Amount::new(5))
            .unwrap_err();
        assert!(matches!(err, SyndicateError::NotAMember { .. }));

        let err = registry
            .deposit(group.id, &MemberId::new("alice"), Amount::zero())
            .unwrap_err();
        assert!(matches!(err, SyndicateError::InvalidAmount(_)));
        assert_eq!(registry.get_group(group.id).unwrap().total_deposited, Amount::new(1));
    }

    #[test]
    fn test_inactive_group_rejects_mutations() {
        let registry = make_registry();
        let group = registry
            .create_group("g", MemberId::new("alice"), Amount::new(1))
            .unwrap();
        registry
            .with_group(group.id, |s| {
                s.is_active = false;
                Ok(())
            })
            .unwrap();

        assert!(matches!(
            registry.join_group(group.id, MemberId::new("bob"), Amount::new(1)),
            Err(SyndicateError::GroupInactive(_))
        ));
        assert!(matches!(
            registry.deposit(group.id, &MemberId::new("alice"), Amount::new(1)),
            Err(SyndicateError::GroupInactive(_))
        ));
    }

    #[test]
    fn test_members_projection() {
        let registry = make_registry();
        let group = registry
            .create_group("g", MemberId::new("alice"), Amount::new(1000))
            .unwrap();
        registry
            .join_group(group.id, MemberId::new("bob"), Amount::new(3000))
            .unwrap();

        let members = registry.members(group.id).unwrap();
        assert_eq!(members.members.len(), 2);
        assert!(members.members[0].is_admin);
        assert_eq!(members.members[0].share_percent, BasisPoints::new(2500));
        assert_eq!(members.members[1].share_percent, BasisPoints::new(7500));
        assert_eq!(members.share_total(), BasisPoints::new(10_000));
    }

    #[test]
    fn test_from_states_rejects_ids_ahead_of_sequence() {
        let registry = make_registry();
        let group = registry
            .create_group("g", MemberId::new("alice"), Amount::new(1))
            .unwrap();
        let states = registry.states().unwrap();

        let restored = MembershipRegistry::from_states(
            states.clone(),
            Arc::new(IdSequence::starting_at(2)),
            Arc::new(SystemClock),
            MAX_MEMBERS,
        )
        .unwrap();
        assert_eq!(restored.get_group(group.id).unwrap(), group);

        let err = MembershipRegistry::from_states(
            states,
            Arc::new(IdSequence::starting_at(1)),
            Arc::new(SystemClock),
            MAX_MEMBERS,
        )
        .err()
        .unwrap();
        assert!(matches!(err, SyndicateError::Storage(_)));
    }
}
