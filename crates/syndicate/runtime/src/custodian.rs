//! Capital custodian: the external holder of a group's funds
//!
//! The ledger tracks accounting, not custody. When a group is backed by an
//! external vault or escrow, its balances are read through this trait and
//! treated as authoritative input to the share ledger.

use std::collections::HashMap;
use std::sync::RwLock;

use syndicate_types::{Amount, GroupId, MemberId, SyndicateError, SyndicateResult};

/// Read-only view of balances held by the custodian
pub trait CapitalCustodian: Send + Sync {
    /// Total the custodian holds for a group
    fn total_deposited(&self, group_id: GroupId) -> SyndicateResult<Amount>;

    /// What the custodian holds on behalf of one member of a group
    fn balance_of(&self, group_id: GroupId, member_id: &MemberId) -> SyndicateResult<Amount>;
}

/// An in-process custodian, for tests and for running without a vault
#[derive(Debug, Default)]
pub struct InMemoryCustodian {
    balances: RwLock<HashMap<(GroupId, MemberId), Amount>>,
}

impl InMemoryCustodian {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a member's balance
    pub fn set_balance(&self, group_id: GroupId, member_id: MemberId, amount: Amount) -> SyndicateResult<()> {
        self.balances
            .write()
            .map_err(|_| SyndicateError::LockPoisoned("custodian balances".into()))?
            .insert((group_id, member_id), amount);
        Ok(())
    }

    /// Add to a member's balance, as an on-chain deposit would
    pub fn credit(&self, group_id: GroupId, member_id: MemberId, amount: Amount) -> SyndicateResult<Amount> {
        let mut balances = self
            .balances
            .write()
            .map_err(|_| SyndicateError::LockPoisoned("custodian balances".into()))?;
        let entry = balances.entry((group_id, member_id)).or_insert_with(Amount::zero);
        *entry = entry
            .checked_add(amount)
            .ok_or_else(|| SyndicateError::InvalidAmount("custodian balance overflow".into()))?;
        Ok(*entry)
    }
}

impl CapitalCustodian for InMemoryCustodian {
    fn total_deposited(&self, group_id: GroupId) -> SyndicateResult<Amount> {
        let balances = self
            .balances
            .read()
            .map_err(|_| SyndicateError::LockPoisoned("custodian balances".into()))?;
        balances
            .iter()
            .filter(|((g, _), _)| *g == group_id)
            .try_fold(Amount::zero(), |acc, (_, amount)| acc.checked_add(*amount))
            .ok_or_else(|| SyndicateError::CustodianUnavailable("group total overflows".into()))
    }

    fn balance_of(&self, group_id: GroupId, member_id: &MemberId) -> SyndicateResult<Amount> {
        let balances = self
            .balances
            .read()
            .map_err(|_| SyndicateError::LockPoisoned("custodian balances".into()))?;
        Ok(balances
            .get(&(group_id, member_id.clone()))
            .copied()
            .unwrap_or_else(Amount::zero))
    }
}
