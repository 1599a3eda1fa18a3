//! Share Ledger: contribution accounting for one group
//!
//! Pure accounting: tracks each member's contribution and answers what
//! fraction of the pool a member owns. Never talks to external systems.
//!
//! Shares are floored per member and the remainder is not redistributed,
//! so the sum of shares may fall short of 10000 bps by at most one basis
//! point per member.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use syndicate_types::{
    Amount, BasisPoints, GroupId, MemberId, MemberRecord, SyndicateError, SyndicateResult,
};

use chrono::{DateTime, Utc};

/// Reject zero amounts; every deposit and contribution must be positive
pub fn validate_amount(amount: Amount) -> SyndicateResult<()> {
    if amount.is_zero() {
        return Err(SyndicateError::InvalidAmount(
            "amount must be greater than zero".into(),
        ));
    }
    Ok(())
}

/// Contribution balances of one group's members
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLedger {
    group_id: GroupId,
    members: BTreeMap<MemberId, MemberRecord>,
    total_deposited: Amount,
}

impl ShareLedger {
    pub fn new(group_id: GroupId) -> Self {
        Self {
            group_id,
            members: BTreeMap::new(),
            total_deposited: Amount::zero(),
        }
    }

    /// Open an account for a new member with its first contribution
    ///
    /// Validates everything before mutating, so a rejected admission
    /// leaves the ledger untouched.
    pub fn admit(
        &mut self,
        member_id: MemberId,
        deposit: Amount,
        joined_at: DateTime<Utc>,
    ) -> SyndicateResult<&MemberRecord> {
        if self.members.contains_key(&member_id) {
            return Err(SyndicateError::AlreadyMember {
                group: self.group_id,
                member: member_id,
            });
        }
        validate_amount(deposit)?;
        let total = self.checked_total_after(deposit)?;

        let seat = self.members.len() as u32 + 1;
        let mut record = MemberRecord::new(member_id.clone(), seat, joined_at);
        record.contribution = deposit;

        self.total_deposited = total;
        Ok(self.members.entry(member_id).or_insert(record))
    }

    /// Increase a member's contribution and the pool total by `amount`
    pub fn record_contribution(&mut self, member_id: &MemberId, amount: Amount) -> SyndicateResult<()> {
        validate_amount(amount)?;
        let total = self.checked_total_after(amount)?;

        let record = self
            .members
            .get_mut(member_id)
            .ok_or_else(|| SyndicateError::MemberNotFound {
                group: self.group_id,
                member: member_id.clone(),
            })?;

        // Member contribution is bounded by the total, so this cannot overflow
        // once the total check above has passed.
        record.contribution = Amount(record.contribution.0 + amount.0);
        self.total_deposited = total;
        Ok(())
    }

    /// Floored share of the pool owned by `member_id`, in basis points
    pub fn share_of(&self, member_id: &MemberId) -> SyndicateResult<BasisPoints> {
        let record = self
            .members
            .get(member_id)
            .ok_or_else(|| SyndicateError::MemberNotFound {
                group: self.group_id,
                member: member_id.clone(),
            })?;
        Ok(BasisPoints::of(record.contribution, self.total_deposited))
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub fn total_deposited(&self) -> Amount {
        self.total_deposited
    }

    pub fn member_count(&self) -> u32 {
        self.members.len() as u32
    }

    pub fn contains(&self, member_id: &MemberId) -> bool {
        self.members.contains_key(member_id)
    }

    pub fn contribution_of(&self, member_id: &MemberId) -> Option<Amount> {
        self.members.get(member_id).map(|m| m.contribution)
    }

    /// Member records in join order
    pub fn records(&self) -> Vec<&MemberRecord> {
        let mut records: Vec<_> = self.members.values().collect();
        records.sort_by_key(|r| r.seat);
        records
    }

    /// Every member with its share, in join order
    pub fn share_table(&self) -> Vec<(&MemberRecord, BasisPoints)> {
        self.records()
            .into_iter()
            .map(|r| (r, BasisPoints::of(r.contribution, self.total_deposited)))
            .collect()
    }

    /// Check the ledger's internal invariants (used when restoring state)
    pub fn verify(&self) -> SyndicateResult<()> {
        let sum: u128 = self.members.values().map(|m| m.contribution.0 as u128).sum();
        if sum != self.total_deposited.0 as u128 {
            return Err(SyndicateError::Storage(format!(
                "group {}: total deposited {} does not match contributions {}",
                self.group_id, self.total_deposited, sum
            )));
        }

        let mut seats: Vec<u32> = self.members.values().map(|m| m.seat).collect();
        seats.sort_unstable();
        if seats.iter().enumerate().any(|(i, seat)| *seat != i as u32 + 1) {
            return Err(SyndicateError::Storage(format!(
                "group {}: member seats are not contiguous",
                self.group_id
            )));
        }

        if let Some((id, _)) = self.members.iter().find(|(id, m)| **id != m.member_id) {
            return Err(SyndicateError::Storage(format!(
                "group {}: member record keyed under wrong id {}",
                self.group_id, id
            )));
        }

        Ok(())
    }

    fn checked_total_after(&self, amount: Amount) -> SyndicateResult<Amount> {
        self.total_deposited.checked_add(amount).ok_or_else(|| {
            SyndicateError::InvalidAmount(format!(
                "deposit of {} would overflow the pool total {}",
                amount, self.total_deposited
            ))
        })
    }
}
