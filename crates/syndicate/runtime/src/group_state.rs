//! Per-group state: the unit of mutual exclusion
//!
//! Everything a group owns (its share ledger, the proposals scoped to it,
//! and its audit journal) lives in one `GroupState`. The registry keeps
//! each state behind its own mutex, so every mutating operation on a
//! group is serialized while different groups proceed in parallel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use syndicate_types::{
    AuditJournal, Group, GroupId, MemberId, Proposal, ProposalId, SyndicateError,
    SyndicateResult,
};

use crate::share_ledger::ShareLedger;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupState {
    pub id: GroupId,
    pub name: String,
    pub admin: MemberId,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub shares: ShareLedger,
    pub proposals: BTreeMap<ProposalId, Proposal>,
    pub journal: AuditJournal,
}

impl GroupState {
    /// A fresh, memberless group; the registry admits the admin right after
    pub fn new(id: GroupId, name: impl Into<String>, admin: MemberId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            admin,
            is_active: true,
            created_at,
            shares: ShareLedger::new(id),
            proposals: BTreeMap::new(),
            journal: AuditJournal::new(id),
        }
    }

    /// Read model of the group, projected from the share ledger
    pub fn group(&self) -> Group {
        Group {
            id: self.id,
            name: self.name.clone(),
            admin: self.admin.clone(),
            is_active: self.is_active,
            total_deposited: self.shares.total_deposited(),
            member_count: self.shares.member_count(),
            created_at: self.created_at,
        }
    }

    pub fn member_count(&self) -> u32 {
        self.shares.member_count()
    }

    pub fn is_member(&self, member_id: &MemberId) -> bool {
        self.shares.contains(member_id)
    }

    pub fn is_admin(&self, member_id: &MemberId) -> bool {
        self.admin == *member_id
    }

    pub fn ensure_active(&self) -> SyndicateResult<()> {
        if !self.is_active {
            return Err(SyndicateError::GroupInactive(self.id));
        }
        Ok(())
    }

    pub fn ensure_member(&self, member_id: &MemberId) -> SyndicateResult<()> {
        if !self.is_member(member_id) {
            return Err(SyndicateError::NotAMember {
                group: self.id,
                member: member_id.clone(),
            });
        }
        Ok(())
    }

    /// Re-check every stored invariant of the group
    pub fn verify(&self, max_members: u32) -> SyndicateResult<()> {
        let corrupt = |msg: String| Err(SyndicateError::Storage(format!("group {}: {}", self.id, msg)));

        if self.shares.group_id() != self.id || self.journal.group_id != self.id {
            return corrupt("nested records belong to another group".into());
        }
        self.shares.verify()?;

        let count = self.shares.member_count();
        if count == 0 {
            return corrupt("group has no members".into());
        }
        if count > max_members {
            return corrupt(format!("{} members exceeds the limit of {}", count, max_members));
        }
        if !self.shares.contains(&self.admin) {
            return corrupt(format!("admin {} is not a member", self.admin));
        }

        for (id, proposal) in &self.proposals {
            if *id != proposal.id || proposal.group_id != self.id {
                return corrupt(format!("proposal {} is filed under the wrong key", proposal.id));
            }
            if proposal.executed && proposal.cancelled {
                return corrupt(format!("proposal {} is both executed and cancelled", id));
            }
            if proposal.total_votes() as usize != proposal.voters.len() {
                return corrupt(format!("proposal {} tally does not match its voters", id));
            }
        }

        Ok(())
    }
}
