//! Member records and share projections

use crate::{Amount, BasisPoints, GroupId, MemberId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A record for a single member of a group
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRecord {
    /// External identity
    pub member_id: MemberId,
    /// Total contributed so far; never decreases
    pub contribution: Amount,
    /// Join position, 1-based (the founding admin is seat 1)
    pub seat: u32,
    /// When the member joined
    pub joined_at: DateTime<Utc>,
}

impl MemberRecord {
    pub fn new(member_id: MemberId, seat: u32, joined_at: DateTime<Utc>) -> Self {
        Self {
            member_id,
            contribution: Amount::zero(),
            seat,
            joined_at,
        }
    }
}

/// A member together with its derived share of the pool
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub member_id: MemberId,
    pub contribution: Amount,
    pub share_percent: BasisPoints,
    pub seat: u32,
    pub is_admin: bool,
    pub joined_at: DateTime<Utc>,
}

/// All members of a group, in join order
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMembers {
    pub group_id: GroupId,
    pub total_deposited: Amount,
    pub members: Vec<MemberView>,
}

impl GroupMembers {
    /// Sum of all floored shares; at most 10000, short by rounding drift
    pub fn share_total(&self) -> BasisPoints {
        self.members.iter().map(|m| m.share_percent).sum()
    }
}
