//! Group records
//!
//! A group is a pooled fund jointly owned by its members. Groups are never
//! physically deleted; `is_active` is cleared on irrecoverable states.

use crate::{Amount, GroupId, MemberId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of members in one group
pub const MAX_MEMBERS: u32 = 10;

/// Read model of a group
///
/// `total_deposited` always equals the sum of member contributions and
/// `member_count` the number of members; both are projected from the
/// share ledger, never stored independently.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub admin: MemberId,
    pub is_active: bool,
    pub total_deposited: Amount,
    pub member_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Group {
    /// Whether another member can join under the given capacity
    pub fn has_capacity(&self, max_members: u32) -> bool {
        self.member_count < max_members
    }
}
