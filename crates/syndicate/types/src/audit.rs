//! Audit journal: the group's accountability record
//!
//! Every mutation of a group produces a receipt. The journal is
//! append-only and travels with the group in snapshots.

use crate::{GroupId, MemberId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of event a receipt records
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptType {
    GroupCreated,
    MemberJoined,
    DepositRecorded,
    CustodianSync,
    ProposalCreated,
    VoteCast,
    ProposalExecuted,
    ExecutionFailed,
    ProposalCancelled,
}

/// A receipt issued by a group
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerReceipt {
    /// Unique receipt identifier
    pub receipt_id: String,
    /// The group that issued the receipt
    pub group_id: GroupId,
    /// Type of receipt
    pub receipt_type: ReceiptType,
    /// The member who triggered the receipt
    pub actor: MemberId,
    /// Human-readable description
    pub description: String,
    /// When the receipt was created
    pub timestamp: DateTime<Utc>,
    /// Additional metadata (amounts, proposal ids, vote choices)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl LedgerReceipt {
    pub fn new(
        group_id: GroupId,
        receipt_type: ReceiptType,
        actor: MemberId,
        description: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            receipt_id: uuid::Uuid::new_v4().to_string(),
            group_id,
            receipt_type,
            actor,
            description: description.into(),
            timestamp,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }
}

/// Append-only list of receipts for one group
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditJournal {
    /// The group this journal belongs to
    pub group_id: GroupId,
    /// Receipts in the order they were logged
    pub receipts: Vec<LedgerReceipt>,
}

impl AuditJournal {
    pub fn new(group_id: GroupId) -> Self {
        Self {
            group_id,
            receipts: Vec::new(),
        }
    }

    pub fn log_receipt(&mut self, receipt: LedgerReceipt) {
        self.receipts.push(receipt);
    }

    pub fn receipts_of_type(&self, receipt_type: ReceiptType) -> Vec<&LedgerReceipt> {
        self.receipts
            .iter()
            .filter(|r| r.receipt_type == receipt_type)
            .collect()
    }

    pub fn receipt_count(&self) -> usize {
        self.receipts.len()
    }

    /// Most recent receipts first, at most `limit`
    pub fn latest(&self, limit: usize) -> Vec<&LedgerReceipt> {
        self.receipts.iter().rev().take(limit).collect()
    }
}
