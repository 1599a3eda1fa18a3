//! Continuity: snapshotting and recovery for the ledger
//!
//! Lets the ledger survive restarts: every group (members, proposals and
//! journal) plus both id counters are captured into a checksummed
//! snapshot and written through a [`SnapshotStore`]. Restoring re-checks
//! the checksum and every group invariant before the ledger serves calls.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use syndicate_types::{SyndicateError, SyndicateResult};
use tracing::{debug, info};

use crate::group_state::GroupState;

/// Snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// A checkpoint of the complete ledger state
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub version: u32,
    pub snapshot_id: String,
    pub taken_at: DateTime<Utc>,
    /// Next value of the group id sequence
    pub next_group_id: u64,
    /// Next value of the proposal id sequence
    pub next_proposal_id: u64,
    /// Every group, ascending by id
    pub groups: Vec<GroupState>,
    /// blake3 over everything above
    pub checksum: String,
}

impl LedgerSnapshot {
    pub fn new(
        groups: Vec<GroupState>,
        next_group_id: u64,
        next_proposal_id: u64,
        taken_at: DateTime<Utc>,
    ) -> SyndicateResult<Self> {
        let mut snapshot = Self {
            version: SNAPSHOT_VERSION,
            snapshot_id: uuid::Uuid::new_v4().to_string(),
            taken_at,
            next_group_id,
            next_proposal_id,
            groups,
            checksum: String::new(),
        };
        snapshot.checksum = snapshot.compute_checksum()?;
        Ok(snapshot)
    }

    /// Hash of the snapshot body
    pub fn compute_checksum(&self) -> SyndicateResult<String> {
        let body = serde_json::to_vec(&(
            self.version,
            &self.snapshot_id,
            &self.taken_at,
            self.next_group_id,
            self.next_proposal_id,
            &self.groups,
        ))
        .map_err(|e| SyndicateError::Serialization(e.to_string()))?;
        Ok(blake3::hash(&body).to_hex().to_string())
    }

    /// Reject snapshots from another format or with a corrupted body
    pub fn verify(&self) -> SyndicateResult<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SyndicateError::Storage(format!(
                "unsupported snapshot version {}",
                self.version
            )));
        }
        if self.compute_checksum()? != self.checksum {
            return Err(SyndicateError::Storage(format!(
                "snapshot {} failed its checksum",
                self.snapshot_id
            )));
        }
        Ok(())
    }

    pub fn proposal_count(&self) -> usize {
        self.groups.iter().map(|g| g.proposals.len()).sum()
    }
}

/// Where snapshots are kept
pub trait SnapshotStore: Send + Sync {
    /// Persist a snapshot, replacing the previous latest
    fn save(&self, snapshot: &LedgerSnapshot) -> SyndicateResult<()>;

    /// The most recently saved snapshot, if any
    fn load_latest(&self) -> SyndicateResult<Option<LedgerSnapshot>>;

    /// Name of this store for logging
    fn name(&self) -> &str;
}

/// Keeps recent snapshots in memory (for development/testing)
pub struct InMemorySnapshotStore {
    snapshots: RwLock<Vec<LedgerSnapshot>>,
    max_retained: usize,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self {
            snapshots: RwLock::new(Vec::new()),
            max_retained: 10,
        }
    }

    /// Set maximum retained snapshots
    pub fn with_max_retained(mut self, max: usize) -> Self {
        self.max_retained = max.max(1);
        self
    }

    /// Number of snapshots currently retained
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.read().map(|s| s.len()).unwrap_or(0)
    }
}

impl Default for InMemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn save(&self, snapshot: &LedgerSnapshot) -> SyndicateResult<()> {
        let mut snapshots = self
            .snapshots
            .write()
            .map_err(|_| SyndicateError::LockPoisoned("snapshot store".into()))?;
        snapshots.push(snapshot.clone());
        if snapshots.len() > self.max_retained {
            let excess = snapshots.len() - self.max_retained;
            snapshots.drain(..excess);
        }
        Ok(())
    }

    fn load_latest(&self) -> SyndicateResult<Option<LedgerSnapshot>> {
        let snapshots = self
            .snapshots
            .read()
            .map_err(|_| SyndicateError::LockPoisoned("snapshot store".into()))?;
        Ok(snapshots.last().cloned())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// A JSON snapshot file, replaced atomically on every save
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "ledger".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, snapshot: &LedgerSnapshot) -> SyndicateResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                SyndicateError::Storage(format!("create {}: {}", parent.display(), e))
            })?;
        }

        let bytes = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| SyndicateError::Serialization(e.to_string()))?;

        let temp = self.temp_path();
        fs::write(&temp, bytes)
            .map_err(|e| SyndicateError::Storage(format!("write {}: {}", temp.display(), e)))?;
        fs::rename(&temp, &self.path).map_err(|e| {
            SyndicateError::Storage(format!("replace {}: {}", self.path.display(), e))
        })?;

        debug!(
            path = %self.path.display(),
            snapshot_id = %snapshot.snapshot_id,
            "Snapshot written"
        );
        Ok(())
    }

    fn load_latest(&self) -> SyndicateResult<Option<LedgerSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path)
            .map_err(|e| SyndicateError::Storage(format!("read {}: {}", self.path.display(), e)))?;
        let snapshot: LedgerSnapshot = serde_json::from_slice(&bytes)
            .map_err(|e| SyndicateError::Serialization(e.to_string()))?;

        info!(
            path = %self.path.display(),
            groups = snapshot.groups.len(),
            taken_at = %snapshot.taken_at,
            "Snapshot loaded"
        );
        Ok(Some(snapshot))
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Exclusive hold on a file-backed ledger across processes
///
/// An advisory lock on `<ledger>.lock` next to the snapshot file. Every
/// process that loads, mutates and saves the same file must hold it for
/// that whole span, otherwise the last writer drops the other's changes.
/// Released on drop.
#[derive(Debug)]
pub struct LedgerLock {
    _file: File,
    path: PathBuf,
}

impl LedgerLock {
    /// Block until the ledger at `ledger_path` is free, then take it
    pub fn acquire(ledger_path: &Path) -> SyndicateResult<Self> {
        let path = lock_path(ledger_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                SyndicateError::Storage(format!("create {}: {}", parent.display(), e))
            })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| SyndicateError::Storage(format!("open {}: {}", path.display(), e)))?;
        file.lock_exclusive()
            .map_err(|e| SyndicateError::Storage(format!("lock {}: {}", path.display(), e)))?;

        debug!(path = %path.display(), "Ledger lock acquired");
        Ok(Self { _file: file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn lock_path(ledger_path: &Path) -> PathBuf {
    let mut name = ledger_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "ledger".into());
    name.push(".lock");
    ledger_path.with_file_name(name)
}
