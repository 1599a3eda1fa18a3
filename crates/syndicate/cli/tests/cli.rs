//! End-to-end runs of the `syndicate` binary against a temporary ledger file

use assert_cmd::cargo::CommandCargoExt;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{self, Stdio};
use tempfile::TempDir;

struct Ledger {
    _dir: TempDir,
    state: PathBuf,
}

impl Ledger {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join("ledger.json");
        Self { _dir: dir, state }
    }

    fn cmd(&self) -> Command {
        command(&self.state)
    }

    /// Run with `-o json` and return the parsed envelope
    fn json(&self, args: &[&str]) -> (bool, Value) {
        let output = self
            .cmd()
            .args(["-o", "json"])
            .args(args)
            .output()
            .unwrap();
        let envelope: Value = serde_json::from_slice(&output.stdout).unwrap();
        (output.status.success(), envelope)
    }

    fn ok(&self, args: &[&str]) -> Value {
        let (success, envelope) = self.json(args);
        assert!(success, "command {:?} failed: {}", args, envelope);
        assert_eq!(envelope["success"], true);
        envelope["data"].clone()
    }
}

fn command(state: &Path) -> Command {
    let mut cmd = Command::cargo_bin("syndicate").unwrap();
    cmd.env_remove("SYNDICATE_CONFIG")
        .env_remove("RUST_LOG")
        .arg("--state")
        .arg(state);
    cmd
}

/// A group of three with 1000/2000/3000 contributed
fn seeded(ledger: &Ledger) {
    ledger.ok(&["group", "create", "Grup Test", "--admin", "alice", "--deposit", "1000"]);
    ledger.ok(&["group", "join", "1", "bob", "--deposit", "2000"]);
    ledger.ok(&["group", "join", "1", "carol", "--deposit", "3000"]);
}

#[test]
fn group_state_persists_between_invocations() {
    let ledger = Ledger::new();
    let group = ledger.ok(&["group", "create", "Grup Test", "--admin", "alice", "--deposit", "1000"]);
    assert_eq!(group["id"], 1);
    assert_eq!(group["memberCount"], 1);
    assert!(ledger.state.exists());

    ledger.ok(&["group", "join", "1", "bob", "--deposit", "2000"]);

    let group = ledger.ok(&["group", "show", "1"]);
    assert_eq!(group["name"], "Grup Test");
    assert_eq!(group["memberCount"], 2);
    assert_eq!(group["totalDeposited"], 3000);
}

#[test]
fn proposal_flow_runs_to_execution() {
    let ledger = Ledger::new();
    seeded(&ledger);

    let id = ledger.ok(&[
        "proposal", "create", "1", "--proposer", "alice", "--type", "withdraw", "--payload", "500",
    ]);
    assert_eq!(id, 1);

    let (success, envelope) = ledger.json(&["proposal", "execute", "1"]);
    assert!(!success);
    assert_eq!(envelope["code"], "QUORUM_NOT_MET");

    ledger.ok(&["proposal", "vote", "1", "alice", "for"]);
    let proposal = ledger.ok(&["proposal", "vote", "1", "bob", "for"]);
    assert_eq!(proposal["votesFor"], 2);

    let result = ledger.ok(&["proposal", "execute", "1"]);
    assert_eq!(result["proposalType"], "WITHDRAW");
    assert_eq!(result["receipt"]["executor"], "simulated-executor");

    let view = ledger.ok(&["proposal", "show", "1"]);
    assert_eq!(view["status"], "EXECUTED");
    assert_eq!(view["requiredQuorum"], 2);

    let (_, envelope) = ledger.json(&["proposal", "execute", "1"]);
    assert_eq!(envelope["code"], "ALREADY_EXECUTED");
}

#[test]
fn double_vote_reports_error_envelope() {
    let ledger = Ledger::new();
    seeded(&ledger);
    ledger.ok(&["proposal", "create", "1", "--proposer", "bob", "--type", "0"]);
    ledger.ok(&["proposal", "vote", "1", "carol", "against"]);

    ledger
        .cmd()
        .args(["-o", "json", "proposal", "vote", "1", "carol", "for"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"success\": false"))
        .stdout(predicate::str::contains("ALREADY_VOTED"));

    let view = ledger.ok(&["proposal", "show", "1"]);
    assert_eq!(view["votesFor"], 0);
    assert_eq!(view["votesAgainst"], 1);
}

#[test]
fn rejections_leave_the_ledger_untouched() {
    let ledger = Ledger::new();
    seeded(&ledger);

    let (success, envelope) = ledger.json(&["group", "join", "1", "bob", "--deposit", "9"]);
    assert!(!success);
    assert_eq!(envelope["code"], "ALREADY_MEMBER");

    let (_, envelope) = ledger.json(&["group", "deposit", "1", "dave", "50"]);
    assert_eq!(envelope["code"], "NOT_A_MEMBER");

    let (_, envelope) = ledger.json(&["group", "deposit", "1", "bob", "0"]);
    assert_eq!(envelope["code"], "INVALID_AMOUNT");

    let group = ledger.ok(&["group", "show", "1"]);
    assert_eq!(group["totalDeposited"], 6000);
    assert_eq!(group["memberCount"], 3);
}

#[test]
fn only_proposer_or_admin_may_cancel() {
    let ledger = Ledger::new();
    seeded(&ledger);
    ledger.ok(&["proposal", "create", "1", "--proposer", "bob", "--type", "add-member"]);

    let (_, envelope) = ledger.json(&["proposal", "cancel", "1", "--actor", "carol"]);
    assert_eq!(envelope["code"], "UNAUTHORIZED");

    ledger.ok(&["proposal", "cancel", "1", "--actor", "alice"]);
    let view = ledger.ok(&["proposal", "show", "1"]);
    assert_eq!(view["status"], "CANCELLED");
}

#[test]
fn table_output_lists_members() {
    let ledger = Ledger::new();
    seeded(&ledger);

    ledger
        .cmd()
        .args(["group", "members", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("carol"))
        .stdout(predicate::str::contains("50.00%"));

    ledger
        .cmd()
        .args(["group", "journal", "1", "--limit", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("carol"));
}

#[test]
fn unknown_group_fails_in_table_mode() {
    let ledger = Ledger::new();
    ledger
        .cmd()
        .args(["group", "show", "42"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("GROUP_NOT_FOUND"));
}

#[test]
fn bad_arguments_are_refused_before_the_ledger() {
    let ledger = Ledger::new();
    seeded(&ledger);

    ledger
        .cmd()
        .args(["proposal", "create", "1", "--proposer", "alice", "--type", "launch"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown proposal type"));

    ledger
        .cmd()
        .args(["group", "deposit", "1", "bob", "-5"])
        .assert()
        .failure();
}

#[test]
fn concurrent_invocations_keep_every_join() {
    let ledger = Ledger::new();
    ledger.ok(&["group", "create", "Grup Test", "--admin", "alice", "--deposit", "100"]);

    let children: Vec<process::Child> = (0..8)
        .map(|i| {
            process::Command::cargo_bin("syndicate")
                .unwrap()
                .env_remove("SYNDICATE_CONFIG")
                .env_remove("RUST_LOG")
                .arg("--state")
                .arg(&ledger.state)
                .args(["group", "join", "1", &format!("m{}", i), "--deposit", "10"])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .unwrap()
        })
        .collect();

    for mut child in children {
        assert!(child.wait().unwrap().success());
    }

    let group = ledger.ok(&["group", "show", "1"]);
    assert_eq!(group["memberCount"], 9);
    assert_eq!(group["totalDeposited"], 180);
}
