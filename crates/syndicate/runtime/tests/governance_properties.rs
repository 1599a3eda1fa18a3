use std::sync::Arc;

use chrono::{Duration, Utc};
use proptest::prelude::*;
use syndicate_runtime::{
    required_quorum, GovernanceConfig, GovernanceFacade, IdSequence, ManualClock,
    SimulatedExecutor,
};
use syndicate_types::{
    Amount, BasisPoints, GroupId, MemberId, ProposalId, ProposalStatus, ProposalType,
    ReceiptType, SyndicateError, VoteChoice, MAX_MEMBERS,
};

struct Harness {
    clock: Arc<ManualClock>,
    executor: Arc<SimulatedExecutor>,
    facade: GovernanceFacade,
}

fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let executor = Arc::new(SimulatedExecutor::new(true));
    let facade = GovernanceFacade::with_parts(
        &GovernanceConfig::default(),
        clock.clone(),
        Arc::new(IdSequence::new()),
        Arc::new(IdSequence::new()),
        executor.clone(),
    );
    Harness {
        clock,
        executor,
        facade,
    }
}

fn member(i: usize) -> MemberId {
    MemberId::new(format!("member-{}", i))
}

/// A group whose members are member-0 (admin) .. member-(n-1), 100 each
fn group_of(h: &Harness, n: usize) -> GroupId {
    let group = h
        .facade
        .create_group("g", member(0), Amount::new(100))
        .unwrap();
    for i in 1..n {
        h.facade
            .join_group(group.id, member(i), Amount::new(100))
            .unwrap();
    }
    group.id
}

fn propose(h: &Harness, group: GroupId) -> ProposalId {
    h.facade
        .create_proposal(group, &member(0), ProposalType::ExecuteStrategy, vec![7], None)
        .unwrap()
}

proptest! {
    #[test]
    fn share_sum_stays_within_rounding_drift(
        contributions in prop::collection::vec(1u64..=1_000_000_000, 1..=10)
    ) {
        let h = harness();
        let group = h
            .facade
            .create_group("g", member(0), Amount::new(contributions[0]))
            .unwrap();
        for (i, amount) in contributions.iter().enumerate().skip(1) {
            h.facade.join_group(group.id, member(i), Amount::new(*amount)).unwrap();
        }

        let total: u32 = (0..contributions.len())
            .map(|i| h.facade.share_of(group.id, &member(i)).unwrap().value())
            .sum();
        prop_assert!(total <= 10_000);
        prop_assert!(total >= 9_990);
        prop_assert_eq!(
            h.facade.get_group_members(group.id).unwrap().share_total(),
            BasisPoints::new(total)
        );
    }

    #[test]
    fn each_member_is_counted_once_whatever_the_vote_sequence(
        votes in prop::collection::vec((0usize..5, any::<bool>()), 0..30)
    ) {
        let h = harness();
        let group = group_of(&h, 5);
        let proposal = propose(&h, group);

        let mut seen = std::collections::BTreeMap::new();
        for (who, support) in votes {
            let choice = if support { VoteChoice::For } else { VoteChoice::Against };
            let result = h.facade.vote(proposal, &member(who), choice);
            if seen.contains_key(&who) {
                let is_already_voted = matches!(result, Err(SyndicateError::AlreadyVoted { .. }));
                prop_assert!(is_already_voted);
            } else {
                prop_assert!(result.is_ok());
                seen.insert(who, support);
            }
        }

        let view = h.facade.get_proposal(proposal).unwrap();
        let expected_for = seen.values().filter(|s| **s).count() as u32;
        prop_assert_eq!(view.proposal.votes_for, expected_for);
        prop_assert_eq!(view.proposal.votes_against, seen.len() as u32 - expected_for);
    }
}

#[test]
fn capacity_invariant_rejects_eleventh_member() {
    let h = harness();
    let group = group_of(&h, MAX_MEMBERS as usize);
    assert_eq!(h.facade.get_group(group).unwrap().member_count, 10);

    let err = h
        .facade
        .join_group(group, member(10), Amount::new(100))
        .unwrap_err();
    assert!(matches!(err, SyndicateError::GroupFull { max_members: 10, .. }));
    assert_eq!(h.facade.get_group(group).unwrap().member_count, 10);
    assert!(!h.facade.is_member(group, &member(10)));
}

#[test]
fn double_join_keeps_first_contribution() {
    let h = harness();
    let group = group_of(&h, 1);
    h.facade
        .join_group(group, member(1), Amount::new(250))
        .unwrap();

    let err = h
        .facade
        .join_group(group, member(1), Amount::new(999))
        .unwrap_err();
    assert!(matches!(err, SyndicateError::AlreadyMember { .. }));

    let members = h.facade.get_group_members(group).unwrap();
    let first = members
        .members
        .iter()
        .find(|m| m.member_id == member(1))
        .unwrap();
    assert_eq!(first.contribution, Amount::new(250));
    assert_eq!(members.total_deposited, Amount::new(350));
}

#[test]
fn double_vote_keeps_first_tally() {
    let h = harness();
    let group = group_of(&h, 3);
    let proposal = propose(&h, group);

    h.facade.vote(proposal, &member(1), VoteChoice::For).unwrap();
    let err = h
        .facade
        .vote(proposal, &member(1), VoteChoice::Against)
        .unwrap_err();
    assert!(matches!(err, SyndicateError::AlreadyVoted { .. }));

    let view = h.facade.get_proposal(proposal).unwrap();
    assert_eq!(view.proposal.votes_for, 1);
    assert_eq!(view.proposal.votes_against, 0);
}

#[test]
fn quorum_arithmetic() {
    assert_eq!(required_quorum(5), 3);
    assert_eq!(required_quorum(10), 6);
    assert_eq!(required_quorum(1), 1);
}

#[test]
fn execute_is_gated_by_quorum_and_happens_once() {
    let h = harness();
    let group = group_of(&h, 4);
    let proposal = propose(&h, group);

    h.facade.vote(proposal, &member(0), VoteChoice::For).unwrap();
    h.facade.vote(proposal, &member(1), VoteChoice::For).unwrap();
    assert!(matches!(
        h.facade.execute_if_approved(proposal),
        Err(SyndicateError::QuorumNotMet { required: 3, current: 2 })
    ));

    h.facade.vote(proposal, &member(2), VoteChoice::For).unwrap();
    let result = h.facade.execute_if_approved(proposal).unwrap();
    assert_eq!(result.proposal_type, ProposalType::ExecuteStrategy);

    assert!(matches!(
        h.facade.execute_if_approved(proposal),
        Err(SyndicateError::AlreadyExecuted(_))
    ));
    assert_eq!(h.executor.dispatch_count(), 1);
    assert_eq!(h.executor.dispatched()[0].payload, vec![7]);
}

#[test]
fn expired_proposal_rejects_execute_and_vote() {
    let h = harness();
    let group = group_of(&h, 3);
    let proposal = propose(&h, group);
    h.facade.vote(proposal, &member(0), VoteChoice::For).unwrap();

    h.clock.advance(Duration::hours(48) + Duration::seconds(1));

    assert!(matches!(
        h.facade.execute_if_approved(proposal),
        Err(SyndicateError::ProposalExpired(_))
    ));
    assert!(matches!(
        h.facade.vote(proposal, &member(1), VoteChoice::For),
        Err(SyndicateError::ProposalClosed(_))
    ));

    let view = h.facade.get_proposal(proposal).unwrap();
    assert_eq!(view.status, ProposalStatus::Expired);
    assert!(!view.proposal.cancelled);
    assert_eq!(h.executor.dispatch_count(), 0);
}

#[test]
fn end_to_end_grup_test_scenario() {
    let h = harness();
    let (a, b) = (MemberId::new("A"), MemberId::new("B"));

    let group = h
        .facade
        .create_group("Grup Test", a.clone(), Amount::new(1000))
        .unwrap();
    h.facade
        .join_group(group.id, b.clone(), Amount::new(1000))
        .unwrap();

    assert_eq!(h.facade.share_of(group.id, &a).unwrap(), BasisPoints::new(5000));
    assert_eq!(h.facade.share_of(group.id, &b).unwrap(), BasisPoints::new(5000));

    let withdraw = "1".parse::<ProposalType>().unwrap();
    let proposal = h
        .facade
        .create_proposal(group.id, &a, withdraw, vec![], None)
        .unwrap();
    h.facade.vote(proposal, &a, VoteChoice::For).unwrap();
    h.facade.vote(proposal, &b, VoteChoice::For).unwrap();

    let view = h.facade.get_proposal(proposal).unwrap();
    assert_eq!(view.proposal.votes_for, 2);
    assert_eq!(view.required_quorum, 2);

    let result = h.facade.execute_if_approved(proposal).unwrap();
    assert_eq!(result.proposal_type, ProposalType::Withdraw);
    assert!(matches!(
        h.facade.execute_if_approved(proposal),
        Err(SyndicateError::AlreadyExecuted(_))
    ));

    let tracking = h.facade.get_tracking(group.id).unwrap();
    assert_eq!(tracking.executed, 1);
    assert!(tracking.proposals[0].proposal.execution_receipt.is_some());

    let journal = h.facade.journal(group.id).unwrap();
    let kinds: Vec<_> = journal.receipts.iter().map(|r| r.receipt_type).collect();
    assert_eq!(
        kinds,
        vec![
            ReceiptType::GroupCreated,
            ReceiptType::MemberJoined,
            ReceiptType::ProposalCreated,
            ReceiptType::VoteCast,
            ReceiptType::VoteCast,
            ReceiptType::ProposalExecuted,
        ]
    );
}

#[test]
fn proposal_ids_are_global_across_groups() {
    let h = harness();
    let first = group_of(&h, 1);
    let second = group_of(&h, 1);

    let p1 = propose(&h, first);
    let p2 = propose(&h, second);
    let p3 = propose(&h, first);
    assert!(p1 < p2 && p2 < p3);

    assert_eq!(h.facade.get_proposal(p2).unwrap().proposal.group_id, second);
    assert_eq!(h.facade.get_tracking(first).unwrap().total(), 2);
}

#[test]
fn non_members_cannot_act() {
    let h = harness();
    let group = group_of(&h, 2);
    let stranger = MemberId::new("stranger");

    assert!(matches!(
        h.facade.deposit(group, &stranger, Amount::new(1)),
        Err(SyndicateError::NotAMember { .. })
    ));
    assert!(matches!(
        h.facade
            .create_proposal(group, &stranger, ProposalType::AddMember, vec![], None),
        Err(SyndicateError::NotAMember { .. })
    ));

    let proposal = propose(&h, group);
    assert!(matches!(
        h.facade.vote(proposal, &stranger, VoteChoice::For),
        Err(SyndicateError::NotAMember { .. })
    ));
    assert!(matches!(
        h.facade.cancel_proposal(proposal, &stranger),
        Err(SyndicateError::Unauthorized { .. })
    ));
}

#[test]
fn voting_weight_ignores_contribution_size() {
    let h = harness();
    let group = h
        .facade
        .create_group("whales", member(0), Amount::new(1_000_000))
        .unwrap()
        .id;
    h.facade.join_group(group, member(1), Amount::new(1)).unwrap();
    h.facade.join_group(group, member(2), Amount::new(1)).unwrap();

    let proposal = propose(&h, group);
    h.facade.vote(proposal, &member(0), VoteChoice::For).unwrap();
    assert!(matches!(
        h.facade.execute_if_approved(proposal),
        Err(SyndicateError::QuorumNotMet { required: 2, current: 1 })
    ));

    h.facade.vote(proposal, &member(1), VoteChoice::For).unwrap();
    assert!(h.facade.execute_if_approved(proposal).is_ok());
}
