//! Group commands

use clap::Subcommand;
use colored::Colorize;
use serde::Serialize;
use syndicate_runtime::GovernanceFacade;
use syndicate_types::{Group, GroupId, GroupMembers, GroupTracking, LedgerReceipt, MemberView};
use tabled::Tabled;

use super::{member, parse_amount};
use crate::error::CliResult;
use crate::output::{emit, print_fields, print_success, print_table, OutputFormat};

/// Group subcommands
#[derive(Subcommand)]
pub enum GroupCommands {
    /// Create a group; the admin becomes its first member
    Create {
        /// Group name
        name: String,

        /// Founding admin
        #[arg(short, long)]
        admin: String,

        /// Initial deposit, in the smallest currency unit
        #[arg(short, long)]
        deposit: String,
    },

    /// Join a group with an initial deposit
    Join {
        group_id: GroupId,
        member: String,

        #[arg(short, long)]
        deposit: String,
    },

    /// Add to a member's contribution
    Deposit {
        group_id: GroupId,
        member: String,
        amount: String,
    },

    /// Show a group
    Show { group_id: GroupId },

    /// List members with their shares
    Members { group_id: GroupId },

    /// Proposal counts and states for a group
    Tracking { group_id: GroupId },

    /// Show the group's audit journal, newest first
    Journal {
        group_id: GroupId,

        /// Maximum number of receipts to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

/// Table row for member display
#[derive(Debug, Serialize, Tabled)]
struct MemberRow {
    seat: u32,
    member: String,
    contribution: String,
    share: String,
    admin: String,
}

impl From<&MemberView> for MemberRow {
    fn from(m: &MemberView) -> Self {
        Self {
            seat: m.seat,
            member: m.member_id.to_string(),
            contribution: m.contribution.to_string(),
            share: m.share_percent.to_string(),
            admin: if m.is_admin { "yes".into() } else { String::new() },
        }
    }
}

/// Table row for journal display
#[derive(Debug, Serialize, Tabled)]
struct ReceiptRow {
    time: String,
    kind: String,
    actor: String,
    description: String,
}

impl From<&LedgerReceipt> for ReceiptRow {
    fn from(r: &LedgerReceipt) -> Self {
        Self {
            time: r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            kind: format!("{:?}", r.receipt_type),
            actor: r.actor.to_string(),
            description: r.description.clone(),
        }
    }
}

/// Execute group command
pub fn execute(command: GroupCommands, facade: &GovernanceFacade, format: OutputFormat) -> CliResult<()> {
    match command {
        GroupCommands::Create {
            name,
            admin,
            deposit,
        } => {
            let admin = member(&admin)?;
            let deposit = parse_amount(&deposit)?;
            emit(facade.create_group(name, admin, deposit), format, |g| {
                print_success(&format!("Created group {} ({})", g.id, g.name));
                show_group(g);
            })
        }
        GroupCommands::Join {
            group_id,
            member: who,
            deposit,
        } => {
            let who = member(&who)?;
            let deposit = parse_amount(&deposit)?;
            emit(facade.join_group(group_id, who.clone(), deposit), format, |g| {
                print_success(&format!(
                    "{} joined group {} ({} of {} members)",
                    who, g.id, g.member_count, facade.registry().max_members()
                ));
            })
        }
        GroupCommands::Deposit {
            group_id,
            member: who,
            amount,
        } => {
            let who = member(&who)?;
            let amount = parse_amount(&amount)?;
            emit(facade.deposit(group_id, &who, amount), format, |g| {
                print_success(&format!(
                    "Recorded {} from {}; pool total is {}",
                    amount, who, g.total_deposited
                ));
            })
        }
        GroupCommands::Show { group_id } => emit(facade.get_group(group_id), format, show_group),
        GroupCommands::Members { group_id } => {
            emit(facade.get_group_members(group_id), format, show_members)
        }
        GroupCommands::Tracking { group_id } => {
            emit(facade.get_tracking(group_id), format, show_tracking)
        }
        GroupCommands::Journal { group_id, limit } => {
            let receipts = facade.journal(group_id).map(|journal| {
                let latest: Vec<LedgerReceipt> =
                    journal.latest(limit).into_iter().cloned().collect();
                latest
            });
            emit(receipts, format, |receipts| {
                print_table(receipts.iter().map(ReceiptRow::from).collect())
            })
        }
    }
}

fn show_group(g: &Group) {
    print_fields(
        &format!("Group {}", g.id),
        &[
            ("Name", g.name.clone()),
            ("Admin", g.admin.to_string()),
            ("Active", g.is_active.to_string()),
            ("Members", g.member_count.to_string()),
            ("Total deposited", g.total_deposited.to_string()),
            ("Created", g.created_at.to_rfc3339()),
        ],
    );
}

fn show_members(members: &GroupMembers) {
    print_table(members.members.iter().map(MemberRow::from).collect());
    println!(
        "Total deposited: {}  Share total: {}",
        members.total_deposited,
        members.share_total()
    );
}

fn show_tracking(t: &GroupTracking) {
    print_fields(
        &format!("Group {} tracking", t.group.id),
        &[
            ("Members", t.group.member_count.to_string()),
            ("Current quorum", t.current_quorum.to_string()),
            ("Pending", t.pending.to_string()),
            ("Executed", t.executed.to_string()),
            ("Cancelled", t.cancelled.to_string()),
            ("Expired", t.expired.to_string()),
        ],
    );
    if !t.proposals.is_empty() {
        println!();
        println!("{}", "Proposals".bold());
        for view in &t.proposals {
            println!(
                "  #{:<4} {:<18} {:<10} for {} / against {} (quorum {})",
                view.proposal.id,
                view.proposal.proposal_type.to_string(),
                view.status.to_string(),
                view.proposal.votes_for,
                view.proposal.votes_against,
                view.required_quorum
            );
        }
    }
}
