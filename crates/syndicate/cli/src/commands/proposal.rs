//! Proposal commands

use clap::Subcommand;
use syndicate_runtime::GovernanceFacade;
use syndicate_types::{GroupId, ProposalId, ProposalType, ProposalView, VoteChoice};

use super::member;
use crate::error::{CliError, CliResult};
use crate::output::{emit, print_error, print_fields, print_success, OutputFormat};

/// Proposal subcommands
#[derive(Subcommand)]
pub enum ProposalCommands {
    /// Open a proposal in a group
    Create {
        group_id: GroupId,

        /// Proposing member
        #[arg(short, long)]
        proposer: String,

        /// Proposal type: name (withdraw, execute-strategy, ...) or code (0-4)
        #[arg(short = 't', long = "type")]
        proposal_type: String,

        /// Payload handed to the strategy executor, as text
        #[arg(short = 'd', long, default_value = "")]
        payload: String,

        /// Voting window in hours (defaults to the configured window)
        #[arg(long)]
        hours: Option<u32>,
    },

    /// Vote on a proposal
    Vote {
        proposal_id: ProposalId,
        member: String,

        /// for | against
        choice: String,
    },

    /// Execute a proposal that has reached quorum
    Execute { proposal_id: ProposalId },

    /// Cancel a pending proposal (proposer or group admin)
    Cancel {
        proposal_id: ProposalId,

        #[arg(short, long)]
        actor: String,
    },

    /// Show a proposal with its derived status
    Show { proposal_id: ProposalId },
}

/// Execute proposal command
pub fn execute(
    command: ProposalCommands,
    facade: &GovernanceFacade,
    format: OutputFormat,
) -> CliResult<()> {
    match command {
        ProposalCommands::Create {
            group_id,
            proposer,
            proposal_type,
            payload,
            hours,
        } => {
            let proposer = member(&proposer)?;
            let proposal_type: ProposalType =
                proposal_type.parse().map_err(CliError::InvalidArgument)?;
            let result = facade.create_proposal(
                group_id,
                &proposer,
                proposal_type,
                payload.into_bytes(),
                hours,
            );
            emit(result, format, |id| {
                print_success(&format!(
                    "Created proposal {} ({}) in group {}",
                    id, proposal_type, group_id
                ));
            })
        }
        ProposalCommands::Vote {
            proposal_id,
            member: who,
            choice,
        } => {
            let who = member(&who)?;
            let choice: VoteChoice = choice.parse().map_err(CliError::InvalidArgument)?;
            emit(facade.vote(proposal_id, &who, choice), format, |p| {
                print_success(&format!(
                    "{} voted {:?} on proposal {}: {} for, {} against",
                    who, choice, p.id, p.votes_for, p.votes_against
                ));
            })
        }
        ProposalCommands::Execute { proposal_id } => {
            emit(facade.execute_if_approved(proposal_id), format, |r| {
                print_success(&format!(
                    "Proposal {} executed by {} (ref {})",
                    r.proposal_id, r.receipt.executor, r.receipt.reference
                ));
                if !r.persisted {
                    print_error("The outcome could not be written to the state file");
                }
            })
        }
        ProposalCommands::Cancel { proposal_id, actor } => {
            let actor = member(&actor)?;
            emit(facade.cancel_proposal(proposal_id, &actor), format, |p| {
                print_success(&format!("Proposal {} cancelled by {}", p.id, actor));
            })
        }
        ProposalCommands::Show { proposal_id } => {
            emit(facade.get_proposal(proposal_id), format, show_proposal)
        }
    }
}

fn show_proposal(view: &ProposalView) {
    let p = &view.proposal;
    let mut fields = vec![
        ("Group", p.group_id.to_string()),
        ("Type", p.proposal_type.to_string()),
        ("Status", view.status.to_string()),
        ("Proposer", p.proposer.to_string()),
        ("Votes for", p.votes_for.to_string()),
        ("Votes against", p.votes_against.to_string()),
        ("Required quorum", view.required_quorum.to_string()),
        ("Deadline", p.deadline.to_rfc3339()),
        ("Payload", String::from_utf8_lossy(&p.payload).into_owned()),
    ];
    if let Some(receipt) = &p.execution_receipt {
        fields.push(("Receipt", receipt.reference.clone()));
    }
    if let Some(error) = &p.execution_error {
        fields.push(("Execution error", error.clone()));
    }
    print_fields(&format!("Proposal {}", p.id), &fields);
}
