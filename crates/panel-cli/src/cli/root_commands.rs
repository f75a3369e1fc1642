use clap::{Args, Subcommand};

use crate::cli::subcommands::{AssignCommands, ItemCommands, ReviewCommands, UserCommands};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Directory of users and their capabilities.
    User {
        #[command(subcommand)]
        action: UserCommands,
    },
    /// Reviewed items: authoring and lifecycle.
    Item {
        #[command(subcommand)]
        action: ItemCommands,
    },
    /// Reviewer assignment and replacement.
    Assign {
        #[command(subcommand)]
        action: AssignCommands,
    },
    /// The reviewer side of an assignment.
    Review {
        #[command(subcommand)]
        action: ReviewCommands,
    },
    /// Query the audit trail.
    Audit(AuditArgs),
    /// Counts per status.
    Stats(StatsArgs),
}

#[derive(Clone, Debug, Args)]
pub struct AuditArgs {
    /// item, assignment or user
    #[arg(long)]
    pub entity_type: Option<String>,
    #[arg(long)]
    pub entity_id: Option<String>,
    #[arg(long)]
    pub action: Option<String>,
    #[arg(long)]
    pub actor: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct StatsArgs {
    /// Restrict assignment counts to one reviewer.
    #[arg(long)]
    pub reviewer: Option<String>,
}
