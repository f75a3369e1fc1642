use clap::Subcommand;

/// Assignment commands (administrators).
#[derive(Clone, Debug, Subcommand)]
pub enum AssignCommands {
    /// Select a panel automatically.
    Auto {
        item: String,
        /// pool-a or pool-b (defaults to selection.default_policy)
        #[arg(long)]
        policy: Option<String>,
    },
    /// Assign named experts.
    Manual {
        item: String,
        #[arg(required = true, num_args = 1..=3)]
        reviewers: Vec<String>,
    },
    /// Replace one reviewer on an item.
    Replace {
        item: String,
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
    },
    /// Replace a reviewer on all of their unfinished assignments.
    ReplaceEverywhere {
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
    },
    /// Delete an assignment.
    Remove { id: String },
    /// Assignments of an item.
    List { item: String },
    /// Pending and in-progress assignments.
    Open,
}
