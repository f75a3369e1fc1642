use clap::{Args, Subcommand};

/// Reviewer commands.
#[derive(Clone, Debug, Subcommand)]
pub enum ReviewCommands {
    /// Assignments held by the caller.
    Mine {
        #[arg(long)]
        status: Option<String>,
    },
    /// Get an assignment by ID.
    Get { id: String },
    /// Begin work on an assignment.
    Start { id: String },
    /// Submit the criteria sheet. Criteria not named by --fail pass.
    Submit {
        id: String,
        /// name or name=comment of a failed criterion (repeatable)
        #[arg(long)]
        fail: Vec<String>,
        #[command(flatten)]
        narrative: NarrativeArgs,
    },
    /// Send the item back to its author.
    Revise {
        id: String,
        #[arg(long)]
        comments: String,
        #[command(flatten)]
        narrative: NarrativeArgs,
    },
}

#[derive(Clone, Debug, Default, Args)]
pub struct NarrativeArgs {
    #[arg(long)]
    pub feedback: Option<String>,
    #[arg(long)]
    pub recommendations: Option<String>,
    #[arg(long)]
    pub conclusion: Option<String>,
    #[arg(long)]
    pub additional: Option<String>,
}
