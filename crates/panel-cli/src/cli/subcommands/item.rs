use clap::Subcommand;

/// Reviewed item commands.
#[derive(Clone, Debug, Subcommand)]
pub enum ItemCommands {
    /// Create a draft.
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Full content as a JSON object
        #[arg(long)]
        content: Option<String>,
    },
    /// Edit a draft or an item sent back for revision.
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "clear_subject")]
        subject: Option<String>,
        #[arg(long)]
        clear_subject: bool,
        /// Full content as a JSON object
        #[arg(long)]
        content: Option<String>,
    },
    /// Get an item by ID.
    Get { id: String },
    /// List items (archived ones only with --status archived).
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        author: Option<String>,
    },
    /// List archived items.
    Archived,
    /// Every version in the item's chain.
    Versions { id: String },
    /// Completed reviews of an item.
    Reviews { id: String },
    /// Submit a draft and assign reviewers.
    Submit { id: String },
    /// Approve an item under review.
    Approve { id: String },
    /// Reject an item under review.
    Reject {
        id: String,
        #[arg(long)]
        reason: String,
    },
    /// Archive an item.
    Archive { id: String },
    /// Restore an archived item.
    Unarchive { id: String },
    /// Start the next version of a rejected item.
    NewVersion { id: String },
    /// Resubmit an item after revision.
    Resubmit {
        id: String,
        #[arg(long)]
        notes: String,
        #[arg(long)]
        changes: Option<String>,
    },
    /// Re-evaluate consensus for an item.
    Finalize { id: String },
}
