use clap::Subcommand;

/// Directory commands.
#[derive(Clone, Debug, Subcommand)]
pub enum UserCommands {
    /// Register a user, or update an existing one.
    Register {
        id: String,
        #[arg(long)]
        name: String,
        /// admin, expert or author (repeatable)
        #[arg(long = "capability", required = true)]
        capabilities: Vec<String>,
        #[arg(long)]
        workplace: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        position: Option<String>,
        /// Subject tag taught (repeatable)
        #[arg(long = "subject")]
        subjects: Vec<String>,
    },
    /// Get a user by ID.
    Get { id: String },
    /// List users.
    List,
    /// Find users holding a capability.
    Find {
        #[arg(long)]
        capability: String,
        #[arg(long)]
        workplace: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        subject: Option<String>,
    },
}
