use clap::Parser;

pub mod global;
pub mod root_commands;
pub mod subcommands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `panel` binary.
#[derive(Debug, Parser)]
#[command(name = "panel", version, about = "Panel - expert assignment and review consensus")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, table, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Max results to return
    #[arg(short, long, global = true)]
    pub limit: Option<u32>,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Act as this registered user
    #[arg(long = "as", global = true, value_name = "USER_ID")]
    pub caller: Option<String>,

    /// Database path (overrides database.path)
    #[arg(long, global = true)]
    pub db: Option<String>,
}

impl Cli {
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            limit: self.limit,
            quiet: self.quiet,
            verbose: self.verbose,
            caller: self.caller.clone(),
            db: self.db.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use pretty_assertions::assert_eq;

    use super::subcommands::{AssignCommands, ItemCommands, ReviewCommands};
    use super::{Cli, Commands, OutputFormat};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_around_subcommand() {
        let cli = Cli::try_parse_from([
            "panel", "--format", "table", "--as", "u-admin", "item", "approve", "itm-1", "--verbose",
        ])
        .expect("cli should parse");

        let flags = cli.global_flags();
        assert_eq!(flags.format, OutputFormat::Table);
        assert_eq!(flags.caller.as_deref(), Some("u-admin"));
        assert!(flags.verbose);
        assert!(matches!(
            cli.command,
            Commands::Item { action: ItemCommands::Approve { ref id } } if id == "itm-1"
        ));
    }

    #[test]
    fn manual_assignment_takes_several_reviewers() {
        let cli = Cli::try_parse_from(["panel", "assign", "manual", "itm-1", "u-a", "u-b"])
            .expect("cli should parse");
        match cli.command {
            Commands::Assign { action: AssignCommands::Manual { item, reviewers } } => {
                assert_eq!(item, "itm-1");
                assert_eq!(reviewers, vec!["u-a".to_string(), "u-b".to_string()]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn review_submit_collects_failures() {
        let cli = Cli::try_parse_from([
            "panel",
            "review",
            "submit",
            "asg-1",
            "--fail",
            "relevance=outdated",
            "--fail",
            "matches_topic",
        ])
        .expect("cli should parse");
        match cli.command {
            Commands::Review { action: ReviewCommands::Submit { fail, .. } } => {
                assert_eq!(fail.len(), 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn reject_requires_reason() {
        assert!(Cli::try_parse_from(["panel", "item", "reject", "itm-1"]).is_err());
    }
}
