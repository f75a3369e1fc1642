use panel_core::enums::SelectionPolicy;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::AssignCommands;
use crate::commands::shared::parse::parse_enum;
use crate::context::AppContext;
use crate::output::output;

/// Handle `panel assign`.
pub async fn handle(action: &AssignCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let svc = &ctx.service;
    match action {
        AssignCommands::Auto { item, policy } => {
            let policy = match policy {
                Some(raw) => parse_enum::<SelectionPolicy>(raw, "policy")?,
                None => ctx.config.selection.default_policy,
            };
            let outcome = svc.assign_reviewers(&ctx.identity().await?, item, policy).await?;
            output(&outcome, flags.format)
        }
        AssignCommands::Manual { item, reviewers } => {
            let outcome = svc
                .assign_manually(&ctx.identity().await?, item, reviewers)
                .await?;
            output(&outcome, flags.format)
        }
        AssignCommands::Replace { item, old, new } => {
            let assignment = svc
                .replace_reviewer(&ctx.identity().await?, item, old, new)
                .await?;
            output(&assignment, flags.format)
        }
        AssignCommands::ReplaceEverywhere { old, new } => {
            let outcome = svc
                .replace_reviewer_everywhere(&ctx.identity().await?, old, new)
                .await?;
            output(&outcome, flags.format)
        }
        AssignCommands::Remove { id } => {
            output(&svc.remove_assignment(&ctx.identity().await?, id).await?, flags.format)
        }
        AssignCommands::List { item } => output(&svc.assignments_for_item(item).await?, flags.format),
        AssignCommands::Open => output(&svc.assignments_for_replacement().await?, flags.format),
    }
}
