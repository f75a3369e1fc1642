use panel_core::enums::ItemStatus;
use panel_db::repos::item::{ItemFilter, NewItem};
use panel_db::updates::item::ItemUpdateBuilder;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::ItemCommands;
use crate::commands::shared::limit::effective_limit;
use crate::commands::shared::parse::{parse_content, parse_enum};
use crate::context::AppContext;
use crate::output::output;

/// Handle `panel item`.
pub async fn handle(action: &ItemCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let svc = &ctx.service;
    let limit = effective_limit(flags.limit, ctx.config.general.default_limit);
    match action {
        ItemCommands::Create {
            title,
            subject,
            description,
            content,
        } => {
            let new = NewItem {
                title: title.clone(),
                subject: subject.clone(),
                content: parse_content(content.as_deref(), description.as_deref())?,
            };
            output(&svc.create_item(&ctx.identity().await?, &new).await?, flags.format)
        }
        ItemCommands::Update {
            id,
            title,
            subject,
            clear_subject,
            content,
        } => {
            let mut builder = ItemUpdateBuilder::new();
            if let Some(title) = title {
                builder = builder.title(title.clone());
            }
            if *clear_subject {
                builder = builder.subject(None);
            } else if let Some(subject) = subject {
                builder = builder.subject(Some(subject.clone()));
            }
            if content.is_some() {
                builder = builder.content(parse_content(content.as_deref(), None)?);
            }
            let item = svc.update_item(&ctx.identity().await?, id, &builder.build()).await?;
            output(&item, flags.format)
        }
        ItemCommands::Get { id } => output(&svc.get_item(id).await?, flags.format),
        ItemCommands::List { status, author } => {
            let filter = ItemFilter {
                status: status
                    .as_deref()
                    .map(|raw| parse_enum::<ItemStatus>(raw, "status"))
                    .transpose()?,
                author_id: author.clone(),
                limit: Some(limit),
            };
            output(&svc.list_items(&filter).await?, flags.format)
        }
        ItemCommands::Archived => output(&svc.list_archived_items(limit).await?, flags.format),
        ItemCommands::Versions { id } => output(&svc.get_versions(id).await?, flags.format),
        ItemCommands::Reviews { id } => {
            output(&svc.completed_reviews_for_item(id).await?, flags.format)
        }
        ItemCommands::Submit { id } => {
            let outcome = svc.submit(&ctx.identity().await?, id).await?;
            if let Some(ref short) = outcome.assignment.shortfall {
                if !flags.quiet {
                    eprintln!(
                        "only {} of {} reviewers assigned; use `panel assign` to complete the panel",
                        short.assigned, short.requested
                    );
                }
            }
            output(&outcome, flags.format)
        }
        ItemCommands::Approve { id } => {
            output(&svc.approve(&ctx.identity().await?, id).await?, flags.format)
        }
        ItemCommands::Reject { id, reason } => {
            output(&svc.reject(&ctx.identity().await?, id, reason).await?, flags.format)
        }
        ItemCommands::Archive { id } => {
            output(&svc.archive(&ctx.identity().await?, id).await?, flags.format)
        }
        ItemCommands::Unarchive { id } => {
            output(&svc.unarchive(&ctx.identity().await?, id).await?, flags.format)
        }
        ItemCommands::NewVersion { id } => {
            output(&svc.create_new_version(&ctx.identity().await?, id).await?, flags.format)
        }
        ItemCommands::Resubmit { id, notes, changes } => {
            let item = svc
                .resubmit_after_revision(&ctx.identity().await?, id, notes, changes.as_deref())
                .await?;
            output(&item, flags.format)
        }
        ItemCommands::Finalize { id } => {
            output(&svc.finalize(&ctx.identity().await?, id).await?, flags.format)
        }
    }
}
