use panel_core::entities::ReviewNarrative;
use panel_core::enums::AssignmentStatus;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::ReviewCommands;
use crate::commands::shared::parse::{criteria_from_failures, narrative, parse_enum};
use crate::context::AppContext;
use crate::output::output;

/// Handle `panel review`.
pub async fn handle(action: &ReviewCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let svc = &ctx.service;
    match action {
        ReviewCommands::Mine { status } => {
            let caller = ctx.identity().await?;
            let status = status
                .as_deref()
                .map(|raw| parse_enum::<AssignmentStatus>(raw, "status"))
                .transpose()?;
            output(&svc.my_assignments(&caller.user_id, status).await?, flags.format)
        }
        ReviewCommands::Get { id } => output(&svc.get_assignment(id).await?, flags.format),
        ReviewCommands::Start { id } => {
            output(&svc.start_review(&ctx.identity().await?, id).await?, flags.format)
        }
        ReviewCommands::Submit {
            id,
            fail,
            narrative: args,
        } => {
            let sheet = criteria_from_failures(fail)?;
            let submission = svc
                .submit_review(&ctx.identity().await?, id, &sheet, narrative(args))
                .await?;
            output(&submission, flags.format)
        }
        ReviewCommands::Revise {
            id,
            comments,
            narrative: args,
        } => {
            let text = narrative(args);
            let text = (text != ReviewNarrative::default()).then_some(text);
            let assignment = svc
                .send_for_revision(&ctx.identity().await?, id, comments, text)
                .await?;
            output(&assignment, flags.format)
        }
    }
}
