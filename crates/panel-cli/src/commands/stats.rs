use serde::Serialize;

use panel_core::responses::{AssignmentStatistics, ItemStatistics};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::StatsArgs;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct StatsReport {
    items: ItemStatistics,
    assignments: AssignmentStatistics,
}

/// Handle `panel stats`.
pub async fn handle(args: &StatsArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let report = StatsReport {
        items: ctx.service.item_statistics().await?,
        assignments: ctx
            .service
            .assignment_statistics(args.reviewer.as_deref())
            .await?,
    };
    output(&report, flags.format)
}
