use std::collections::BTreeSet;

use panel_core::enums::Capability;
use panel_db::repos::directory::{NewUser, UserFilter};

use crate::cli::GlobalFlags;
use crate::cli::subcommands::UserCommands;
use crate::commands::shared::limit::effective_limit;
use crate::commands::shared::parse::parse_enum;
use crate::context::AppContext;
use crate::output::output;

/// Handle `panel user`.
pub async fn handle(action: &UserCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        UserCommands::Register {
            id,
            name,
            capabilities,
            workplace,
            department,
            position,
            subjects,
        } => {
            let capabilities = capabilities
                .iter()
                .map(|raw| parse_enum::<Capability>(raw, "capability"))
                .collect::<anyhow::Result<BTreeSet<_>>>()?;
            let user = ctx
                .service
                .register_user(&NewUser {
                    id: id.clone(),
                    display_name: name.clone(),
                    capabilities,
                    workplace: workplace.clone(),
                    department: department.clone(),
                    position: position.clone(),
                    subjects: subjects.clone(),
                })
                .await?;
            output(&user, flags.format)
        }
        UserCommands::Get { id } => output(&ctx.service.get_user(id).await?, flags.format),
        UserCommands::List => {
            let limit = effective_limit(flags.limit, ctx.config.general.default_limit);
            output(&ctx.service.list_users(limit).await?, flags.format)
        }
        UserCommands::Find {
            capability,
            workplace,
            department,
            subject,
        } => {
            let capability = parse_enum::<Capability>(capability, "capability")?;
            let filter = UserFilter {
                workplace: workplace.clone(),
                department: department.clone(),
                subject: subject.clone(),
            };
            let users = ctx.service.find_users_by_capability(capability, &filter).await?;
            output(&users, flags.format)
        }
    }
}
