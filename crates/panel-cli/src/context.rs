use std::path::Path;

use anyhow::Context;
use panel_config::PanelConfig;
use panel_core::identity::CallerIdentity;
use panel_db::service::PanelService;

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub service: PanelService,
    pub config: PanelConfig,
    caller: Option<String>,
}

impl AppContext {
    /// Open the configured database, creating its directory when needed.
    pub async fn init(config: PanelConfig, caller: Option<String>) -> anyhow::Result<Self> {
        if !config.database.is_in_memory() {
            if let Some(parent) = Path::new(&config.database.path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create database directory {}", parent.display())
                    })?;
                }
            }
        }

        let service = PanelService::new_local(&config.database.path, config.selection.clone())
            .await
            .with_context(|| format!("failed to open database {}", config.database.path))?;
        tracing::debug!(path = %config.database.path, "database opened");

        Ok(Self {
            service,
            config,
            caller,
        })
    }

    /// Resolve `--as` against the directory.
    pub async fn identity(&self) -> anyhow::Result<CallerIdentity> {
        let Some(ref user_id) = self.caller else {
            anyhow::bail!("this command needs a caller: pass --as <user-id>");
        };
        self.service
            .identity_for(user_id)
            .await
            .with_context(|| format!("unknown caller '{user_id}'"))
    }
}
