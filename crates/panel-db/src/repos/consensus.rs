//! Consensus evaluation: apply the unanimity decision of the current round.

use chrono::Utc;
use panel_core::consensus::{ConsensusDecision, decide};
use panel_core::entities::ReviewedItem;
use panel_core::enums::{Capability, ItemStatus};
use panel_core::identity::{CallerIdentity, ensure_capability};
use panel_core::responses::FinalizeOutcome;

use super::assignment::round_assignments;
use super::item::fetch_item;
use crate::error::DatabaseError;
use crate::service::PanelService;

impl PanelService {
    /// Re-evaluate an item's current round and apply the decision.
    ///
    /// Safe to call repeatedly: an item that is already decided, or no
    /// longer under review, is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Forbidden` for non-administrators and
    /// `CoreError::NotFound` if the item does not exist.
    pub async fn finalize(
        &self,
        caller: &CallerIdentity,
        item_id: &str,
    ) -> Result<FinalizeOutcome, DatabaseError> {
        ensure_capability(caller, Capability::Admin, "finalize item")?;
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<_, DatabaseError> = async {
            let item = fetch_item(&tx, item_id).await?;
            self.finalize_in(&tx, &caller.user_id, &item).await
        }
        .await;
        Self::finish(tx, result).await
    }

    pub(crate) async fn finalize_in(
        &self,
        conn: &libsql::Connection,
        actor_id: &str,
        item: &ReviewedItem,
    ) -> Result<FinalizeOutcome, DatabaseError> {
        let round = round_assignments(conn, &item.id, item.revision_round).await?;
        let decision = decide(&round);

        let target = match decision {
            ConsensusDecision::Pending { completed } => {
                tracing::debug!(item = %item.id, completed, "consensus pending");
                return Ok(FinalizeOutcome::Awaiting { completed });
            }
            ConsensusDecision::Approve => ItemStatus::Approved,
            ConsensusDecision::Revise => ItemStatus::NeedsRevision,
        };

        if !item.status.is_under_review() {
            tracing::debug!(item = %item.id, status = %item.status, "finalize is a no-op");
            return Ok(FinalizeOutcome::Unchanged {
                status: item.status,
            });
        }

        let extra: Vec<(&'static str, libsql::Value)> = if target == ItemStatus::Approved {
            vec![("approved_at", Utc::now().to_rfc3339().into())]
        } else {
            vec![]
        };
        let updated = self
            .transition_item_in(
                conn,
                actor_id,
                item,
                target,
                extra,
                Some(format!("consensus of round {}", item.revision_round)),
            )
            .await?;
        tracing::info!(item = %item.id, ?decision, status = %updated.status, "consensus applied");

        Ok(FinalizeOutcome::Applied {
            decision,
            status: updated.status,
        })
    }
}
