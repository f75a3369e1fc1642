//! Status counts for items and assignments.

use panel_core::enums::{AssignmentStatus, ItemStatus};
use panel_core::responses::{AssignmentStatistics, ItemStatistics};

use crate::error::DatabaseError;
use crate::helpers::parse_enum;
use crate::service::PanelService;

fn count(row: &libsql::Row, idx: i32) -> Result<u64, DatabaseError> {
    let raw: i64 = row.get(idx)?;
    u64::try_from(raw).map_err(|_| DatabaseError::InvalidState(format!("negative count {raw}")))
}

impl PanelService {
    /// Items per status, archived included.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn item_statistics(&self) -> Result<ItemStatistics, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query("SELECT status, COUNT(*) FROM reviewed_items GROUP BY status", ())
            .await?;
        let mut stats = ItemStatistics::default();
        while let Some(row) = rows.next().await? {
            let status: ItemStatus = parse_enum(&row.get::<String>(0)?)?;
            stats.record(status, count(&row, 1)?);
        }
        Ok(stats)
    }

    /// Assignments per status, optionally for one reviewer.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn assignment_statistics(
        &self,
        reviewer_id: Option<&str>,
    ) -> Result<AssignmentStatistics, DatabaseError> {
        let base = "SELECT status, recommended, COUNT(*) FROM review_assignments";
        let group = "GROUP BY status, recommended";
        let conn = self.db().conn();
        let mut rows = match reviewer_id {
            Some(reviewer) => {
                conn.query(&format!("{base} WHERE reviewer_id = ?1 {group}"), [reviewer])
                    .await?
            }
            None => conn.query(&format!("{base} {group}"), ()).await?,
        };

        let mut stats = AssignmentStatistics::default();
        while let Some(row) = rows.next().await? {
            let status: AssignmentStatus = parse_enum(&row.get::<String>(0)?)?;
            let recommended = row.get::<i64>(1)? != 0;
            let n = count(&row, 2)?;
            stats.total += n;
            match status {
                AssignmentStatus::Pending => stats.pending += n,
                AssignmentStatus::InProgress => stats.in_progress += n,
                AssignmentStatus::NeedsRevision => stats.needs_revision += n,
                AssignmentStatus::Completed => {
                    stats.completed += n;
                    if recommended {
                        stats.approved += n;
                    } else {
                        stats.rejected += n;
                    }
                }
                AssignmentStatus::Approved | AssignmentStatus::Rejected => {
                    return Err(DatabaseError::InvalidState(format!(
                        "derived status {status} stored on an assignment"
                    )));
                }
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_core::criteria::{CriteriaSheet, Criterion};
    use panel_core::entities::ReviewNarrative;
    use crate::test_support::helpers::{admin, draft, holder, seeded_service, submitted};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn empty_database_counts_nothing() {
        let svc = seeded_service().await;
        assert_eq!(svc.item_statistics().await.unwrap(), ItemStatistics::default());
        assert_eq!(
            svc.assignment_statistics(None).await.unwrap(),
            AssignmentStatistics::default()
        );
    }

    #[tokio::test]
    async fn counts_follow_the_workflow() {
        let svc = seeded_service().await;
        draft(&svc, "Draft only").await;
        let archived = draft(&svc, "Shelved").await;
        svc.archive(&admin(), &archived.id).await.unwrap();
        let outcome = submitted(&svc).await;
        let panel = outcome.assignment.assignments;

        let mut fail = CriteriaSheet::uniform(true);
        fail.characteristics.planned_outcomes = Criterion::fail("Not measurable");
        let pass = CriteriaSheet::uniform(true);
        svc.submit_review(&holder(&panel[0]), &panel[0].id, &pass, ReviewNarrative::default())
            .await
            .unwrap();
        svc.submit_review(&holder(&panel[1]), &panel[1].id, &fail, ReviewNarrative::default())
            .await
            .unwrap();
        svc.start_review(&holder(&panel[2]), &panel[2].id).await.unwrap();

        let items = svc.item_statistics().await.unwrap();
        assert_eq!(
            items,
            ItemStatistics {
                total: 3,
                draft: 1,
                in_review: 1,
                archived: 1,
                ..ItemStatistics::default()
            }
        );

        let all = svc.assignment_statistics(None).await.unwrap();
        assert_eq!(
            all,
            AssignmentStatistics {
                total: 3,
                in_progress: 1,
                completed: 2,
                approved: 1,
                rejected: 1,
                ..AssignmentStatistics::default()
            }
        );

        let mine = svc.assignment_statistics(Some(&panel[1].reviewer_id)).await.unwrap();
        assert_eq!(mine.total, 1);
        assert_eq!(mine.rejected, 1);
    }
}
