//! Review assignment repository: queries plus the insert and
//! compare-and-swap helpers used by the selector and the review store.

use chrono::Utc;
use panel_core::audit_detail::StatusChangedDetail;
use panel_core::entities::ReviewAssignment;
use panel_core::enums::{AssignmentStatus, AuditAction, EntityType, Slot};
use panel_core::errors::CoreError;
use panel_core::ids::PREFIX_ASSIGNMENT;

use crate::error::DatabaseError;
use crate::generate_id;
use crate::helpers::{
    get_opt_string, get_u32, parse_datetime, parse_enum, parse_json, parse_optional_datetime,
    parse_optional_json, to_detail,
};
use crate::service::PanelService;

pub(crate) const SELECT_COLS: &str = "id, item_id, reviewer_id, assigned_by, slot, status, criteria, \
     recommended, narrative, revision_comments, revision_round, assigned_at, reviewed_at, \
     sent_for_revision_at, created_at, updated_at";

fn row_to_assignment(row: &libsql::Row) -> Result<ReviewAssignment, DatabaseError> {
    Ok(ReviewAssignment {
        id: row.get(0)?,
        item_id: row.get(1)?,
        reviewer_id: row.get(2)?,
        assigned_by: row.get(3)?,
        slot: parse_enum(&row.get::<String>(4)?)?,
        status: parse_enum(&row.get::<String>(5)?)?,
        criteria: parse_optional_json(get_opt_string(row, 6)?.as_deref())?,
        recommended: row.get::<i64>(7)? != 0,
        narrative: parse_json(&row.get::<String>(8)?)?,
        revision_comments: get_opt_string(row, 9)?,
        revision_round: get_u32(row, 10)?,
        assigned_at: parse_datetime(&row.get::<String>(11)?)?,
        reviewed_at: parse_optional_datetime(get_opt_string(row, 12)?.as_deref())?,
        sent_for_revision_at: parse_optional_datetime(get_opt_string(row, 13)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(14)?)?,
        updated_at: parse_datetime(&row.get::<String>(15)?)?,
    })
}

async fn collect_assignments(
    mut rows: libsql::Rows,
) -> Result<Vec<ReviewAssignment>, DatabaseError> {
    let mut assignments = Vec::new();
    while let Some(row) = rows.next().await? {
        assignments.push(row_to_assignment(&row)?);
    }
    Ok(assignments)
}

pub(crate) async fn fetch_assignment(
    conn: &libsql::Connection,
    id: &str,
) -> Result<ReviewAssignment, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {SELECT_COLS} FROM review_assignments WHERE id = ?1"),
            [id],
        )
        .await?;
    let row = rows
        .next()
        .await?
        .ok_or_else(|| CoreError::not_found(EntityType::Assignment, id))?;
    row_to_assignment(&row)
}

/// All assignments of an item across every round, by round then slot.
pub(crate) async fn item_assignments(
    conn: &libsql::Connection,
    item_id: &str,
) -> Result<Vec<ReviewAssignment>, DatabaseError> {
    let rows = conn
        .query(
            &format!(
                "SELECT {SELECT_COLS} FROM review_assignments WHERE item_id = ?1
                 ORDER BY revision_round, slot"
            ),
            [item_id],
        )
        .await?;
    collect_assignments(rows).await
}

/// Assignments of one revision round of an item.
pub(crate) async fn round_assignments(
    conn: &libsql::Connection,
    item_id: &str,
    round: u32,
) -> Result<Vec<ReviewAssignment>, DatabaseError> {
    let rows = conn
        .query(
            &format!(
                "SELECT {SELECT_COLS} FROM review_assignments
                 WHERE item_id = ?1 AND revision_round = ?2 ORDER BY slot"
            ),
            libsql::params![item_id, i64::from(round)],
        )
        .await?;
    collect_assignments(rows).await
}

/// The assignment belongs to the current round of an item still under review.
const LIVE_ROUND: &str = "EXISTS (SELECT 1 FROM reviewed_items i
      WHERE i.id = review_assignments.item_id
        AND i.revision_round = review_assignments.revision_round
        AND i.status IN ('submitted', 'in_review'))";

/// Pending and in-progress assignments of live review rounds, optionally of
/// one reviewer. Unfinished slots of a closed round are not work anyone can do.
pub(crate) async fn active_assignments(
    conn: &libsql::Connection,
    reviewer_id: Option<&str>,
) -> Result<Vec<ReviewAssignment>, DatabaseError> {
    let base = format!(
        "SELECT {SELECT_COLS} FROM review_assignments
         WHERE status IN ('{}', '{}') AND {LIVE_ROUND}",
        AssignmentStatus::Pending.as_str(),
        AssignmentStatus::InProgress.as_str()
    );
    let rows = match reviewer_id {
        Some(reviewer) => {
            conn.query(
                &format!("{base} AND reviewer_id = ?1 ORDER BY assigned_at, id"),
                [reviewer],
            )
            .await?
        }
        None => conn.query(&format!("{base} ORDER BY assigned_at, id"), ()).await?,
    };
    collect_assignments(rows).await
}

/// A new `Pending` assignment to insert.
pub(crate) struct AssignmentDraft<'a> {
    pub item_id: &'a str,
    pub reviewer_id: &'a str,
    pub assigned_by: &'a str,
    pub slot: Slot,
    pub revision_round: u32,
}

impl PanelService {
    pub(crate) async fn insert_assignment_in(
        &self,
        conn: &libsql::Connection,
        draft: &AssignmentDraft<'_>,
    ) -> Result<ReviewAssignment, DatabaseError> {
        let id = generate_id(conn, PREFIX_ASSIGNMENT).await?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO review_assignments (id, item_id, reviewer_id, assigned_by, slot, status,
                recommended, narrative, revision_round, assigned_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, '{}', ?7, ?8, ?8, ?8)",
            libsql::params![
                id.as_str(),
                draft.item_id,
                draft.reviewer_id,
                draft.assigned_by,
                draft.slot.as_str(),
                AssignmentStatus::Pending.as_str(),
                i64::from(draft.revision_round),
                now
            ],
        )
        .await?;
        fetch_assignment(conn, &id).await
    }

    /// Move `assignment` to `to` if its stored status is still `assignment.status`.
    pub(crate) async fn transition_assignment_in(
        &self,
        conn: &libsql::Connection,
        actor_id: &str,
        assignment: &ReviewAssignment,
        to: AssignmentStatus,
        extra: Vec<(&'static str, libsql::Value)>,
    ) -> Result<ReviewAssignment, DatabaseError> {
        let invalid = || {
            CoreError::invalid_transition(EntityType::Assignment, &assignment.id, assignment.status, to)
        };
        if !assignment.status.can_transition_to(to) {
            return Err(invalid().into());
        }

        let mut sets = vec!["status = ?1".to_string(), "updated_at = ?2".to_string()];
        let mut params: Vec<libsql::Value> =
            vec![to.as_str().into(), Utc::now().to_rfc3339().into()];
        for (column, value) in extra {
            params.push(value);
            sets.push(format!("{column} = ?{}", params.len()));
        }
        params.push(assignment.id.as_str().into());
        let id_idx = params.len();
        params.push(assignment.status.as_str().into());
        let status_idx = params.len();

        let sql = format!(
            "UPDATE review_assignments SET {} WHERE id = ?{id_idx} AND status = ?{status_idx}",
            sets.join(", ")
        );
        let changed = conn.execute(&sql, libsql::params_from_iter(params)).await?;
        if changed != 1 {
            return Err(invalid().into());
        }

        let detail = StatusChangedDetail {
            from: assignment.status.as_str().to_string(),
            to: to.as_str().to_string(),
            reason: None,
        };
        self.record_in(
            conn,
            actor_id,
            EntityType::Assignment,
            &assignment.id,
            AuditAction::StatusChanged,
            Some(to_detail(&detail)?),
        )
        .await?;
        tracing::info!(
            assignment = %assignment.id,
            item = %assignment.item_id,
            from = %assignment.status,
            to = %to,
            "assignment status changed"
        );

        fetch_assignment(conn, &assignment.id).await
    }

    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the assignment does not exist.
    pub async fn get_assignment(&self, id: &str) -> Result<ReviewAssignment, DatabaseError> {
        fetch_assignment(self.db().conn(), id).await
    }

    /// Every assignment of an item, all rounds.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn assignments_for_item(
        &self,
        item_id: &str,
    ) -> Result<Vec<ReviewAssignment>, DatabaseError> {
        item_assignments(self.db().conn(), item_id).await
    }

    /// A reviewer's assignments, optionally restricted to one stored status.
    /// Unfinished slots of a closed round are left out.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn my_assignments(
        &self,
        reviewer_id: &str,
        status: Option<AssignmentStatus>,
    ) -> Result<Vec<ReviewAssignment>, DatabaseError> {
        let conn = self.db().conn();
        let rows = match status {
            Some(status) => {
                conn.query(
                    &format!(
                        "SELECT {SELECT_COLS} FROM review_assignments
                         WHERE reviewer_id = ?1 AND status = ?2 AND (status NOT IN ('pending', 'in_progress') OR {LIVE_ROUND})
                         ORDER BY assigned_at DESC, id"
                    ),
                    [reviewer_id, status.as_str()],
                )
                .await?
            }
            None => {
                conn.query(
                    &format!(
                        "SELECT {SELECT_COLS} FROM review_assignments
                         WHERE reviewer_id = ?1 AND (status NOT IN ('pending', 'in_progress') OR {LIVE_ROUND})
                         ORDER BY assigned_at DESC, id"
                    ),
                    [reviewer_id],
                )
                .await?
            }
        };
        collect_assignments(rows).await
    }

    /// Every pending or in-progress assignment of a live round: the candidates
    /// for replacement.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn assignments_for_replacement(&self) -> Result<Vec<ReviewAssignment>, DatabaseError> {
        active_assignments(self.db().conn(), None).await
    }

    /// Completed reviews of an item across all rounds, oldest round first:
    /// the conclusions the author gets to read.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the item does not exist.
    pub async fn completed_reviews_for_item(
        &self,
        item_id: &str,
    ) -> Result<Vec<ReviewAssignment>, DatabaseError> {
        let conn = self.db().conn();
        super::item::fetch_item(conn, item_id).await?;
        let all = item_assignments(conn, item_id).await?;
        Ok(all.into_iter().filter(ReviewAssignment::is_completed).collect())
    }
}
