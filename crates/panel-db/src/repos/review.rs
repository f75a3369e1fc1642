//! Review record store: the reviewer side of an assignment.
//!
//! A reviewer may only act on their own assignment, in the item's current
//! revision round, while the item is `Submitted` or `InReview`.

use chrono::Utc;
use panel_core::consensus::recommendation;
use panel_core::criteria::CriteriaSheet;
use panel_core::entities::{ReviewAssignment, ReviewNarrative, ReviewedItem};
use panel_core::enums::{AssignmentStatus, EntityType, ItemStatus};
use panel_core::errors::CoreError;
use panel_core::identity::{CallerIdentity, ensure_owner};
use panel_core::responses::ReviewSubmission;

use super::assignment::fetch_assignment;
use super::item::fetch_item;
use crate::error::DatabaseError;
use crate::helpers::to_json;
use crate::service::PanelService;

/// Load an assignment and its item, checking ownership and review context.
async fn load_for_reviewer(
    conn: &libsql::Connection,
    caller: &CallerIdentity,
    assignment_id: &str,
    to: AssignmentStatus,
    action: &str,
) -> Result<(ReviewAssignment, ReviewedItem), DatabaseError> {
    let assignment = fetch_assignment(conn, assignment_id).await?;
    ensure_owner(caller, &assignment.reviewer_id, action)?;

    let item = fetch_item(conn, &assignment.item_id).await?;
    if !item.status.is_under_review() || assignment.revision_round != item.revision_round {
        return Err(CoreError::invalid_transition(
            EntityType::Assignment,
            assignment_id,
            assignment.status,
            to,
        )
        .into());
    }
    Ok((assignment, item))
}

impl PanelService {
    /// `Pending → InProgress`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Forbidden` unless the caller holds the assignment,
    /// and `CoreError::InvalidTransition` from any status but `Pending`.
    pub async fn start_review(
        &self,
        caller: &CallerIdentity,
        assignment_id: &str,
    ) -> Result<ReviewAssignment, DatabaseError> {
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<_, DatabaseError> = async {
            let (assignment, _) = load_for_reviewer(
                &tx,
                caller,
                assignment_id,
                AssignmentStatus::InProgress,
                "start review",
            )
            .await?;
            self.transition_assignment_in(
                &tx,
                &caller.user_id,
                &assignment,
                AssignmentStatus::InProgress,
                vec![],
            )
            .await
        }
        .await;
        Self::finish(tx, result).await
    }

    /// Store the criteria sheet and complete the review, then run consensus
    /// for the item in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Forbidden` unless the caller holds the assignment,
    /// and `CoreError::InvalidTransition` unless it is `Pending` or `InProgress`.
    pub async fn submit_review(
        &self,
        caller: &CallerIdentity,
        assignment_id: &str,
        criteria: &CriteriaSheet,
        narrative: ReviewNarrative,
    ) -> Result<ReviewSubmission, DatabaseError> {
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<_, DatabaseError> = async {
            let (assignment, _) = load_for_reviewer(
                &tx,
                caller,
                assignment_id,
                AssignmentStatus::Completed,
                "submit review",
            )
            .await?;

            let recommended = recommendation(criteria);
            let narrative = assignment.narrative.clone().merged(narrative);
            let extra: Vec<(&'static str, libsql::Value)> = vec![
                ("criteria", to_json(criteria)?.into()),
                ("recommended", i64::from(recommended).into()),
                ("narrative", to_json(&narrative)?.into()),
                ("reviewed_at", Utc::now().to_rfc3339().into()),
            ];
            let completed = self
                .transition_assignment_in(
                    &tx,
                    &caller.user_id,
                    &assignment,
                    AssignmentStatus::Completed,
                    extra,
                )
                .await?;
            if !recommended {
                tracing::info!(
                    assignment = %assignment_id,
                    failed = ?criteria.failed(),
                    "review does not recommend the item"
                );
            }

            let item = fetch_item(&tx, &completed.item_id).await?;
            let finalize = self.finalize_in(&tx, &caller.user_id, &item).await?;
            Ok(ReviewSubmission {
                assignment: completed,
                finalize,
            })
        }
        .await;
        Self::finish(tx, result).await
    }

    /// `InProgress → NeedsRevision`, sending the item straight back to its author.
    ///
    /// Returns the updated assignment; the item moves to `NeedsRevision`
    /// regardless of the other reviewers.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::PolicyViolation` for blank comments,
    /// `CoreError::Forbidden` unless the caller holds the assignment, and
    /// `CoreError::InvalidTransition` unless it is `InProgress`.
    pub async fn send_for_revision(
        &self,
        caller: &CallerIdentity,
        assignment_id: &str,
        revision_comments: &str,
        narrative: Option<ReviewNarrative>,
    ) -> Result<ReviewAssignment, DatabaseError> {
        let comments = revision_comments.trim();
        if comments.is_empty() {
            return Err(CoreError::PolicyViolation("revision comments are required".into()).into());
        }

        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<_, DatabaseError> = async {
            let (assignment, item) = load_for_reviewer(
                &tx,
                caller,
                assignment_id,
                AssignmentStatus::NeedsRevision,
                "send for revision",
            )
            .await?;

            let mut extra: Vec<(&'static str, libsql::Value)> = vec![
                ("revision_comments", comments.to_string().into()),
                ("sent_for_revision_at", Utc::now().to_rfc3339().into()),
            ];
            if let Some(narrative) = narrative {
                let merged = assignment.narrative.clone().merged(narrative);
                extra.push(("narrative", to_json(&merged)?.into()));
            }
            let updated = self
                .transition_assignment_in(
                    &tx,
                    &caller.user_id,
                    &assignment,
                    AssignmentStatus::NeedsRevision,
                    extra,
                )
                .await?;

            self.transition_item_in(
                &tx,
                &caller.user_id,
                &item,
                ItemStatus::NeedsRevision,
                vec![],
                Some(comments.to_string()),
            )
            .await?;
            tracing::info!(
                item = %item.id,
                assignment = %assignment_id,
                "item sent for revision by reviewer"
            );
            Ok(updated)
        }
        .await;
        Self::finish(tx, result).await
    }
}
