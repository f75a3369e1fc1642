//! Assignment selector: automatic and manual panel assignment, reviewer
//! replacement, and administrative removal.

use std::collections::BTreeSet;

use chrono::Utc;
use panel_core::audit_detail::{AssignedDetail, ReviewerReplacedDetail};
use panel_core::consensus::PANEL_SIZE;
use panel_core::entities::{ReviewAssignment, ReviewedItem, UserSummary};
use panel_core::enums::{AuditAction, Capability, EntityType, ItemStatus, SelectionPolicy, Slot};
use panel_core::errors::CoreError;
use panel_core::identity::{CallerIdentity, ensure_capability, has_capability};
use panel_core::responses::{AssignmentOutcome, PoolShortfall, ReplacementOutcome};
use panel_core::selection::{SelectionContext, select_panel};

use super::assignment::{
    AssignmentDraft, active_assignments, fetch_assignment, item_assignments, round_assignments,
};
use super::directory::{UserFilter, fetch_user, find_user, find_users_in};
use super::item::fetch_item;
use crate::error::DatabaseError;
use crate::helpers::to_detail;
use crate::service::PanelService;

fn require_submitted(item: &ReviewedItem) -> Result<(), CoreError> {
    if item.status == ItemStatus::Submitted {
        Ok(())
    } else {
        Err(CoreError::invalid_transition(
            EntityType::Item,
            &item.id,
            item.status,
            ItemStatus::InReview,
        ))
    }
}

/// The new reviewer must be an expert, not the author, and not already on the item.
fn check_replacement(
    item: &ReviewedItem,
    on_item: &[ReviewAssignment],
    new_reviewer: &UserSummary,
) -> Result<(), CoreError> {
    if !has_capability(new_reviewer, Capability::Expert) {
        return Err(CoreError::PolicyViolation(format!(
            "{} is not an expert",
            new_reviewer.id
        )));
    }
    if new_reviewer.id == item.author_id {
        return Err(CoreError::PolicyViolation(format!(
            "{} is the author of {}",
            new_reviewer.id, item.id
        )));
    }
    if on_item.iter().any(|a| a.reviewer_id == new_reviewer.id) {
        return Err(CoreError::PolicyViolation(format!(
            "{} already reviews {}",
            new_reviewer.id, item.id
        )));
    }
    Ok(())
}

impl PanelService {
    /// Select and assign a panel for a submitted item using `policy`.
    ///
    /// Allowed while the item is `Submitted` with no assignments in its
    /// current revision round. A full panel moves the item to `InReview`; a
    /// short pool is reported in `shortfall` and leaves it `Submitted`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Forbidden` for non-administrators,
    /// `CoreError::InvalidTransition` when the item is not `Submitted`, and
    /// `CoreError::PolicyViolation` when the round already has reviewers.
    pub async fn assign_reviewers(
        &self,
        caller: &CallerIdentity,
        item_id: &str,
        policy: SelectionPolicy,
    ) -> Result<AssignmentOutcome, DatabaseError> {
        ensure_capability(caller, Capability::Admin, "assign reviewers")?;
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<_, DatabaseError> = async {
            let item = fetch_item(&tx, item_id).await?;
            self.assign_reviewers_in(&tx, &caller.user_id, &item, policy).await
        }
        .await;
        Self::finish(tx, result).await
    }

    pub(crate) async fn assign_reviewers_in(
        &self,
        conn: &libsql::Connection,
        actor_id: &str,
        item: &ReviewedItem,
        policy: SelectionPolicy,
    ) -> Result<AssignmentOutcome, DatabaseError> {
        require_submitted(item)?;

        let existing = item_assignments(conn, &item.id).await?;
        if existing.iter().any(|a| a.revision_round == item.revision_round) {
            return Err(CoreError::PolicyViolation(format!(
                "{} already has reviewers in round {}",
                item.id, item.revision_round
            ))
            .into());
        }
        let exclude: BTreeSet<String> = existing.into_iter().map(|a| a.reviewer_id).collect();

        let author = find_user(conn, &item.author_id).await?;
        let pool = find_users_in(conn, Capability::Expert, &UserFilter::default()).await?;
        let ctx = SelectionContext {
            author_id: &item.author_id,
            author_workplace: author.as_ref().and_then(|a| a.workplace.as_deref()),
            author_department: author.as_ref().and_then(|a| a.department.as_deref()),
            subject: item.subject.as_deref(),
            pool: &pool,
            fallback_reviewer_id: self.selection().fallback_reviewer(),
            head_position_keyword: &self.selection().head_position_keyword,
        };
        let selection = {
            let mut rng = self.rng().await;
            select_panel(policy, &ctx, &exclude, &mut *rng)
        };

        let mut assignments = Vec::with_capacity(selection.picks.len());
        for pick in &selection.picks {
            let assignment = self
                .insert_assignment_in(
                    conn,
                    &AssignmentDraft {
                        item_id: &item.id,
                        reviewer_id: &pick.reviewer_id,
                        assigned_by: actor_id,
                        slot: pick.slot,
                        revision_round: item.revision_round,
                    },
                )
                .await?;
            let detail = AssignedDetail {
                reviewer_id: pick.reviewer_id.clone(),
                slot: pick.slot,
                revision_round: item.revision_round,
                reason: Some(pick.reason),
            };
            self.record_in(
                conn,
                actor_id,
                EntityType::Assignment,
                &assignment.id,
                AuditAction::Assigned,
                Some(to_detail(&detail)?),
            )
            .await?;
            assignments.push(assignment);
        }

        let mut item_status = item.status;
        if assignments.len() == PANEL_SIZE {
            item_status = self
                .transition_item_in(conn, actor_id, item, ItemStatus::InReview, vec![], None)
                .await?
                .status;
        }

        let shortfall = (!selection.missing.is_empty()).then(|| PoolShortfall {
            requested: PANEL_SIZE,
            assigned: assignments.len(),
            missing_slots: selection.missing.clone(),
        });
        if let Some(ref short) = shortfall {
            tracing::warn!(
                item = %item.id,
                %policy,
                assigned = short.assigned,
                missing = ?short.missing_slots,
                "reviewer pool too small for a full panel"
            );
        } else {
            tracing::info!(item = %item.id, %policy, round = item.revision_round, "panel assigned");
        }

        Ok(AssignmentOutcome {
            item_id: item.id.clone(),
            item_status,
            assignments,
            shortfall,
        })
    }

    /// Assign 1 to 3 named experts to a submitted item's free slots.
    ///
    /// Moves the item to `InReview`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::PolicyViolation` for duplicates, non-experts, the
    /// author, or a panel that would exceed three reviewers.
    pub async fn assign_manually(
        &self,
        caller: &CallerIdentity,
        item_id: &str,
        reviewer_ids: &[String],
    ) -> Result<AssignmentOutcome, DatabaseError> {
        ensure_capability(caller, Capability::Admin, "assign reviewers")?;
        if reviewer_ids.is_empty() || reviewer_ids.len() > PANEL_SIZE {
            return Err(CoreError::PolicyViolation(format!(
                "between 1 and {PANEL_SIZE} reviewers required, got {}",
                reviewer_ids.len()
            ))
            .into());
        }
        let unique: BTreeSet<&str> = reviewer_ids.iter().map(String::as_str).collect();
        if unique.len() != reviewer_ids.len() {
            return Err(CoreError::PolicyViolation("duplicate reviewer in request".into()).into());
        }

        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result = self.assign_manually_in(&tx, caller, item_id, reviewer_ids).await;
        Self::finish(tx, result).await
    }

    async fn assign_manually_in(
        &self,
        conn: &libsql::Connection,
        caller: &CallerIdentity,
        item_id: &str,
        reviewer_ids: &[String],
    ) -> Result<AssignmentOutcome, DatabaseError> {
        let item = fetch_item(conn, item_id).await?;
        require_submitted(&item)?;

        let existing = item_assignments(conn, item_id).await?;
        let current = round_assignments(conn, item_id, item.revision_round).await?;
        if current.len() + reviewer_ids.len() > PANEL_SIZE {
            return Err(CoreError::PolicyViolation(format!(
                "{item_id} has {} reviewers; adding {} exceeds {PANEL_SIZE}",
                current.len(),
                reviewer_ids.len()
            ))
            .into());
        }

        let used: BTreeSet<Slot> = current.iter().map(|a| a.slot).collect();
        let free = Slot::ALL.into_iter().filter(|s| !used.contains(s));

        let mut assignments = Vec::with_capacity(reviewer_ids.len());
        for (reviewer_id, slot) in reviewer_ids.iter().zip(free) {
            let reviewer = fetch_user(conn, reviewer_id).await?;
            check_replacement(&item, &existing, &reviewer)?;

            let assignment = self
                .insert_assignment_in(
                    conn,
                    &AssignmentDraft {
                        item_id,
                        reviewer_id,
                        assigned_by: &caller.user_id,
                        slot,
                        revision_round: item.revision_round,
                    },
                )
                .await?;
            let detail = AssignedDetail {
                reviewer_id: reviewer_id.clone(),
                slot,
                revision_round: item.revision_round,
                reason: None,
            };
            self.record_in(
                conn,
                &caller.user_id,
                EntityType::Assignment,
                &assignment.id,
                AuditAction::Assigned,
                Some(to_detail(&detail)?),
            )
            .await?;
            assignments.push(assignment);
        }

        let updated = self
            .transition_item_in(conn, &caller.user_id, &item, ItemStatus::InReview, vec![], None)
            .await?;
        tracing::info!(item = %item_id, count = assignments.len(), "reviewers assigned manually");

        Ok(AssignmentOutcome {
            item_id: item_id.to_string(),
            item_status: updated.status,
            assignments,
            shortfall: None,
        })
    }

    /// Hand one reviewer's unfinished slot on an item to another expert.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if `old_reviewer_id` has no slot on the
    /// item, `CoreError::InvalidTransition` if that slot is finished or its
    /// round is closed, and
    /// `CoreError::PolicyViolation` if the new reviewer is not eligible.
    pub async fn replace_reviewer(
        &self,
        caller: &CallerIdentity,
        item_id: &str,
        old_reviewer_id: &str,
        new_reviewer_id: &str,
    ) -> Result<ReviewAssignment, DatabaseError> {
        ensure_capability(caller, Capability::Admin, "replace reviewer")?;
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<_, DatabaseError> = async {
            let item = fetch_item(&tx, item_id).await?;
            let on_item = item_assignments(&tx, item_id).await?;
            let assignment = on_item
                .iter()
                .filter(|a| a.reviewer_id == old_reviewer_id)
                .max_by_key(|a| a.revision_round)
                .cloned()
                .ok_or_else(|| {
                    CoreError::not_found(
                        EntityType::Assignment,
                        format!("{item_id}/{old_reviewer_id}"),
                    )
                })?;
            let new_reviewer = fetch_user(&tx, new_reviewer_id).await?;
            self.replace_one_in(&tx, &caller.user_id, &item, &on_item, &assignment, &new_reviewer)
                .await
        }
        .await;
        Self::finish(tx, result).await
    }

    /// Replace a reviewer on every pending or in-progress assignment they hold.
    ///
    /// All-or-nothing: any ineligible item aborts the whole replacement.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::PolicyViolation` if the new reviewer is ineligible
    /// on any affected item.
    pub async fn replace_reviewer_everywhere(
        &self,
        caller: &CallerIdentity,
        old_reviewer_id: &str,
        new_reviewer_id: &str,
    ) -> Result<ReplacementOutcome, DatabaseError> {
        ensure_capability(caller, Capability::Admin, "replace reviewer")?;
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<_, DatabaseError> = async {
            let new_reviewer = fetch_user(&tx, new_reviewer_id).await?;
            let active = active_assignments(&tx, Some(old_reviewer_id)).await?;
            let mut replaced = Vec::with_capacity(active.len());
            for assignment in &active {
                let item = fetch_item(&tx, &assignment.item_id).await?;
                let on_item = item_assignments(&tx, &item.id).await?;
                let updated = self
                    .replace_one_in(&tx, &caller.user_id, &item, &on_item, assignment, &new_reviewer)
                    .await?;
                replaced.push(updated);
            }
            tracing::info!(
                old = %old_reviewer_id,
                new = %new_reviewer_id,
                count = replaced.len(),
                "reviewer replaced everywhere"
            );
            Ok(ReplacementOutcome {
                old_reviewer_id: old_reviewer_id.to_string(),
                new_reviewer_id: new_reviewer_id.to_string(),
                replaced,
            })
        }
        .await;
        Self::finish(tx, result).await
    }

    async fn replace_one_in(
        &self,
        conn: &libsql::Connection,
        actor_id: &str,
        item: &ReviewedItem,
        on_item: &[ReviewAssignment],
        assignment: &ReviewAssignment,
        new_reviewer: &UserSummary,
    ) -> Result<ReviewAssignment, DatabaseError> {
        let live = item.status.is_under_review() && assignment.revision_round == item.revision_round;
        if !assignment.status.is_active() || !live {
            return Err(CoreError::invalid_transition(
                EntityType::Assignment,
                &assignment.id,
                assignment.status,
                "replaced",
            )
            .into());
        }
        check_replacement(item, on_item, new_reviewer)?;

        let now = Utc::now().to_rfc3339();
        let changed = conn
            .execute(
                "UPDATE review_assignments
                 SET reviewer_id = ?1, status = 'pending', assigned_by = ?2, assigned_at = ?3, updated_at = ?3
                 WHERE id = ?4 AND status = ?5",
                libsql::params![
                    new_reviewer.id.as_str(),
                    actor_id,
                    now,
                    assignment.id.as_str(),
                    assignment.status.as_str()
                ],
            )
            .await?;
        if changed != 1 {
            return Err(CoreError::invalid_transition(
                EntityType::Assignment,
                &assignment.id,
                assignment.status,
                "replaced",
            )
            .into());
        }

        let detail = ReviewerReplacedDetail {
            old_reviewer_id: assignment.reviewer_id.clone(),
            new_reviewer_id: new_reviewer.id.clone(),
            slot: assignment.slot,
            previous_status: assignment.status.as_str().to_string(),
        };
        self.record_in(
            conn,
            actor_id,
            EntityType::Assignment,
            &assignment.id,
            AuditAction::Replaced,
            Some(to_detail(&detail)?),
        )
        .await?;
        tracing::info!(
            assignment = %assignment.id,
            item = %item.id,
            old = %assignment.reviewer_id,
            new = %new_reviewer.id,
            "reviewer replaced"
        );

        fetch_assignment(conn, &assignment.id).await
    }

    /// Delete an assignment outright. Administrators only.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the assignment does not exist.
    pub async fn remove_assignment(
        &self,
        caller: &CallerIdentity,
        assignment_id: &str,
    ) -> Result<ReviewAssignment, DatabaseError> {
        ensure_capability(caller, Capability::Admin, "remove assignment")?;
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<_, DatabaseError> = async {
            let assignment = fetch_assignment(&tx, assignment_id).await?;
            tx.execute("DELETE FROM review_assignments WHERE id = ?1", [assignment_id])
                .await?;
            self.record_in(
                &tx,
                &caller.user_id,
                EntityType::Assignment,
                assignment_id,
                AuditAction::Removed,
                Some(to_detail(&assignment)?),
            )
            .await?;
            tracing::info!(assignment = %assignment_id, item = %assignment.item_id, "assignment removed");
            Ok(assignment)
        }
        .await;
        Self::finish(tx, result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel_core::criteria::CriteriaSheet;
    use panel_core::entities::ReviewNarrative;
    use panel_core::enums::AssignmentStatus;
    use crate::test_support::helpers::{
        admin, author, bare_service, expert, holder, register, seeded_service, submitted,
    };
    use pretty_assertions::assert_eq;

    async fn register_expert(svc: &PanelService, id: &str) {
        register(svc, id, &[Capability::Expert], "college", "math", "lecturer").await;
    }

    #[tokio::test]
    async fn submission_assigns_full_institution_panel() {
        let svc = seeded_service().await;
        let outcome = submitted(&svc).await;
        let panel = &outcome.assignment;

        assert_eq!(outcome.item.status, ItemStatus::InReview);
        assert_eq!(panel.item_status, ItemStatus::InReview);
        assert_eq!(panel.shortfall, None);
        assert_eq!(panel.assignments.len(), 3);

        let slots: Vec<Slot> = panel.assignments.iter().map(|a| a.slot).collect();
        assert_eq!(slots, Slot::ALL.to_vec());
        let reviewers: BTreeSet<&str> =
            panel.assignments.iter().map(|a| a.reviewer_id.as_str()).collect();
        assert_eq!(reviewers.len(), 3);
        assert!(!reviewers.contains("u-author"));
        assert!(reviewers.contains("u-head"));
        assert_eq!(panel.assignments[2].reviewer_id, "u-fallback");
        assert!(panel.assignments.iter().all(|a| a.status == AssignmentStatus::Pending));
        assert!(panel.assignments.iter().all(|a| a.assigned_by == "u-author"));
    }

    #[tokio::test]
    async fn empty_pool_reports_shortfall_and_stays_submitted() {
        let svc = bare_service().await;
        let outcome = submitted(&svc).await;

        assert_eq!(outcome.item.status, ItemStatus::Submitted);
        assert!(outcome.assignment.assignments.is_empty());
        assert_eq!(
            outcome.assignment.shortfall,
            Some(PoolShortfall {
                requested: 3,
                assigned: 0,
                missing_slots: Slot::ALL.to_vec(),
            })
        );
    }

    #[tokio::test]
    async fn subject_policy_fills_panel_once_pool_exists() {
        let svc = bare_service().await;
        let item = submitted(&svc).await.item;
        for id in ["u-e1", "u-e2", "u-e3", "u-fallback"] {
            register_expert(&svc, id).await;
        }

        let outcome = svc
            .assign_reviewers(&admin(), &item.id, SelectionPolicy::PoolB)
            .await
            .unwrap();
        assert_eq!(outcome.item_status, ItemStatus::InReview);
        assert_eq!(outcome.assignments.len(), 3);
        let reviewers: BTreeSet<&str> =
            outcome.assignments.iter().map(|a| a.reviewer_id.as_str()).collect();
        assert_eq!(reviewers.len(), 3);
        assert!(reviewers.contains("u-fallback"));

        let audit = svc
            .query_audit(&crate::repos::audit::AuditFilter {
                action: Some(AuditAction::Assigned),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(audit.len(), 3);
        for entry in &audit {
            let detail: AssignedDetail =
                serde_json::from_value(entry.detail.clone().unwrap()).unwrap();
            assert_eq!(detail.revision_round, 1);
            assert!(detail.reason.is_some());
        }
    }

    #[tokio::test]
    async fn second_automatic_assignment_in_a_round_is_refused() {
        let svc = bare_service().await;
        let item = submitted(&svc).await.item;
        register_expert(&svc, "u-e1").await;

        let first = svc
            .assign_reviewers(&admin(), &item.id, SelectionPolicy::PoolA)
            .await
            .unwrap();
        assert_eq!(first.assignments.len(), 1);
        assert_eq!(first.item_status, ItemStatus::Submitted);

        let err = svc
            .assign_reviewers(&admin(), &item.id, SelectionPolicy::PoolA)
            .await
            .unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::PolicyViolation(_))));
    }

    #[tokio::test]
    async fn only_admins_assign() {
        let svc = bare_service().await;
        let item = submitted(&svc).await.item;
        let err = svc
            .assign_reviewers(&author(), &item.id, SelectionPolicy::PoolA)
            .await
            .unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn manual_assignment_moves_item_to_review() {
        let svc = bare_service().await;
        let item = submitted(&svc).await.item;
        register_expert(&svc, "u-e1").await;
        register_expert(&svc, "u-e2").await;

        let outcome = svc
            .assign_manually(&admin(), &item.id, &["u-e2".into(), "u-e1".into()])
            .await
            .unwrap();
        assert_eq!(outcome.item_status, ItemStatus::InReview);
        assert_eq!(outcome.shortfall, None);
        let placed: Vec<(&str, Slot)> = outcome
            .assignments
            .iter()
            .map(|a| (a.reviewer_id.as_str(), a.slot))
            .collect();
        assert_eq!(placed, vec![("u-e2", Slot::First), ("u-e1", Slot::Second)]);
    }

    #[tokio::test]
    async fn manual_assignment_rejects_bad_panels() {
        let svc = bare_service().await;
        let item = submitted(&svc).await.item;
        register_expert(&svc, "u-e1").await;

        for ids in [
            vec![],
            vec!["u-e1".to_string(), "u-e1".to_string()],
            vec!["u-author".to_string()],
            vec!["u-admin".to_string()],
            vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()],
        ] {
            let err = svc.assign_manually(&admin(), &item.id, &ids).await.unwrap_err();
            assert!(
                matches!(err.as_core(), Some(CoreError::PolicyViolation(_))),
                "{ids:?}: {err}"
            );
        }
        let err = svc
            .assign_manually(&admin(), &item.id, &["u-ghost".into()])
            .await
            .unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::NotFound { .. })));

        assert!(svc.assignments_for_item(&item.id).await.unwrap().is_empty());
        assert_eq!(svc.get_item(&item.id).await.unwrap().status, ItemStatus::Submitted);
    }

    #[tokio::test]
    async fn replace_resets_in_progress_to_pending_and_keeps_slot() {
        let svc = seeded_service().await;
        let outcome = submitted(&svc).await;
        register_expert(&svc, "u-e3").await;
        let target = outcome.assignment.assignments[0].clone();
        svc.start_review(&holder(&target), &target.id).await.unwrap();

        let replaced = svc
            .replace_reviewer(&admin(), &outcome.item.id, &target.reviewer_id, "u-e3")
            .await
            .unwrap();
        assert_eq!(replaced.id, target.id);
        assert_eq!(replaced.reviewer_id, "u-e3");
        assert_eq!(replaced.slot, target.slot);
        assert_eq!(replaced.status, AssignmentStatus::Pending);
        assert_eq!(replaced.assigned_by, "u-admin");
    }

    #[tokio::test]
    async fn replace_on_completed_review_is_invalid() {
        let svc = seeded_service().await;
        let outcome = submitted(&svc).await;
        register_expert(&svc, "u-e3").await;
        let target = outcome.assignment.assignments[1].clone();
        svc.submit_review(
            &holder(&target),
            &target.id,
            &CriteriaSheet::uniform(true),
            ReviewNarrative::default(),
        )
        .await
        .unwrap();

        let err = svc
            .replace_reviewer(&admin(), &outcome.item.id, &target.reviewer_id, "u-e3")
            .await
            .unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn replacement_must_be_an_eligible_newcomer() {
        let svc = seeded_service().await;
        let outcome = submitted(&svc).await;
        let panel = &outcome.assignment.assignments;
        let old = panel[0].reviewer_id.clone();

        for new in [panel[1].reviewer_id.as_str(), "u-author", "u-admin"] {
            let err = svc
                .replace_reviewer(&admin(), &outcome.item.id, &old, new)
                .await
                .unwrap_err();
            assert!(matches!(err.as_core(), Some(CoreError::PolicyViolation(_))), "{new}");
        }

        let err = svc
            .replace_reviewer(&admin(), &outcome.item.id, "u-nobody", "u-e3")
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_core(),
            Some(CoreError::NotFound { entity_type: EntityType::Assignment, .. })
        ));
    }

    #[tokio::test]
    async fn replace_everywhere_skips_finished_work() {
        let svc = bare_service().await;
        let mut items = Vec::new();
        for _ in 0..3 {
            items.push(submitted(&svc).await.item);
        }
        for id in ["u-e1", "u-e2", "u-e9"] {
            register_expert(&svc, id).await;
        }
        for item in &items {
            svc.assign_manually(&admin(), &item.id, &["u-e1".into()])
                .await
                .unwrap();
        }
        let done = svc.assignments_for_item(&items[0].id).await.unwrap().remove(0);
        svc.submit_review(
            &expert("u-e1"),
            &done.id,
            &CriteriaSheet::uniform(true),
            ReviewNarrative::default(),
        )
        .await
        .unwrap();

        let outcome = svc
            .replace_reviewer_everywhere(&admin(), "u-e1", "u-e9")
            .await
            .unwrap();
        assert_eq!(outcome.replaced.len(), 2);
        assert!(outcome.replaced.iter().all(|a| a.reviewer_id == "u-e9"));
        assert_eq!(svc.get_assignment(&done.id).await.unwrap().reviewer_id, "u-e1");
    }

    #[tokio::test]
    async fn replace_everywhere_is_all_or_nothing() {
        let svc = bare_service().await;
        let a = submitted(&svc).await.item;
        let b = submitted(&svc).await.item;
        for id in ["u-e1", "u-e2"] {
            register_expert(&svc, id).await;
        }
        svc.assign_manually(&admin(), &a.id, &["u-e1".into()]).await.unwrap();
        svc.assign_manually(&admin(), &b.id, &["u-e1".into(), "u-e2".into()])
            .await
            .unwrap();

        let err = svc
            .replace_reviewer_everywhere(&admin(), "u-e1", "u-e2")
            .await
            .unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::PolicyViolation(_))));
        let untouched = svc.assignments_for_item(&a.id).await.unwrap();
        assert_eq!(untouched[0].reviewer_id, "u-e1");
    }

    #[tokio::test]
    async fn closed_round_slots_are_not_replaceable() {
        let svc = seeded_service().await;
        let outcome = submitted(&svc).await;
        let item_id = outcome.item.id.clone();
        let panel = outcome.assignment.assignments;
        svc.start_review(&holder(&panel[0]), &panel[0].id).await.unwrap();
        svc.send_for_revision(&holder(&panel[0]), &panel[0].id, "Rework outcomes", None)
            .await
            .unwrap();
        svc.resubmit_after_revision(&author(), &item_id, "Outcomes rewritten", None)
            .await
            .unwrap();
        register_expert(&svc, "u-e9").await;

        let stale = &panel[1];
        let everywhere = svc
            .replace_reviewer_everywhere(&admin(), &stale.reviewer_id, "u-e9")
            .await
            .unwrap();
        assert!(everywhere.replaced.is_empty());
        assert!(svc.assignments_for_replacement().await.unwrap().is_empty());
        assert!(svc
            .my_assignments(&stale.reviewer_id, Some(AssignmentStatus::Pending))
            .await
            .unwrap()
            .is_empty());

        let err = svc
            .replace_reviewer(&admin(), &item_id, &stale.reviewer_id, "u-e9")
            .await
            .unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::InvalidTransition { .. })));
        assert_eq!(svc.get_assignment(&stale.id).await.unwrap().reviewer_id, stale.reviewer_id);

        let rearmed = svc
            .assign_reviewers(&admin(), &item_id, SelectionPolicy::PoolA)
            .await
            .unwrap();
        let fresh = rearmed
            .assignments
            .iter()
            .find(|a| a.reviewer_id == "u-e9")
            .expect("u-e9 is free for the new round");
        assert_eq!(fresh.revision_round, 2);
        let started = svc.start_review(&expert("u-e9"), &fresh.id).await.unwrap();
        assert_eq!(started.status, AssignmentStatus::InProgress);
    }

    #[tokio::test]
    async fn admin_approval_closes_unfinished_slots() {
        let svc = seeded_service().await;
        let outcome = submitted(&svc).await;
        let done = &outcome.assignment.assignments[0];
        svc.submit_review(
            &holder(done),
            &done.id,
            &CriteriaSheet::uniform(true),
            ReviewNarrative::default(),
        )
        .await
        .unwrap();
        assert_eq!(svc.assignments_for_replacement().await.unwrap().len(), 2);

        svc.approve(&admin(), &outcome.item.id).await.unwrap();
        assert!(svc.assignments_for_replacement().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_assignment_deletes_and_audits() {
        let svc = seeded_service().await;
        let outcome = submitted(&svc).await;
        let target = &outcome.assignment.assignments[0];

        let err = svc.remove_assignment(&author(), &target.id).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::Forbidden { .. })));

        let removed = svc.remove_assignment(&admin(), &target.id).await.unwrap();
        assert_eq!(removed.id, target.id);
        let err = svc.get_assignment(&target.id).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::NotFound { .. })));
        assert_eq!(svc.assignments_for_item(&outcome.item.id).await.unwrap().len(), 2);
    }
}
