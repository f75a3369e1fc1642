//! Item lifecycle controller: submission, administrative decisions,
//! archive, and the two revision paths (resubmission and new versions).

use chrono::Utc;
use panel_core::audit_detail::VersionCreatedDetail;
use panel_core::entities::{ReviewedItem, RevisionNote};
use panel_core::enums::{AuditAction, Capability, EntityType, ItemStatus};
use panel_core::errors::CoreError;
use panel_core::identity::{CallerIdentity, ensure_capability, ensure_owner, ensure_owner_or_admin};
use panel_core::ids::PREFIX_ITEM;
use panel_core::responses::SubmitOutcome;

use super::assignment::round_assignments;
use super::item::fetch_item;
use crate::error::DatabaseError;
use crate::generate_id;
use crate::helpers::{to_detail, to_json};
use crate::service::PanelService;

fn require_under_review(item: &ReviewedItem, to: ItemStatus) -> Result<(), CoreError> {
    if item.status.is_under_review() {
        Ok(())
    } else {
        Err(CoreError::invalid_transition(EntityType::Item, &item.id, item.status, to))
    }
}

impl PanelService {
    /// Submit a draft and assign a panel with the configured default policy.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Forbidden` unless the caller is the author or an
    /// administrator, `CoreError::InvalidTransition` unless the item is `Draft`.
    pub async fn submit(
        &self,
        caller: &CallerIdentity,
        item_id: &str,
    ) -> Result<SubmitOutcome, DatabaseError> {
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result = self.submit_in(&tx, caller, item_id).await;
        Self::finish(tx, result).await
    }

    async fn submit_in(
        &self,
        conn: &libsql::Connection,
        caller: &CallerIdentity,
        item_id: &str,
    ) -> Result<SubmitOutcome, DatabaseError> {
        let item = fetch_item(conn, item_id).await?;
        ensure_owner_or_admin(caller, &item.author_id, "submit item")?;
        if item.status != ItemStatus::Draft {
            return Err(CoreError::invalid_transition(
                EntityType::Item,
                item_id,
                item.status,
                ItemStatus::Submitted,
            )
            .into());
        }

        let submitted = self
            .transition_item_in(
                conn,
                &caller.user_id,
                &item,
                ItemStatus::Submitted,
                vec![("submitted_at", Utc::now().to_rfc3339().into())],
                None,
            )
            .await?;
        let assignment = self
            .assign_reviewers_in(
                conn,
                &caller.user_id,
                &submitted,
                self.selection().default_policy,
            )
            .await?;

        Ok(SubmitOutcome {
            item: fetch_item(conn, item_id).await?,
            assignment,
        })
    }

    /// Approve an item under review. Administrators only.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::PolicyViolation` when no review of the current
    /// round is completed.
    pub async fn approve(
        &self,
        caller: &CallerIdentity,
        item_id: &str,
    ) -> Result<ReviewedItem, DatabaseError> {
        ensure_capability(caller, Capability::Admin, "approve item")?;
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<_, DatabaseError> = async {
            let item = fetch_item(&tx, item_id).await?;
            require_under_review(&item, ItemStatus::Approved)?;

            let round = round_assignments(&tx, item_id, item.revision_round).await?;
            if !round.iter().any(|a| a.is_completed()) {
                return Err(CoreError::PolicyViolation(format!(
                    "{item_id} has no completed reviews"
                ))
                .into());
            }

            let now = Utc::now().to_rfc3339();
            self.transition_item_in(
                &tx,
                &caller.user_id,
                &item,
                ItemStatus::Approved,
                vec![
                    ("approved_at", now.into()),
                    ("approved_by", caller.user_id.clone().into()),
                ],
                Some("approved by administrator".into()),
            )
            .await
        }
        .await;
        Self::finish(tx, result).await
    }

    /// Reject an item under review with a mandatory reason. Administrators only.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::PolicyViolation` for a blank reason.
    pub async fn reject(
        &self,
        caller: &CallerIdentity,
        item_id: &str,
        reason: &str,
    ) -> Result<ReviewedItem, DatabaseError> {
        ensure_capability(caller, Capability::Admin, "reject item")?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CoreError::PolicyViolation("rejection reason is required".into()).into());
        }

        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<_, DatabaseError> = async {
            let item = fetch_item(&tx, item_id).await?;
            require_under_review(&item, ItemStatus::Rejected)?;
            self.transition_item_in(
                &tx,
                &caller.user_id,
                &item,
                ItemStatus::Rejected,
                vec![("rejection_reason", reason.to_string().into())],
                Some(reason.to_string()),
            )
            .await
        }
        .await;
        Self::finish(tx, result).await
    }

    /// Archive an item in any non-archived status. Assignments are untouched.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTransition` if the item is already archived.
    pub async fn archive(
        &self,
        caller: &CallerIdentity,
        item_id: &str,
    ) -> Result<ReviewedItem, DatabaseError> {
        ensure_capability(caller, Capability::Admin, "archive item")?;
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<_, DatabaseError> = async {
            let item = fetch_item(&tx, item_id).await?;
            self.transition_item_in(
                &tx,
                &caller.user_id,
                &item,
                ItemStatus::Archived,
                vec![
                    ("status_before_archive", item.status.as_str().into()),
                    ("archived_at", Utc::now().to_rfc3339().into()),
                ],
                None,
            )
            .await
        }
        .await;
        Self::finish(tx, result).await
    }

    /// Restore an archived item to the status it had before archiving.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTransition` unless the item is archived and
    /// `DatabaseError::InvalidState` if the previous status was not recorded.
    pub async fn unarchive(
        &self,
        caller: &CallerIdentity,
        item_id: &str,
    ) -> Result<ReviewedItem, DatabaseError> {
        ensure_capability(caller, Capability::Admin, "unarchive item")?;
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<_, DatabaseError> = async {
            let item = fetch_item(&tx, item_id).await?;
            if item.status != ItemStatus::Archived {
                return Err(CoreError::invalid_transition(
                    EntityType::Item,
                    item_id,
                    item.status,
                    "unarchived",
                )
                .into());
            }
            let previous = item.status_before_archive.ok_or_else(|| {
                DatabaseError::InvalidState(format!("{item_id} has no status to restore"))
            })?;
            self.transition_item_in(
                &tx,
                &caller.user_id,
                &item,
                previous,
                vec![
                    ("status_before_archive", libsql::Value::Null),
                    ("archived_at", libsql::Value::Null),
                ],
                None,
            )
            .await
        }
        .await;
        Self::finish(tx, result).await
    }

    /// Start the next version of a rejected item as a new `Draft` row.
    ///
    /// The rejected row is left as is. Only one successor per version.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Forbidden` for anyone but the author,
    /// `CoreError::InvalidTransition` unless the item is `Rejected`, and
    /// `CoreError::PolicyViolation` if a next version already exists.
    pub async fn create_new_version(
        &self,
        caller: &CallerIdentity,
        item_id: &str,
    ) -> Result<ReviewedItem, DatabaseError> {
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result = self.create_new_version_in(&tx, caller, item_id).await;
        Self::finish(tx, result).await
    }

    async fn create_new_version_in(
        &self,
        conn: &libsql::Connection,
        caller: &CallerIdentity,
        item_id: &str,
    ) -> Result<ReviewedItem, DatabaseError> {
        let item = fetch_item(conn, item_id).await?;
        ensure_owner(caller, &item.author_id, "create new version")?;
        if item.status != ItemStatus::Rejected {
            return Err(CoreError::invalid_transition(
                EntityType::Item,
                item_id,
                item.status,
                "new version",
            )
            .into());
        }

        let mut rows = conn
            .query("SELECT COUNT(*) FROM reviewed_items WHERE parent_id = ?1", [item_id])
            .await?;
        let children: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        if children > 0 {
            return Err(CoreError::PolicyViolation(format!(
                "{item_id} already has a newer version"
            ))
            .into());
        }

        let id = generate_id(conn, PREFIX_ITEM).await?;
        let version = item.version + 1;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO reviewed_items (id, root_id, parent_id, version, title, subject, content, status,
                author_id, revision_round, revision_history, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, '[]', ?10, ?10)",
            libsql::params![
                id.as_str(),
                item.root_id.as_str(),
                item.id.as_str(),
                i64::from(version),
                item.title.as_str(),
                item.subject.as_deref(),
                to_json(&item.content)?,
                ItemStatus::Draft.as_str(),
                item.author_id.as_str(),
                now
            ],
        )
        .await?;

        let detail = VersionCreatedDetail {
            parent_id: item.id.clone(),
            root_id: item.root_id.clone(),
            version,
        };
        self.record_in(
            conn,
            &caller.user_id,
            EntityType::Item,
            &id,
            AuditAction::VersionCreated,
            Some(to_detail(&detail)?),
        )
        .await?;
        tracing::info!(item = %id, parent = %item.id, version, "new version created");

        fetch_item(conn, &id).await
    }

    /// Send a revised item back for review: `NeedsRevision → Submitted` on the
    /// same row, starting the next revision round.
    ///
    /// Reviewers are not reassigned here; an administrator runs
    /// `assign_reviewers` for the new round.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Forbidden` for anyone but the author and
    /// `CoreError::InvalidTransition` unless the item is `NeedsRevision`.
    pub async fn resubmit_after_revision(
        &self,
        caller: &CallerIdentity,
        item_id: &str,
        notes: &str,
        changes_summary: Option<&str>,
    ) -> Result<ReviewedItem, DatabaseError> {
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<_, DatabaseError> = async {
            let item = fetch_item(&tx, item_id).await?;
            ensure_owner(caller, &item.author_id, "resubmit item")?;
            if item.status != ItemStatus::NeedsRevision {
                return Err(CoreError::invalid_transition(
                    EntityType::Item,
                    item_id,
                    item.status,
                    ItemStatus::Submitted,
                )
                .into());
            }

            let round = item.revision_round + 1;
            let now = Utc::now();
            let note = RevisionNote {
                round,
                notes: notes.trim().to_string(),
                changes_summary: changes_summary.map(str::to_string),
                at: now,
            };
            let mut history = item.revision_history.clone();
            history.push(note.clone());

            let updated = self
                .transition_item_in(
                    &tx,
                    &caller.user_id,
                    &item,
                    ItemStatus::Submitted,
                    vec![
                        ("revision_round", i64::from(round).into()),
                        ("revision_history", to_json(&history)?.into()),
                        ("submitted_at", now.to_rfc3339().into()),
                    ],
                    None,
                )
                .await?;
            self.record_in(
                &tx,
                &caller.user_id,
                EntityType::Item,
                item_id,
                AuditAction::Resubmitted,
                Some(to_detail(&note)?),
            )
            .await?;
            tracing::info!(item = %item_id, round, "item resubmitted after revision");
            Ok(updated)
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
    use panel_core::enums::{SelectionPolicy, Slot};
    use crate::test_support::helpers::{
        admin, author, draft, expert, holder, seeded_service, submitted,
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    async fn rejected(svc: &PanelService) -> ReviewedItem {
        let item = submitted(svc).await.item;
        svc.reject(&admin(), &item.id, "Duplicates an existing program")
            .await
            .unwrap()
    }

    async fn sent_back(svc: &PanelService) -> ReviewedItem {
        let outcome = submitted(svc).await;
        let target = &outcome.assignment.assignments[0];
        svc.start_review(&holder(target), &target.id).await.unwrap();
        svc.send_for_revision(&holder(target), &target.id, "Tighten outcomes", None)
            .await
            .unwrap();
        svc.get_item(&outcome.item.id).await.unwrap()
    }

    #[tokio::test]
    async fn submit_only_from_draft_by_author() {
        let svc = seeded_service().await;
        let item = draft(&svc, "Geometry").await;

        let err = svc.submit(&expert("u-e1"), &item.id).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::Forbidden { .. })));

        let outcome = svc.submit(&author(), &item.id).await.unwrap();
        assert!(outcome.item.submitted_at.is_some());

        let err = svc.submit(&author(), &item.id).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn approve_needs_a_completed_review() {
        let svc = seeded_service().await;
        let outcome = submitted(&svc).await;

        let err = svc.approve(&admin(), &outcome.item.id).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::PolicyViolation(_))));

        let first = &outcome.assignment.assignments[0];
        svc.submit_review(
            &holder(first),
            &first.id,
            &CriteriaSheet::uniform(true),
            ReviewNarrative::default(),
        )
        .await
        .unwrap();
        let approved = svc.approve(&admin(), &outcome.item.id).await.unwrap();
        assert_eq!(approved.status, ItemStatus::Approved);
        assert_eq!(approved.approved_by.as_deref(), Some("u-admin"));
        assert!(approved.approved_at.is_some());
    }

    #[tokio::test]
    async fn reject_requires_reason_and_admin() {
        let svc = seeded_service().await;
        let item = submitted(&svc).await.item;

        let err = svc.reject(&admin(), &item.id, " ").await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::PolicyViolation(_))));
        let err = svc.reject(&author(), &item.id, "no").await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::Forbidden { .. })));

        let rejected = svc.reject(&admin(), &item.id, "Out of scope").await.unwrap();
        assert_eq!(rejected.status, ItemStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Out of scope"));
    }

    #[tokio::test]
    async fn drafts_cannot_be_decided() {
        let svc = seeded_service().await;
        let item = draft(&svc, "Geometry").await;
        let err = svc.reject(&admin(), &item.id, "early").await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::InvalidTransition { .. })));
        let err = svc.approve(&admin(), &item.id).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::InvalidTransition { .. })));
    }

    #[rstest]
    #[case::draft(false)]
    #[case::in_review(true)]
    #[tokio::test]
    async fn archive_round_trips_status(#[case] submit: bool) {
        let svc = seeded_service().await;
        let item = if submit {
            submitted(&svc).await.item
        } else {
            draft(&svc, "Geometry").await
        };
        let assignments = svc.assignments_for_item(&item.id).await.unwrap();

        let archived = svc.archive(&admin(), &item.id).await.unwrap();
        assert_eq!(archived.status, ItemStatus::Archived);
        assert_eq!(archived.status_before_archive, Some(item.status));
        assert!(archived.archived_at.is_some());

        let err = svc.archive(&admin(), &item.id).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::InvalidTransition { .. })));

        let restored = svc.unarchive(&admin(), &item.id).await.unwrap();
        assert_eq!(restored.status, item.status);
        assert_eq!(restored.status_before_archive, None);
        assert_eq!(restored.archived_at, None);
        assert_eq!(restored.version, item.version);
        assert_eq!(svc.assignments_for_item(&item.id).await.unwrap(), assignments);

        let err = svc.unarchive(&admin(), &item.id).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn new_version_extends_the_chain_once() {
        let svc = seeded_service().await;
        let old = rejected(&svc).await;

        let next = svc.create_new_version(&author(), &old.id).await.unwrap();
        assert_eq!(next.status, ItemStatus::Draft);
        assert_eq!(next.version, 2);
        assert_eq!(next.parent_id.as_deref(), Some(old.id.as_str()));
        assert_eq!(next.root_id, old.root_id);
        assert_eq!(next.title, old.title);
        assert_eq!(next.content, old.content);
        assert_eq!(next.revision_round, 1);
        assert_eq!(svc.get_item(&old.id).await.unwrap(), old);

        let err = svc.create_new_version(&author(), &old.id).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::PolicyViolation(_))));

        let chain = svc.get_versions(&next.id).await.unwrap();
        let versions: Vec<u32> = chain.iter().map(|i| i.version).collect();
        assert_eq!(versions, vec![1, 2]);
    }

    #[tokio::test]
    async fn new_version_only_from_rejected_by_author() {
        let svc = seeded_service().await;
        let item = draft(&svc, "Geometry").await;
        let err = svc.create_new_version(&author(), &item.id).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::InvalidTransition { .. })));

        let old = rejected(&svc).await;
        let err = svc.create_new_version(&admin(), &old.id).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn resubmission_starts_next_round_without_reviewers() {
        let svc = seeded_service().await;
        let item = sent_back(&svc).await;
        assert_eq!(item.status, ItemStatus::NeedsRevision);

        let resubmitted = svc
            .resubmit_after_revision(&author(), &item.id, "Rewrote outcomes", Some("Section 3"))
            .await
            .unwrap();
        assert_eq!(resubmitted.id, item.id);
        assert_eq!(resubmitted.status, ItemStatus::Submitted);
        assert_eq!(resubmitted.revision_round, 2);
        assert_eq!(resubmitted.revision_history.len(), 1);
        assert_eq!(resubmitted.revision_history[0].round, 2);
        assert_eq!(resubmitted.revision_history[0].notes, "Rewrote outcomes");
        assert_eq!(
            resubmitted.revision_history[0].changes_summary.as_deref(),
            Some("Section 3")
        );

        let rearmed = svc
            .assign_reviewers(&admin(), &item.id, SelectionPolicy::PoolA)
            .await
            .unwrap();
        assert_eq!(rearmed.assignments.len(), 1);
        assert_eq!(rearmed.assignments[0].revision_round, 2);
        assert_eq!(rearmed.assignments[0].slot, Slot::First);
        assert_eq!(rearmed.item_status, ItemStatus::Submitted);
        let short = rearmed.shortfall.unwrap();
        assert_eq!(short.missing_slots, vec![Slot::Second, Slot::Third]);
    }

    #[tokio::test]
    async fn resubmit_only_from_needs_revision() {
        let svc = seeded_service().await;
        let item = submitted(&svc).await.item;
        let err = svc
            .resubmit_after_revision(&author(), &item.id, "n/a", None)
            .await
            .unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::InvalidTransition { .. })));
    }
}
