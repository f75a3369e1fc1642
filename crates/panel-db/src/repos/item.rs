//! Reviewed item repository: authoring, queries, version chains, and the
//! compare-and-swap status update every lifecycle step goes through.

use chrono::Utc;
use panel_core::audit_detail::StatusChangedDetail;
use panel_core::entities::{ItemContent, ReviewedItem};
use panel_core::enums::{AuditAction, Capability, EntityType, ItemStatus};
use panel_core::errors::CoreError;
use panel_core::identity::{CallerIdentity, ensure_owner, has_capability};
use panel_core::ids::PREFIX_ITEM;

use crate::error::DatabaseError;
use crate::generate_id;
use crate::helpers::{
    get_opt_string, get_u32, parse_datetime, parse_enum, parse_json, parse_optional_datetime,
    to_detail, to_json,
};
use crate::service::PanelService;
use crate::updates::item::ItemUpdate;

/// Fields of a new draft.
#[derive(Debug, Clone, Default)]
pub struct NewItem {
    pub title: String,
    pub subject: Option<String>,
    pub content: ItemContent,
}

/// Filter criteria for item listings.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub status: Option<ItemStatus>,
    pub author_id: Option<String>,
    pub limit: Option<u32>,
}

pub(crate) const SELECT_COLS: &str = "id, root_id, parent_id, version, title, subject, content, status, \
     status_before_archive, author_id, revision_round, revision_history, rejection_reason, \
     approved_by, submitted_at, approved_at, archived_at, created_at, updated_at";

fn row_to_item(row: &libsql::Row) -> Result<ReviewedItem, DatabaseError> {
    Ok(ReviewedItem {
        id: row.get(0)?,
        root_id: row.get(1)?,
        parent_id: get_opt_string(row, 2)?,
        version: get_u32(row, 3)?,
        title: row.get(4)?,
        subject: get_opt_string(row, 5)?,
        content: parse_json(&row.get::<String>(6)?)?,
        status: parse_enum(&row.get::<String>(7)?)?,
        status_before_archive: get_opt_string(row, 8)?
            .map(|s| parse_enum(&s))
            .transpose()?,
        author_id: row.get(9)?,
        revision_round: get_u32(row, 10)?,
        revision_history: parse_json(&row.get::<String>(11)?)?,
        rejection_reason: get_opt_string(row, 12)?,
        approved_by: get_opt_string(row, 13)?,
        submitted_at: parse_optional_datetime(get_opt_string(row, 14)?.as_deref())?,
        approved_at: parse_optional_datetime(get_opt_string(row, 15)?.as_deref())?,
        archived_at: parse_optional_datetime(get_opt_string(row, 16)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(17)?)?,
        updated_at: parse_datetime(&row.get::<String>(18)?)?,
    })
}

async fn collect_items(mut rows: libsql::Rows) -> Result<Vec<ReviewedItem>, DatabaseError> {
    let mut items = Vec::new();
    while let Some(row) = rows.next().await? {
        items.push(row_to_item(&row)?);
    }
    Ok(items)
}

pub(crate) async fn fetch_item(
    conn: &libsql::Connection,
    id: &str,
) -> Result<ReviewedItem, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {SELECT_COLS} FROM reviewed_items WHERE id = ?1"),
            [id],
        )
        .await?;
    let row = rows
        .next()
        .await?
        .ok_or_else(|| CoreError::not_found(EntityType::Item, id))?;
    row_to_item(&row)
}

impl PanelService {
    /// Create a new `Draft` item at version 1.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Forbidden` unless the caller holds `Author` or
    /// `Admin`, `CoreError::PolicyViolation` for a blank title.
    pub async fn create_item(
        &self,
        caller: &CallerIdentity,
        new: &NewItem,
    ) -> Result<ReviewedItem, DatabaseError> {
        if !has_capability(caller, Capability::Author) && !caller.is_admin() {
            return Err(CoreError::forbidden(&caller.user_id, "create item").into());
        }
        if new.title.trim().is_empty() {
            return Err(CoreError::PolicyViolation("title must not be empty".into()).into());
        }

        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result = self.create_item_in(&tx, caller, new).await;
        Self::finish(tx, result).await
    }

    async fn create_item_in(
        &self,
        conn: &libsql::Connection,
        caller: &CallerIdentity,
        new: &NewItem,
    ) -> Result<ReviewedItem, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let id = generate_id(conn, PREFIX_ITEM).await?;
        conn.execute(
            "INSERT INTO reviewed_items (id, root_id, parent_id, version, title, subject, content, status,
                author_id, revision_round, revision_history, created_at, updated_at)
             VALUES (?1, ?1, NULL, 1, ?2, ?3, ?4, ?5, ?6, 1, '[]', ?7, ?7)",
            libsql::params![
                id.as_str(),
                new.title.trim(),
                new.subject.as_deref(),
                to_json(&new.content)?,
                ItemStatus::Draft.as_str(),
                caller.user_id.as_str(),
                now
            ],
        )
        .await?;

        self.record_in(conn, &caller.user_id, EntityType::Item, &id, AuditAction::Created, None)
            .await?;
        tracing::info!(item = %id, author = %caller.user_id, "item created");

        fetch_item(conn, &id).await
    }

    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the item does not exist.
    pub async fn get_item(&self, id: &str) -> Result<ReviewedItem, DatabaseError> {
        fetch_item(self.db().conn(), id).await
    }

    /// Edit a draft, or an item sent back for revision. Author only.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Forbidden` for anyone but the author and
    /// `CoreError::InvalidTransition` in any other status.
    pub async fn update_item(
        &self,
        caller: &CallerIdentity,
        item_id: &str,
        update: &ItemUpdate,
    ) -> Result<ReviewedItem, DatabaseError> {
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result = self.update_item_in(&tx, caller, item_id, update).await;
        Self::finish(tx, result).await
    }

    async fn update_item_in(
        &self,
        conn: &libsql::Connection,
        caller: &CallerIdentity,
        item_id: &str,
        update: &ItemUpdate,
    ) -> Result<ReviewedItem, DatabaseError> {
        let item = fetch_item(conn, item_id).await?;
        ensure_owner(caller, &item.author_id, "update item")?;
        if !matches!(item.status, ItemStatus::Draft | ItemStatus::NeedsRevision) {
            return Err(
                CoreError::invalid_transition(EntityType::Item, item_id, item.status, "updated").into(),
            );
        }
        if update.is_empty() {
            return Ok(item);
        }

        let mut sets = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(ref title) = update.title {
            if title.trim().is_empty() {
                return Err(CoreError::PolicyViolation("title must not be empty".into()).into());
            }
            params.push(title.trim().into());
            sets.push(format!("title = ?{}", params.len()));
        }
        if let Some(ref subject) = update.subject {
            params.push(subject.clone().map_or(libsql::Value::Null, Into::into));
            sets.push(format!("subject = ?{}", params.len()));
        }
        if let Some(ref content) = update.content {
            params.push(to_json(content)?.into());
            sets.push(format!("content = ?{}", params.len()));
        }

        params.push(Utc::now().to_rfc3339().into());
        sets.push(format!("updated_at = ?{}", params.len()));
        params.push(item_id.into());
        let id_idx = params.len();
        params.push(item.status.as_str().into());
        let status_idx = params.len();

        let sql = format!(
            "UPDATE reviewed_items SET {} WHERE id = ?{id_idx} AND status = ?{status_idx}",
            sets.join(", ")
        );
        let changed = conn.execute(&sql, libsql::params_from_iter(params)).await?;
        if changed != 1 {
            return Err(
                CoreError::invalid_transition(EntityType::Item, item_id, item.status, "updated").into(),
            );
        }

        self.record_in(
            conn,
            &caller.user_id,
            EntityType::Item,
            item_id,
            AuditAction::Updated,
            Some(to_detail(update)?),
        )
        .await?;

        fetch_item(conn, item_id).await
    }

    /// List non-archived items, newest first. A status filter of `Archived`
    /// lists archived items instead.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<ReviewedItem>, DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        match filter.status {
            Some(status) => {
                params.push(status.as_str().into());
                conditions.push(format!("status = ?{}", params.len()));
            }
            None => conditions.push(format!("status != '{}'", ItemStatus::Archived.as_str())),
        }
        if let Some(ref author) = filter.author_id {
            params.push(author.clone().into());
            conditions.push(format!("author_id = ?{}", params.len()));
        }

        let limit = filter.limit.unwrap_or(100);
        let sql = format!(
            "SELECT {SELECT_COLS} FROM reviewed_items WHERE {}
             ORDER BY created_at DESC, rowid DESC LIMIT {limit}",
            conditions.join(" AND ")
        );
        let rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        collect_items(rows).await
    }

    /// Archived items, most recently archived first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_archived_items(&self, limit: u32) -> Result<Vec<ReviewedItem>, DatabaseError> {
        let rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM reviewed_items WHERE status = ?1
                     ORDER BY archived_at DESC, rowid DESC LIMIT {limit}"
                ),
                [ItemStatus::Archived.as_str()],
            )
            .await?;
        collect_items(rows).await
    }

    /// Every version sharing the item's root, ordered by version.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the item does not exist.
    pub async fn get_versions(&self, item_id: &str) -> Result<Vec<ReviewedItem>, DatabaseError> {
        let conn = self.db().conn();
        let item = fetch_item(conn, item_id).await?;
        let rows = conn
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM reviewed_items WHERE root_id = ?1 ORDER BY version"
                ),
                [item.root_id.as_str()],
            )
            .await?;
        collect_items(rows).await
    }

    /// Move `item` to `to` if its stored status is still `item.status`.
    ///
    /// `extra` columns are written in the same UPDATE. Appends a
    /// `StatusChanged` audit entry and returns the reloaded item.
    pub(crate) async fn transition_item_in(
        &self,
        conn: &libsql::Connection,
        actor_id: &str,
        item: &ReviewedItem,
        to: ItemStatus,
        extra: Vec<(&'static str, libsql::Value)>,
        reason: Option<String>,
    ) -> Result<ReviewedItem, DatabaseError> {
        if !item.status.can_transition_to(to) {
            return Err(CoreError::invalid_transition(EntityType::Item, &item.id, item.status, to).into());
        }

        let mut sets = vec!["status = ?1".to_string(), "updated_at = ?2".to_string()];
        let mut params: Vec<libsql::Value> =
            vec![to.as_str().into(), Utc::now().to_rfc3339().into()];
        for (column, value) in extra {
            params.push(value);
            sets.push(format!("{column} = ?{}", params.len()));
        }
        params.push(item.id.as_str().into());
        let id_idx = params.len();
        params.push(item.status.as_str().into());
        let status_idx = params.len();

        let sql = format!(
            "UPDATE reviewed_items SET {} WHERE id = ?{id_idx} AND status = ?{status_idx}",
            sets.join(", ")
        );
        let changed = conn.execute(&sql, libsql::params_from_iter(params)).await?;
        if changed != 1 {
            return Err(CoreError::invalid_transition(EntityType::Item, &item.id, item.status, to).into());
        }

        let detail = StatusChangedDetail {
            from: item.status.as_str().to_string(),
            to: to.as_str().to_string(),
            reason,
        };
        self.record_in(
            conn,
            actor_id,
            EntityType::Item,
            &item.id,
            AuditAction::StatusChanged,
            Some(to_detail(&detail)?),
        )
        .await?;
        tracing::info!(item = %item.id, from = %item.status, to = %to, "item status changed");

        fetch_item(conn, &item.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{admin, author, expert, seeded_service};
    use crate::updates::item::ItemUpdateBuilder;
    use pretty_assertions::assert_eq;

    fn new_item(title: &str) -> NewItem {
        NewItem {
            title: title.into(),
            subject: Some("algebra".into()),
            content: ItemContent {
                description: Some("Intro course".into()),
                duration_hours: Some(36),
                ..ItemContent::default()
            },
        }
    }

    #[tokio::test]
    async fn create_starts_as_draft_version_one() {
        let svc = seeded_service().await;
        let item = svc.create_item(&author(), &new_item("Algebra refresher")).await.unwrap();
        assert_eq!(item.status, ItemStatus::Draft);
        assert_eq!(item.version, 1);
        assert_eq!(item.root_id, item.id);
        assert_eq!(item.parent_id, None);
        assert_eq!(item.revision_round, 1);
        assert_eq!(item.author_id, "u-author");
        assert_eq!(item.content.duration_hours, Some(36));
        assert!(item.id.starts_with("itm-"));

        let fetched = svc.get_item(&item.id).await.unwrap();
        assert_eq!(fetched, item);
    }

    #[tokio::test]
    async fn experts_cannot_create_items() {
        let svc = seeded_service().await;
        let err = svc.create_item(&expert("u-e1"), &new_item("x")).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let svc = seeded_service().await;
        let err = svc.create_item(&author(), &new_item("   ")).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::PolicyViolation(_))));
    }

    #[tokio::test]
    async fn update_draft_by_author() {
        let svc = seeded_service().await;
        let item = svc.create_item(&author(), &new_item("Old")).await.unwrap();
        let update = ItemUpdateBuilder::new().title("New").subject(None).build();
        let updated = svc.update_item(&author(), &item.id, &update).await.unwrap();
        assert_eq!(updated.title, "New");
        assert_eq!(updated.subject, None);
        assert_eq!(updated.content, item.content);
    }

    #[tokio::test]
    async fn update_by_other_user_is_forbidden() {
        let svc = seeded_service().await;
        let item = svc.create_item(&author(), &new_item("Old")).await.unwrap();
        let update = ItemUpdateBuilder::new().title("Hijack").build();
        let err = svc.update_item(&admin(), &item.id, &update).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn list_excludes_archived_by_default() {
        let svc = seeded_service().await;
        let a = svc.create_item(&author(), &new_item("A")).await.unwrap();
        let b = svc.create_item(&author(), &new_item("B")).await.unwrap();
        svc.archive(&admin(), &b.id).await.unwrap();

        let listed = svc.list_items(&ItemFilter::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, a.id);

        let archived = svc.list_archived_items(10).await.unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].id, b.id);

        let drafts = svc
            .list_items(&ItemFilter {
                status: Some(ItemStatus::Draft),
                author_id: Some("u-author".into()),
                limit: Some(5),
            })
            .await
            .unwrap();
        assert_eq!(drafts.len(), 1);
    }

    #[tokio::test]
    async fn missing_item_is_not_found() {
        let svc = seeded_service().await;
        let err = svc.get_item("itm-missing").await.unwrap_err();
        assert!(matches!(
            err.as_core(),
            Some(CoreError::NotFound { entity_type: EntityType::Item, .. })
        ));
    }

    #[tokio::test]
    async fn stale_status_fails_compare_and_swap() {
        let svc = seeded_service().await;
        let item = svc.create_item(&author(), &new_item("A")).await.unwrap();
        let stale = ReviewedItem {
            status: ItemStatus::Submitted,
            ..item.clone()
        };
        let err = svc
            .transition_item_in(svc.db().conn(), "u-admin", &stale, ItemStatus::InReview, vec![], None)
            .await
            .unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::InvalidTransition { .. })));
        assert_eq!(svc.get_item(&item.id).await.unwrap().status, ItemStatus::Draft);
    }
}
