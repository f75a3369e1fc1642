//! Directory repository: users, their capabilities and reviewer attributes.
//!
//! Stands in for the external directory and identity provider. The reviewer
//! pool is every user holding `Expert`.

use std::collections::BTreeSet;

use chrono::Utc;
use panel_core::entities::UserSummary;
use panel_core::enums::{AuditAction, Capability, EntityType};
use panel_core::errors::CoreError;
use panel_core::identity::CallerIdentity;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_json, to_json};
use crate::service::PanelService;

/// A user to add to (or update in) the directory.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub id: String,
    pub display_name: String,
    pub capabilities: BTreeSet<Capability>,
    pub workplace: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub subjects: Vec<String>,
}

/// Attribute filters for directory lookups. Text matches are exact, subject
/// matches ignore case.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub workplace: Option<String>,
    pub department: Option<String>,
    pub subject: Option<String>,
}

const SELECT_COLS: &str =
    "id, display_name, capabilities, workplace, department, position, subjects, created_at";

fn row_to_user(row: &libsql::Row) -> Result<UserSummary, DatabaseError> {
    Ok(UserSummary {
        id: row.get(0)?,
        display_name: row.get(1)?,
        capabilities: parse_json(&row.get::<String>(2)?)?,
        workplace: get_opt_string(row, 3)?,
        department: get_opt_string(row, 4)?,
        position: get_opt_string(row, 5)?,
        subjects: parse_json(&row.get::<String>(6)?)?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

impl PanelService {
    /// Add a user to the directory, or refresh an existing user's attributes.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::PolicyViolation` for a blank id, or `DatabaseError`
    /// if the write fails.
    pub async fn register_user(&self, user: &NewUser) -> Result<UserSummary, DatabaseError> {
        if user.id.trim().is_empty() {
            return Err(CoreError::PolicyViolation("user id must not be empty".into()).into());
        }
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result = self.register_user_in(&tx, user).await;
        Self::finish(tx, result).await
    }

    async fn register_user_in(
        &self,
        conn: &libsql::Connection,
        user: &NewUser,
    ) -> Result<UserSummary, DatabaseError> {
        let now = Utc::now();
        conn.execute(
            "INSERT INTO users (id, display_name, capabilities, workplace, department, position, subjects, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                capabilities = excluded.capabilities,
                workplace = excluded.workplace,
                department = excluded.department,
                position = excluded.position,
                subjects = excluded.subjects",
            libsql::params![
                user.id.as_str(),
                user.display_name.as_str(),
                to_json(&user.capabilities)?,
                user.workplace.as_deref(),
                user.department.as_deref(),
                user.position.as_deref(),
                to_json(&user.subjects)?,
                now.to_rfc3339()
            ],
        )
        .await?;

        self.record_in(conn, &user.id, EntityType::User, &user.id, AuditAction::Registered, None)
            .await?;

        fetch_user(conn, &user.id).await
    }

    /// Look up one user.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the user is not in the directory.
    pub async fn get_user(&self, id: &str) -> Result<UserSummary, DatabaseError> {
        fetch_user(self.db().conn(), id).await
    }

    /// All users, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_users(&self, limit: u32) -> Result<Vec<UserSummary>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM users ORDER BY id LIMIT {limit}"),
                (),
            )
            .await?;
        let mut users = Vec::new();
        while let Some(row) = rows.next().await? {
            users.push(row_to_user(&row)?);
        }
        Ok(users)
    }

    /// Users holding `capability` and matching every filter present.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn find_users_by_capability(
        &self,
        capability: Capability,
        filter: &UserFilter,
    ) -> Result<Vec<UserSummary>, DatabaseError> {
        find_users_in(self.db().conn(), capability, filter).await
    }

    /// Resolve a stored user into the identity operations act on.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the user is not in the directory.
    pub async fn identity_for(&self, user_id: &str) -> Result<CallerIdentity, DatabaseError> {
        Ok(self.get_user(user_id).await?.identity())
    }
}

pub(crate) async fn fetch_user(
    conn: &libsql::Connection,
    id: &str,
) -> Result<UserSummary, DatabaseError> {
    find_user(conn, id)
        .await?
        .ok_or_else(|| CoreError::not_found(EntityType::User, id).into())
}

pub(crate) async fn find_user(
    conn: &libsql::Connection,
    id: &str,
) -> Result<Option<UserSummary>, DatabaseError> {
    let mut rows = conn
        .query(&format!("SELECT {SELECT_COLS} FROM users WHERE id = ?1"), [id])
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_user(&row)?)),
        None => Ok(None),
    }
}

pub(crate) async fn find_users_in(
    conn: &libsql::Connection,
    capability: Capability,
    filter: &UserFilter,
) -> Result<Vec<UserSummary>, DatabaseError> {
    let mut params: Vec<libsql::Value> = vec![capability.as_str().into()];
    let mut conditions =
        vec!["EXISTS (SELECT 1 FROM json_each(users.capabilities) WHERE json_each.value = ?1)".to_string()];

    if let Some(ref workplace) = filter.workplace {
        params.push(workplace.clone().into());
        conditions.push(format!("workplace = ?{}", params.len()));
    }
    if let Some(ref department) = filter.department {
        params.push(department.clone().into());
        conditions.push(format!("department = ?{}", params.len()));
    }
    if let Some(ref subject) = filter.subject {
        params.push(subject.to_lowercase().into());
        conditions.push(format!(
            "EXISTS (SELECT 1 FROM json_each(users.subjects) WHERE lower(json_each.value) = ?{})",
            params.len()
        ));
    }

    let sql = format!(
        "SELECT {SELECT_COLS} FROM users WHERE {} ORDER BY id",
        conditions.join(" AND ")
    );
    let mut rows = conn.query(&sql, libsql::params_from_iter(params)).await?;
    let mut users = Vec::new();
    while let Some(row) = rows.next().await? {
        users.push(row_to_user(&row)?);
    }
    Ok(users)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{register, test_service};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn register_and_get() {
        let svc = test_service().await;
        let user = register(&svc, "u-1", &[Capability::Expert, Capability::Author], "college", "math", "lecturer").await;
        assert_eq!(user.display_name, "U-1");
        let fetched = svc.get_user("u-1").await.unwrap();
        assert_eq!(fetched, user);
    }

    #[tokio::test]
    async fn register_twice_updates_attributes() {
        let svc = test_service().await;
        register(&svc, "u-1", &[Capability::Expert], "college", "math", "lecturer").await;
        register(&svc, "u-1", &[Capability::Expert, Capability::Admin], "institute", "physics", "head").await;
        let user = svc.get_user("u-1").await.unwrap();
        assert_eq!(user.workplace.as_deref(), Some("institute"));
        assert!(user.capabilities.contains(&Capability::Admin));
        assert_eq!(svc.list_users(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let svc = test_service().await;
        let err = svc.get_user("nobody").await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::NotFound { .. })));
        assert!(svc.identity_for("nobody").await.is_err());
    }

    #[tokio::test]
    async fn find_by_capability_and_attributes() {
        let svc = test_service().await;
        register(&svc, "u-a", &[Capability::Expert], "college", "math", "lecturer").await;
        register(&svc, "u-b", &[Capability::Expert], "college", "physics", "lecturer").await;
        register(&svc, "u-c", &[Capability::Author], "college", "math", "teacher").await;
        svc.register_user(&NewUser {
            id: "u-d".into(),
            display_name: "D".into(),
            capabilities: [Capability::Expert].into_iter().collect(),
            workplace: Some("institute".into()),
            subjects: vec!["History".into()],
            ..NewUser::default()
        })
        .await
        .unwrap();

        let experts = svc
            .find_users_by_capability(Capability::Expert, &UserFilter::default())
            .await
            .unwrap();
        let ids: Vec<_> = experts.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["u-a", "u-b", "u-d"]);

        let math = svc
            .find_users_by_capability(
                Capability::Expert,
                &UserFilter {
                    workplace: Some("college".into()),
                    department: Some("math".into()),
                    ..UserFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(math.len(), 1);
        assert_eq!(math[0].id, "u-a");

        let history = svc
            .find_users_by_capability(
                Capability::Expert,
                &UserFilter {
                    subject: Some("history".into()),
                    ..UserFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, "u-d");
    }

    #[tokio::test]
    async fn identity_carries_capabilities() {
        let svc = test_service().await;
        register(&svc, "u-adm", &[Capability::Admin, Capability::Expert], "m", "q", "o").await;
        let identity = svc.identity_for("u-adm").await.unwrap();
        assert!(identity.is_admin());
        assert_eq!(identity.user_id, "u-adm");
    }
}
