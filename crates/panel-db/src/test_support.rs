//! Shared test utilities for panel-db unit tests.

#[cfg(test)]
pub(crate) mod helpers {
    use panel_config::SelectionConfig;
    use panel_core::entities::{ReviewAssignment, ReviewedItem, UserSummary};
    use panel_core::enums::Capability;
    use panel_core::identity::CallerIdentity;
    use panel_core::responses::SubmitOutcome;

    use crate::PanelDb;
    use crate::repos::directory::NewUser;
    use crate::repos::item::NewItem;
    use crate::service::PanelService;

    /// In-memory service with a fixed seed and the `u-fallback` reviewer configured.
    pub async fn test_service() -> PanelService {
        let db = PanelDb::open_local(":memory:").await.unwrap();
        let selection = SelectionConfig {
            fallback_reviewer_id: "u-fallback".into(),
            ..SelectionConfig::default()
        };
        PanelService::from_db(db, selection).with_rng_seed(7)
    }

    pub async fn register(
        svc: &PanelService,
        id: &str,
        caps: &[Capability],
        workplace: &str,
        department: &str,
        position: &str,
    ) -> UserSummary {
        svc.register_user(&NewUser {
            id: id.into(),
            display_name: id.to_uppercase(),
            capabilities: caps.iter().copied().collect(),
            workplace: Some(workplace.into()),
            department: Some(department.into()),
            position: Some(position.into()),
            subjects: vec![],
        })
        .await
        .unwrap()
    }

    /// Admin, author and a four-expert pool (three at the author's college plus the fallback).
    pub async fn seeded_service() -> PanelService {
        let svc = test_service().await;
        register(&svc, "u-admin", &[Capability::Admin], "ministry", "quality", "officer").await;
        register(&svc, "u-author", &[Capability::Author], "college", "math", "teacher").await;
        register(&svc, "u-e1", &[Capability::Expert], "college", "math", "lecturer").await;
        register(&svc, "u-e2", &[Capability::Expert], "college", "math", "lecturer").await;
        register(&svc, "u-head", &[Capability::Expert], "college", "math", "Head of department").await;
        register(&svc, "u-fallback", &[Capability::Expert], "ministry", "quality", "inspector").await;
        svc
    }

    pub fn admin() -> CallerIdentity {
        CallerIdentity::new("u-admin", [Capability::Admin])
    }

    pub fn author() -> CallerIdentity {
        CallerIdentity::new("u-author", [Capability::Author])
    }

    pub fn expert(id: &str) -> CallerIdentity {
        CallerIdentity::new(id, [Capability::Expert])
    }

    /// Admin and author only: submissions find an empty reviewer pool.
    pub async fn bare_service() -> PanelService {
        let svc = test_service().await;
        register(&svc, "u-admin", &[Capability::Admin], "ministry", "quality", "officer").await;
        register(&svc, "u-author", &[Capability::Author], "college", "math", "teacher").await;
        svc
    }

    pub async fn draft(svc: &PanelService, title: &str) -> ReviewedItem {
        svc.create_item(
            &author(),
            &NewItem {
                title: title.into(),
                subject: Some("math".into()),
                ..NewItem::default()
            },
        )
        .await
        .unwrap()
    }

    /// A draft submitted by the author, with whatever panel the pool allows.
    pub async fn submitted(svc: &PanelService) -> SubmitOutcome {
        let item = draft(svc, "Algebra refresher").await;
        svc.submit(&author(), &item.id).await.unwrap()
    }

    /// The identity holding `assignment`.
    pub fn holder(assignment: &ReviewAssignment) -> CallerIdentity {
        expert(&assignment.reviewer_id)
    }
}
