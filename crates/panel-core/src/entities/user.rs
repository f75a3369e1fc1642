use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::Capability;
use crate::identity::{CallerIdentity, HasCapabilities};

/// A directory entry. Users holding `Expert` form the reviewer pool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct UserSummary {
    pub id: String,
    pub display_name: String,
    pub capabilities: BTreeSet<Capability>,
    pub workplace: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub subjects: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl UserSummary {
    /// Identity of this user as seen by the operations.
    #[must_use]
    pub fn identity(&self) -> CallerIdentity {
        CallerIdentity {
            user_id: self.id.clone(),
            capabilities: self.capabilities.clone(),
        }
    }

    /// Whether any of the user's subjects equals `subject`, ignoring case.
    #[must_use]
    pub fn teaches(&self, subject: &str) -> bool {
        let wanted = subject.to_lowercase();
        self.subjects.iter().any(|s| s.to_lowercase() == wanted)
    }
}

impl HasCapabilities for UserSummary {
    fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }
}
