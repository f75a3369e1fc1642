//! Reviewer selection configuration.

use panel_core::enums::SelectionPolicy;
use serde::{Deserialize, Serialize};

const fn default_policy() -> SelectionPolicy {
    SelectionPolicy::PoolA
}

fn default_head_keyword() -> String {
    "head".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectionConfig {
    /// Policy used when an item is submitted.
    #[serde(default = "default_policy")]
    pub default_policy: SelectionPolicy,

    /// Reviewer placed in the third slot when eligible. Empty means none.
    #[serde(default)]
    pub fallback_reviewer_id: String,

    /// Case-insensitive substring of a user's position marking a department head.
    #[serde(default = "default_head_keyword")]
    pub head_position_keyword: String,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            default_policy: default_policy(),
            fallback_reviewer_id: String::new(),
            head_position_keyword: default_head_keyword(),
        }
    }
}

impl SelectionConfig {
    /// The configured fallback reviewer, if any.
    #[must_use]
    pub fn fallback_reviewer(&self) -> Option<&str> {
        let id = self.fallback_reviewer_id.trim();
        (!id.is_empty()).then_some(id)
    }
}
