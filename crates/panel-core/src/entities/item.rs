use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::ItemStatus;

/// Free-form descriptive fields of a program. Stored as one JSON column.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct ItemContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_code: Option<String>,
    /// Length of the program in academic hours.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_hours: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competencies: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_outcomes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub methodology: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub materials: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
}

/// Author's note attached when resubmitting after a revision request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RevisionNote {
    /// Revision round that starts with this resubmission.
    pub round: u32,
    pub notes: String,
    pub changes_summary: Option<String>,
    pub at: DateTime<Utc>,
}

/// A document under review ("program").
///
/// A new version is a new row: `root_id` is shared by the whole chain and
/// `parent_id` points at the previous version.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ReviewedItem {
    pub id: String,
    pub root_id: String,
    pub parent_id: Option<String>,
    /// Starts at 1; strictly increases along the chain.
    pub version: u32,
    pub title: String,
    /// Subject tag matched against reviewer subjects by the subject-anchored policy.
    pub subject: Option<String>,
    pub content: ItemContent,
    pub status: ItemStatus,
    /// Status to restore on unarchive. Set only while archived.
    pub status_before_archive: Option<ItemStatus>,
    pub author_id: String,
    /// Starts at 1; incremented on every resubmission after revision.
    pub revision_round: u32,
    pub revision_history: Vec<RevisionNote>,
    pub rejection_reason: Option<String>,
    pub approved_by: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
