//! Typed audit detail payloads.
//!
//! Each audit action can carry a structured `detail` JSON blob. These types
//! provide schema validation for the detail shapes Panel writes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::Slot;
use crate::selection::PickReason;

/// Detail for `AuditAction::StatusChanged`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StatusChangedDetail {
    pub from: String,
    pub to: String,
    pub reason: Option<String>,
}

/// Detail for `AuditAction::Assigned`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AssignedDetail {
    pub reviewer_id: String,
    pub slot: Slot,
    pub revision_round: u32,
    /// `None` for manual assignment.
    pub reason: Option<PickReason>,
}

/// Detail for `AuditAction::Replaced`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ReviewerReplacedDetail {
    pub old_reviewer_id: String,
    pub new_reviewer_id: String,
    pub slot: Slot,
    pub previous_status: String,
}

/// Detail for `AuditAction::VersionCreated`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct VersionCreatedDetail {
    pub parent_id: String,
    pub root_id: String,
    pub version: u32,
}
