//! Unanimity consensus over a panel of reviews.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::criteria::CriteriaSheet;
use crate::entities::ReviewAssignment;
use crate::enums::{AssignmentStatus, ItemStatus};

/// Number of reviewers on a full panel.
pub const PANEL_SIZE: usize = 3;

/// A reviewer recommends the item only when every criterion passed.
#[must_use]
pub fn recommendation(sheet: &CriteriaSheet) -> bool {
    sheet.all_passed()
}

/// Aggregate decision for one revision round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "decision")]
pub enum ConsensusDecision {
    /// Fewer than `PANEL_SIZE` reviews are completed.
    Pending { completed: usize },
    /// Every completed review recommends the item.
    Approve,
    /// At least one completed review does not recommend the item.
    Revise,
}

impl ConsensusDecision {
    /// The item status this decision leads to, if any.
    #[must_use]
    pub const fn target_status(self) -> Option<ItemStatus> {
        match self {
            Self::Pending { .. } => None,
            Self::Approve => Some(ItemStatus::Approved),
            Self::Revise => Some(ItemStatus::NeedsRevision),
        }
    }
}

/// Decide from the assignments of a single revision round.
///
/// Only `Completed` assignments count. Strict unanimity: no majority rule.
#[must_use]
pub fn decide(assignments: &[ReviewAssignment]) -> ConsensusDecision {
    let completed: Vec<&ReviewAssignment> = assignments
        .iter()
        .filter(|a| a.status == AssignmentStatus::Completed)
        .collect();

    if completed.len() < PANEL_SIZE {
        return ConsensusDecision::Pending {
            completed: completed.len(),
        };
    }

    if completed.iter().all(|a| a.recommended) {
        ConsensusDecision::Approve
    } else {
        ConsensusDecision::Revise
    }
}
