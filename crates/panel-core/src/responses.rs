//! Operation outcomes returned by the service and printed as JSON by `panel`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::consensus::ConsensusDecision;
use crate::entities::{ReviewAssignment, ReviewedItem};
use crate::enums::{ItemStatus, Slot};

/// The pool could not fill every slot. Reported, never raised.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PoolShortfall {
    pub requested: usize,
    pub assigned: usize,
    pub missing_slots: Vec<Slot>,
}

/// Result of automatic or manual reviewer assignment.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AssignmentOutcome {
    pub item_id: String,
    pub item_status: ItemStatus,
    pub assignments: Vec<ReviewAssignment>,
    pub shortfall: Option<PoolShortfall>,
}

/// Result of `submit`: the submitted item plus the automatic assignment.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub item: ReviewedItem,
    pub assignment: AssignmentOutcome,
}

/// What `finalize` did to the item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum FinalizeOutcome {
    /// Not every review is in yet.
    Awaiting { completed: usize },
    /// The item moved to the decided status.
    Applied { decision: ConsensusDecision, status: ItemStatus },
    /// The item was already decided or can no longer move; nothing written.
    Unchanged { status: ItemStatus },
}

/// Result of submitting a review.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ReviewSubmission {
    pub assignment: ReviewAssignment,
    pub finalize: FinalizeOutcome,
}

/// Result of replacing a reviewer on one or many items.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ReplacementOutcome {
    pub old_reviewer_id: String,
    pub new_reviewer_id: String,
    pub replaced: Vec<ReviewAssignment>,
}

/// Item counts per status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ItemStatistics {
    pub total: u64,
    pub draft: u64,
    pub submitted: u64,
    pub in_review: u64,
    pub needs_revision: u64,
    pub approved: u64,
    pub rejected: u64,
    pub archived: u64,
}

impl ItemStatistics {
    pub fn record(&mut self, status: ItemStatus, count: u64) {
        let slot = match status {
            ItemStatus::Draft => &mut self.draft,
            ItemStatus::Submitted => &mut self.submitted,
            ItemStatus::InReview => &mut self.in_review,
            ItemStatus::NeedsRevision => &mut self.needs_revision,
            ItemStatus::Approved => &mut self.approved,
            ItemStatus::Rejected => &mut self.rejected,
            ItemStatus::Archived => &mut self.archived,
        };
        *slot += count;
        self.total += count;
    }
}

/// Assignment counts per status. `approved` and `rejected` split `completed`
/// by recommendation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AssignmentStatistics {
    pub total: u64,
    pub pending: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub approved: u64,
    pub rejected: u64,
    pub needs_revision: u64,
}
