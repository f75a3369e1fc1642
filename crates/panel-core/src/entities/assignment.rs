use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::criteria::CriteriaSheet;
use crate::enums::{AssignmentStatus, Slot};

/// Free-text parts of a review.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct ReviewNarrative {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub general_feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_recommendation: Option<String>,
}

impl ReviewNarrative {
    /// Fill fields present in `other`, keeping the current value otherwise.
    #[must_use]
    pub fn merged(self, other: Self) -> Self {
        Self {
            general_feedback: other.general_feedback.or(self.general_feedback),
            recommendations: other.recommendations.or(self.recommendations),
            conclusion: other.conclusion.or(self.conclusion),
            additional_recommendation: other
                .additional_recommendation
                .or(self.additional_recommendation),
        }
    }
}

/// One reviewer's assignment to an item ("expertise").
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ReviewAssignment {
    pub id: String,
    pub item_id: String,
    pub reviewer_id: String,
    pub assigned_by: String,
    pub slot: Slot,
    pub status: AssignmentStatus,
    pub criteria: Option<CriteriaSheet>,
    /// Derived on submission: every criterion passed.
    pub recommended: bool,
    pub narrative: ReviewNarrative,
    pub revision_comments: Option<String>,
    pub revision_round: u32,
    pub assigned_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub sent_for_revision_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewAssignment {
    /// Stored status, with `Completed` resolved into `Approved`/`Rejected`.
    #[must_use]
    pub const fn resolved_status(&self) -> AssignmentStatus {
        match self.status {
            AssignmentStatus::Completed if self.recommended => AssignmentStatus::Approved,
            AssignmentStatus::Completed => AssignmentStatus::Rejected,
            other => other,
        }
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self.status, AssignmentStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(status: AssignmentStatus, recommended: bool) -> ReviewAssignment {
        let now = Utc::now();
        ReviewAssignment {
            id: "asg-1".into(),
            item_id: "itm-1".into(),
            reviewer_id: "exp-1".into(),
            assigned_by: "adm-1".into(),
            slot: Slot::First,
            status,
            criteria: None,
            recommended,
            narrative: ReviewNarrative::default(),
            revision_comments: None,
            revision_round: 1,
            assigned_at: now,
            reviewed_at: None,
            sent_for_revision_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn completed_resolves_by_recommendation() {
        assert_eq!(
            assignment(AssignmentStatus::Completed, true).resolved_status(),
            AssignmentStatus::Approved
        );
        assert_eq!(
            assignment(AssignmentStatus::Completed, false).resolved_status(),
            AssignmentStatus::Rejected
        );
        assert_eq!(
            assignment(AssignmentStatus::InProgress, false).resolved_status(),
            AssignmentStatus::InProgress
        );
    }

    #[test]
    fn narrative_merge_prefers_new_values() {
        let old = ReviewNarrative {
            general_feedback: Some("draft".into()),
            conclusion: Some("keep".into()),
            ..ReviewNarrative::default()
        };
        let new = ReviewNarrative {
            general_feedback: Some("final".into()),
            ..ReviewNarrative::default()
        };
        let merged = old.merged(new);
        assert_eq!(merged.general_feedback.as_deref(), Some("final"));
        assert_eq!(merged.conclusion.as_deref(), Some("keep"));
    }
}
