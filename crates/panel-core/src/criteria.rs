//! The fixed seven-criterion evaluation sheet filled in by each reviewer.
//!
//! Criteria are split into two named groups: the program's characteristics
//! (five criteria) and its content (two criteria). A review recommends the
//! item only when every criterion passed.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One evaluated criterion.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Criterion {
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl Criterion {
    #[must_use]
    pub const fn pass() -> Self {
        Self {
            passed: true,
            comment: None,
            recommendation: None,
        }
    }

    #[must_use]
    pub fn fail(comment: impl Into<String>) -> Self {
        Self {
            passed: false,
            comment: Some(comment.into()),
            recommendation: None,
        }
    }
}

/// Group 1: characteristics of the program.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ProgramCharacteristics {
    pub relevance: Criterion,
    pub goal_and_topic: Criterion,
    pub professional_standard: Criterion,
    pub planned_competencies: Criterion,
    pub planned_outcomes: Criterion,
}

/// Group 2: content of the program.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ProgramContent {
    pub matches_topic: Criterion,
    pub work_programs_match_plan: Criterion,
}

/// The full criteria sheet of one review.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct CriteriaSheet {
    pub characteristics: ProgramCharacteristics,
    pub content: ProgramContent,
}

impl CriteriaSheet {
    pub const LEN: usize = 7;

    /// A sheet where every criterion has the same outcome.
    #[must_use]
    pub const fn uniform(passed: bool) -> Self {
        const fn c(passed: bool) -> Criterion {
            Criterion {
                passed,
                comment: None,
                recommendation: None,
            }
        }
        Self {
            characteristics: ProgramCharacteristics {
                relevance: c(passed),
                goal_and_topic: c(passed),
                professional_standard: c(passed),
                planned_competencies: c(passed),
                planned_outcomes: c(passed),
            },
            content: ProgramContent {
                matches_topic: c(passed),
                work_programs_match_plan: c(passed),
            },
        }
    }

    /// All seven criteria with their stable names, in sheet order.
    #[must_use]
    pub const fn entries(&self) -> [(&'static str, &Criterion); Self::LEN] {
        let ch = &self.characteristics;
        let ct = &self.content;
        [
            ("relevance", &ch.relevance),
            ("goal_and_topic", &ch.goal_and_topic),
            ("professional_standard", &ch.professional_standard),
            ("planned_competencies", &ch.planned_competencies),
            ("planned_outcomes", &ch.planned_outcomes),
            ("matches_topic", &ct.matches_topic),
            ("work_programs_match_plan", &ct.work_programs_match_plan),
        ]
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.entries().iter().all(|(_, c)| c.passed)
    }

    /// Names of the criteria that did not pass.
    #[must_use]
    pub fn failed(&self) -> Vec<&'static str> {
        self.entries()
            .iter()
            .filter(|(_, c)| !c.passed)
            .map(|(name, _)| *name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_sheet_fails_everything() {
        let sheet = CriteriaSheet::default();
        assert!(!sheet.all_passed());
        assert_eq!(sheet.failed().len(), CriteriaSheet::LEN);
    }

    #[test]
    fn uniform_pass_has_no_failures() {
        let sheet = CriteriaSheet::uniform(true);
        assert!(sheet.all_passed());
        assert!(sheet.failed().is_empty());
    }

    #[test]
    fn single_failure_is_named() {
        let mut sheet = CriteriaSheet::uniform(true);
        sheet.content.work_programs_match_plan = Criterion::fail("plan mismatch");
        assert!(!sheet.all_passed());
        assert_eq!(sheet.failed(), vec!["work_programs_match_plan"]);
    }

    #[test]
    fn optional_text_is_omitted_from_json() {
        let json = serde_json::to_value(Criterion::pass()).unwrap();
        assert_eq!(json, serde_json::json!({ "passed": true }));
        let back: Criterion = serde_json::from_value(json).unwrap();
        assert_eq!(back, Criterion::pass());
    }
}
