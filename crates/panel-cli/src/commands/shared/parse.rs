use panel_core::criteria::{CriteriaSheet, Criterion};
use panel_core::entities::{ItemContent, ReviewNarrative};
use serde::de::DeserializeOwned;

use crate::cli::subcommands::review::NarrativeArgs;

/// Parse a snake_case enum value using serde-deserialization.
pub fn parse_enum<T>(raw: &str, field: &str) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    let normalized = raw.replace('-', "_");
    let json = format!("\"{normalized}\"");
    serde_json::from_str(&json).map_err(|error| anyhow::anyhow!("invalid {field} '{raw}': {error}"))
}

/// Parse `--content` JSON, falling back to a lone description.
pub fn parse_content(json: Option<&str>, description: Option<&str>) -> anyhow::Result<ItemContent> {
    let mut content: ItemContent = match json {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|error| anyhow::anyhow!("invalid content JSON: {error}"))?,
        None => ItemContent::default(),
    };
    if let Some(description) = description {
        content.description = Some(description.to_string());
    }
    Ok(content)
}

/// Build a sheet where every criterion passes except those named in `failures`
/// (`name` or `name=comment`).
pub fn criteria_from_failures(failures: &[String]) -> anyhow::Result<CriteriaSheet> {
    let mut sheet = CriteriaSheet::uniform(true);
    for raw in failures {
        let (name, comment) = match raw.split_once('=') {
            Some((name, comment)) => (name.trim(), Some(comment.trim())),
            None => (raw.trim(), None),
        };
        let criterion = match name.replace('-', "_").as_str() {
            "relevance" => &mut sheet.characteristics.relevance,
            "goal_and_topic" => &mut sheet.characteristics.goal_and_topic,
            "professional_standard" => &mut sheet.characteristics.professional_standard,
            "planned_competencies" => &mut sheet.characteristics.planned_competencies,
            "planned_outcomes" => &mut sheet.characteristics.planned_outcomes,
            "matches_topic" => &mut sheet.content.matches_topic,
            "work_programs_match_plan" => &mut sheet.content.work_programs_match_plan,
            _ => {
                let known: Vec<&str> = sheet.entries().iter().map(|(n, _)| *n).collect();
                anyhow::bail!("unknown criterion '{name}' (expected one of: {})", known.join(", "));
            }
        };
        *criterion = Criterion {
            passed: false,
            comment: comment.filter(|c| !c.is_empty()).map(str::to_string),
            recommendation: None,
        };
    }
    Ok(sheet)
}

pub fn narrative(args: &NarrativeArgs) -> ReviewNarrative {
    ReviewNarrative {
        general_feedback: args.feedback.clone(),
        recommendations: args.recommendations.clone(),
        conclusion: args.conclusion.clone(),
        additional_recommendation: args.additional.clone(),
    }
}
