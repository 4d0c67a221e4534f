//! Static rubric definition: criteria, subcriteria, priorities, and the rating scale.

pub mod domain;
mod template;

pub use domain::{CriterionId, InvalidScore, Priority, Score};
pub use template::{CriterionTemplate, RubricTemplate, SUBCRITERIA_PER_CRITERION};

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ScaleEntry {
    pub score: u8,
    pub caption: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriorityEntry {
    pub label: &'static str,
    pub weight: u32,
}

/// Help content describing how answers turn into scores.
#[derive(Debug, Clone, Serialize)]
pub struct RubricExplanation {
    pub summary: &'static str,
    pub scale: Vec<ScaleEntry>,
    pub priorities: Vec<PriorityEntry>,
    /// Priority-weighted criterion score shown in reports and previews.
    pub criterion_formula: &'static str,
    /// Plain mean saved with each criterion row and used by the default ranking.
    pub stored_criterion_formula: &'static str,
    pub final_formula: &'static str,
    pub criteria: &'static [CriterionTemplate],
}

pub fn explanation() -> RubricExplanation {
    let scale = (Score::MIN..=Score::MAX)
        .filter_map(|value| Score::new(value).ok())
        .map(|score| ScaleEntry {
            score: score.value(),
            caption: score.caption(),
        })
        .collect();

    let priorities = Priority::ordered()
        .into_iter()
        .map(|priority| PriorityEntry {
            label: priority.label(),
            weight: priority.weight(),
        })
        .collect();

    RubricExplanation {
        summary: "Each framework is rated on twelve criteria with five subcriteria each. \
                  Subcriteria are scored from 1 to 5 and every criterion and subcriterion \
                  carries a priority that decides how much it counts.",
        scale,
        priorities,
        criterion_formula: "criterion score (reports, previews, prioritized rankings) = sum(score x subcriterion weight) / sum(subcriterion weight), rounded to 2 decimals",
        stored_criterion_formula: "saved criterion score (default rankings) = sum(score) / number of subcriteria, rounded to 2 decimals",
        final_formula: "final score = sum(criterion score x criterion weight) / sum(criterion weight), rounded to 2 decimals",
        criteria: RubricTemplate::standard().criteria(),
    }
}
