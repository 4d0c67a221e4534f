//! Evaluation report: per-criterion tables, a final-score summary, chart data and exports.

mod export;
pub mod views;

pub use export::{render_csv, render_text, write_csv, ExportError, CSV_HEADER, TEXT_PAGE_BREAK};
pub use views::{
    ChartDataset, CriterionChart, CriterionSection, FrameworkSection, SubcriterionLine,
    SummaryLine,
};

use serde::Serialize;

use super::snapshot::RubricSnapshot;
use crate::scoring::{self, SubcriterionWeighting};
use views::priority_label;

#[derive(Debug, Clone, Serialize)]
pub struct ReportDocument {
    pub title: &'static str,
    pub weighting: SubcriterionWeighting,
    pub frameworks: Vec<FrameworkSection>,
    pub chart: CriterionChart,
}

impl ReportDocument {
    pub const TITLE: &'static str = "Evaluation Report";

    /// Build the report from the answered rubric using priority-weighted criterion scores.
    pub fn from_snapshot(snapshot: &RubricSnapshot) -> Self {
        let weighting = SubcriterionWeighting::Prioritized;

        let frameworks: Vec<FrameworkSection> = snapshot
            .frameworks
            .iter()
            .map(|framework| {
                let score = framework.score(weighting);
                let criteria: Vec<CriterionSection> = framework
                    .criteria
                    .iter()
                    .zip(&score.criteria)
                    .map(|(criterion, scored)| CriterionSection {
                        title: criterion.title.clone(),
                        score: scored.score,
                        score_display: scoring::format_score(scored.score),
                        priority: criterion.weight,
                        priority_label: priority_label(criterion.weight),
                        subcriteria: criterion
                            .subcriteria
                            .iter()
                            .map(|sub| SubcriterionLine {
                                title: sub.title.clone(),
                                score: sub.score.map(|score| score.value()),
                                priority: sub.weight,
                                priority_label: priority_label(sub.weight),
                            })
                            .collect(),
                    })
                    .collect();

                let summary = criteria
                    .iter()
                    .map(|section| SummaryLine {
                        criterion: section.title.clone(),
                        score_display: section.score_display.clone(),
                        priority_label: section.priority_label,
                    })
                    .collect();

                FrameworkSection {
                    framework: framework.framework_name.clone(),
                    criteria,
                    summary,
                    final_score: score.final_score,
                    final_score_display: scoring::format_score(score.final_score),
                }
            })
            .collect();

        let labels = frameworks
            .first()
            .map(|section| {
                section
                    .criteria
                    .iter()
                    .map(|criterion| criterion.title.clone())
                    .collect()
            })
            .unwrap_or_default();

        let datasets = frameworks
            .iter()
            .map(|section| ChartDataset {
                label: section.framework.clone(),
                data: section.criteria.iter().map(|criterion| criterion.score).collect(),
            })
            .collect();

        Self {
            title: Self::TITLE,
            weighting,
            frameworks,
            chart: CriterionChart { labels, datasets },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluations::draft::{CellKey, EvaluationDraft};
    use crate::rubric::{CriterionId, Priority, RubricTemplate, Score, SUBCRITERIA_PER_CRITERION};

    fn answered_snapshot(frameworks: &[&str]) -> RubricSnapshot {
        let mut draft = EvaluationDraft::new(frameworks.iter().copied()).expect("valid setup");
        draft.prefill_priorities(Priority::Medium);
        for framework in 0..frameworks.len() {
            for criterion in RubricTemplate::standard().criteria() {
                for subcriterion in 0..SUBCRITERIA_PER_CRITERION {
                    let value = (subcriterion as u8 % 5) + 1;
                    draft
                        .set_score(
                            CellKey {
                                framework,
                                criterion: criterion.id,
                                subcriterion,
                            },
                            Score::new(value).ok(),
                        )
                        .expect("cell exists");
                }
            }
        }
        draft
            .set_criterion_priority(0, CriterionId(1), Some(Priority::High))
            .expect("criterion exists");
        draft.snapshot()
    }

    #[test]
    fn document_scores_every_criterion_and_framework() {
        let document = ReportDocument::from_snapshot(&answered_snapshot(&["COBIT", "ITIL"]));

        assert_eq!(document.frameworks.len(), 2);
        let cobit = &document.frameworks[0];
        assert_eq!(cobit.criteria.len(), 12);
        assert_eq!(cobit.criteria[0].score_display, "3.00");
        assert_eq!(cobit.criteria[0].priority_label, "High Priority");
        assert_eq!(cobit.summary.len(), 12);
        assert_eq!(cobit.final_score_display, "3.00");

        assert_eq!(document.chart.labels.len(), 12);
        assert_eq!(document.chart.labels[0], "Cost");
        assert_eq!(document.chart.datasets[1].label, "ITIL");
    }

    #[test]
    fn blank_answers_render_as_empty_cells() {
        let draft = EvaluationDraft::new(["COBIT"]).expect("valid setup");
        let document = ReportDocument::from_snapshot(&draft.snapshot());
        let first = &document.frameworks[0].criteria[0];
        assert_eq!(first.score_display, "0.00");
        assert_eq!(first.priority_label, "");
        assert_eq!(first.subcriteria[0].score, None);
        assert_eq!(document.frameworks[0].final_score_display, "0.00");
    }
}
