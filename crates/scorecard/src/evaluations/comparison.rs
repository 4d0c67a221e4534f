use std::collections::HashSet;

use serde::Serialize;

use super::stored::{StoredFrameworkScore, StoredRows};
use crate::scoring::{self, SubcriterionWeighting};
use crate::store::EvaluationId;

pub const MINIMUM_SELECTIONS: usize = 2;

/// Side-by-side criterion scores for the selected columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub title: String,
    pub scores: Vec<Option<f64>>,
    pub subcriteria: Vec<SubcriterionComparisonRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubcriterionComparisonRow {
    pub title: String,
    pub scores: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationColumn {
    pub evaluation_id: EvaluationId,
    pub framework: String,
    pub evaluation_name: String,
    pub user: String,
    pub date: String,
    pub final_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationComparison {
    pub weighting: SubcriterionWeighting,
    pub columns: Vec<EvaluationColumn>,
    pub criteria: Vec<ComparisonRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameworkColumn {
    pub framework: String,
    pub evaluations: usize,
    pub final_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameworkComparison {
    pub columns: Vec<FrameworkColumn>,
    pub criteria: Vec<ComparisonRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComparisonError {
    #[error("select at least two items to compare")]
    TooFewSelections,
    #[error("evaluation {0} does not exist")]
    UnknownEvaluation(EvaluationId),
    #[error("no evaluation covers framework {0}")]
    UnknownFramework(String),
}

/// Compare selected evaluations; each framework inside an evaluation becomes its own column.
pub fn compare_evaluations(
    rows: &StoredRows,
    ids: &[EvaluationId],
    weighting: SubcriterionWeighting,
) -> Result<EvaluationComparison, ComparisonError> {
    let mut seen = HashSet::new();
    let selected: Vec<EvaluationId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
    if selected.len() < MINIMUM_SELECTIONS {
        return Err(ComparisonError::TooFewSelections);
    }

    let mut columns = Vec::new();
    let mut scores: Vec<StoredFrameworkScore> = Vec::new();
    for id in selected {
        let evaluation = rows
            .evaluation(id)
            .ok_or(ComparisonError::UnknownEvaluation(id))?;
        for score in rows.framework_scores(evaluation, weighting) {
            columns.push(EvaluationColumn {
                evaluation_id: evaluation.id,
                framework: score.framework.clone(),
                evaluation_name: evaluation.display_name.clone(),
                user: rows.owner_name(evaluation.owner).to_string(),
                date: evaluation.created_at.format("%Y-%m-%d").to_string(),
                final_score: score.final_score,
            });
            scores.push(score);
        }
    }

    let per_column: Vec<Vec<&StoredFrameworkScore>> = scores.iter().map(|score| vec![score]).collect();
    Ok(EvaluationComparison {
        weighting,
        columns,
        criteria: comparison_rows(&per_column),
    })
}

/// Compare frameworks across every stored evaluation of each, using priority-weighted scores.
pub fn compare_frameworks(
    rows: &StoredRows,
    names: &[String],
) -> Result<FrameworkComparison, ComparisonError> {
    let mut seen = HashSet::new();
    let selected: Vec<&str> = names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty() && seen.insert(name.to_string()))
        .collect();
    if selected.len() < MINIMUM_SELECTIONS {
        return Err(ComparisonError::TooFewSelections);
    }

    let all_scores: Vec<StoredFrameworkScore> = rows
        .evaluations()
        .iter()
        .flat_map(|evaluation| rows.framework_scores(evaluation, SubcriterionWeighting::Prioritized))
        .collect();

    let mut columns = Vec::new();
    let mut per_column = Vec::new();
    for name in selected {
        let matching: Vec<&StoredFrameworkScore> = all_scores
            .iter()
            .filter(|score| score.framework == name)
            .collect();
        if matching.is_empty() {
            return Err(ComparisonError::UnknownFramework(name.to_string()));
        }
        columns.push(FrameworkColumn {
            framework: name.to_string(),
            evaluations: matching.len(),
            final_score: scoring::mean_of_scores(matching.iter().map(|score| score.final_score)),
        });
        per_column.push(matching);
    }

    Ok(FrameworkComparison {
        columns,
        criteria: comparison_rows(&per_column),
    })
}

/// Criterion and subcriterion rows in first-seen order; each cell averages its column's scores.
fn comparison_rows(per_column: &[Vec<&StoredFrameworkScore>]) -> Vec<ComparisonRow> {
    let mut titles: Vec<(String, Vec<String>)> = Vec::new();
    for score in per_column.iter().flatten() {
        for criterion in &score.criteria {
            let position = match titles.iter().position(|(title, _)| *title == criterion.title) {
                Some(position) => position,
                None => {
                    titles.push((criterion.title.clone(), Vec::new()));
                    titles.len() - 1
                }
            };
            let subtitles = &mut titles[position].1;
            for sub in &criterion.subcriteria {
                if !subtitles.contains(&sub.title) {
                    subtitles.push(sub.title.clone());
                }
            }
        }
    }

    titles
        .into_iter()
        .map(|(title, subtitles)| {
            let scores = per_column
                .iter()
                .map(|column| {
                    mean_if_any(
                        column
                            .iter()
                            .flat_map(|score| score.criteria.iter())
                            .filter(|criterion| criterion.title == title)
                            .map(|criterion| criterion.score),
                    )
                })
                .collect();

            let subcriteria = subtitles
                .into_iter()
                .map(|subtitle| {
                    let scores = per_column
                        .iter()
                        .map(|column| {
                            mean_if_any(
                                column
                                    .iter()
                                    .flat_map(|score| score.criteria.iter())
                                    .filter(|criterion| criterion.title == title)
                                    .flat_map(|criterion| criterion.subcriteria.iter())
                                    .filter(|sub| sub.title == subtitle)
                                    .map(|sub| sub.score),
                            )
                        })
                        .collect();
                    SubcriterionComparisonRow {
                        title: subtitle,
                        scores,
                    }
                })
                .collect();

            ComparisonRow {
                title,
                scores,
                subcriteria,
            }
        })
        .collect()
}

fn mean_if_any<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let values: Vec<f64> = values.into_iter().collect();
    if values.is_empty() {
        None
    } else {
        Some(scoring::mean_of_scores(values))
    }
}
