use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stored::StoredRows;
use crate::scoring::{self, SubcriterionWeighting};
use crate::store::{EvaluationId, UserId};

/// One ranked (evaluation, framework) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub position: usize,
    pub evaluation_id: EvaluationId,
    pub framework: String,
    pub evaluation_name: String,
    pub average_score: f64,
    pub average_score_display: String,
    pub owner: UserId,
    pub user: String,
    pub created_at: DateTime<Utc>,
    pub date: String,
}

/// Rank every stored framework score, best first; ties keep submission order.
pub fn rank(rows: &StoredRows, weighting: SubcriterionWeighting) -> Vec<RankingEntry> {
    let mut entries: Vec<RankingEntry> = rows
        .evaluations()
        .iter()
        .flat_map(|evaluation| {
            rows.framework_scores(evaluation, weighting)
                .into_iter()
                .map(move |score| RankingEntry {
                    position: 0,
                    evaluation_id: evaluation.id,
                    framework: score.framework,
                    evaluation_name: evaluation.display_name.clone(),
                    average_score: score.final_score,
                    average_score_display: scoring::format_score(score.final_score),
                    owner: evaluation.owner,
                    user: rows.owner_name(evaluation.owner).to_string(),
                    created_at: evaluation.created_at,
                    date: evaluation.created_at.format("%Y-%m-%d").to_string(),
                })
        })
        .collect();

    entries.sort_by(|a, b| compare_scores(b.average_score, a.average_score));
    renumber(&mut entries);
    entries
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingColumn {
    Framework,
    AverageScore,
    User,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[serde(alias = "asc")]
    Ascending,
    #[serde(alias = "desc")]
    Descending,
}

impl SortDirection {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

/// Interactive column sort for the ranking table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingSort {
    pub column: RankingColumn,
    pub direction: SortDirection,
}

impl Default for RankingSort {
    fn default() -> Self {
        Self {
            column: RankingColumn::AverageScore,
            direction: SortDirection::Descending,
        }
    }
}

impl RankingSort {
    /// Clicking the ascending column flips it to descending; anything else sorts ascending.
    pub fn toggle(self, column: RankingColumn) -> Self {
        let direction = if self.column == column && self.direction == SortDirection::Ascending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        Self { column, direction }
    }

    /// Stable sort of `entries`; positions follow the displayed order.
    pub fn apply(&self, entries: &mut [RankingEntry]) {
        entries.sort_by(|a, b| {
            let ordering = match self.column {
                RankingColumn::Framework => a.framework.cmp(&b.framework),
                RankingColumn::AverageScore => compare_scores(a.average_score, b.average_score),
                RankingColumn::User => a.user.cmp(&b.user),
                RankingColumn::Date => a.created_at.cmp(&b.created_at),
            };
            match self.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
        renumber(entries);
    }
}

/// Alternate dashboard row: every evaluation of one framework averaged together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameworkAverage {
    pub position: usize,
    pub framework: String,
    pub evaluations: usize,
    pub average_score: f64,
    pub average_score_display: String,
}

pub fn group_by_framework(entries: &[RankingEntry]) -> Vec<FrameworkAverage> {
    let mut groups: Vec<(String, Vec<f64>)> = Vec::new();
    for entry in entries {
        match groups.iter_mut().find(|(name, _)| *name == entry.framework) {
            Some((_, scores)) => scores.push(entry.average_score),
            None => groups.push((entry.framework.clone(), vec![entry.average_score])),
        }
    }

    let mut averages: Vec<FrameworkAverage> = groups
        .into_iter()
        .map(|(framework, scores)| {
            let evaluations = scores.len();
            let average_score = scoring::mean_of_scores(scores);
            FrameworkAverage {
                position: 0,
                framework,
                evaluations,
                average_score,
                average_score_display: scoring::format_score(average_score),
            }
        })
        .collect();

    averages.sort_by(|a, b| compare_scores(b.average_score, a.average_score));
    for (index, average) in averages.iter_mut().enumerate() {
        average.position = index + 1;
    }
    averages
}

fn compare_scores(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn renumber(entries: &mut [RankingEntry]) {
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.position = index + 1;
    }
}
