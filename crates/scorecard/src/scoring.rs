//! Weighted-mean aggregation shared by the submission, report, and ranking paths.
//!
//! Every score in the system is produced by [`weighted_mean`]: subcriteria roll up into a
//! criterion score, criterion scores roll up into a framework's final score, and stored rows
//! are re-aggregated the same way when rankings are built.

use crate::rubric::Priority;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Numeric weight for a stored or submitted priority label.
///
/// Unknown and missing labels count as "Low Priority".
pub fn weight_for_label(label: Option<&str>) -> u32 {
    label
        .and_then(Priority::from_label)
        .map(Priority::weight)
        .unwrap_or(1)
}

/// `Σ(value·weight) / Σweight` rounded to two decimals; `0.0` when the weights sum to zero.
pub fn weighted_mean<I>(pairs: I) -> f64
where
    I: IntoIterator<Item = (f64, u32)>,
{
    let (weighted_sum, weight_total) = pairs.into_iter().fold(
        (0.0_f64, 0_u32),
        |(sum, total), (value, weight)| (sum + value * f64::from(weight), total + weight),
    );

    if weight_total == 0 {
        return 0.0;
    }

    round_to_cents(weighted_sum / f64::from(weight_total))
}

/// Rounds the exact stored binary value to cents, ties away from zero.
///
/// A sum that lands on `2.335` is stored as `2.33499…` and rounds down; an exact
/// tie such as `3.125` rounds up.
pub fn round_to_cents(value: f64) -> f64 {
    let Some(exact) = Decimal::from_f64_retain(value) else {
        return value;
    };
    let mut cents = exact.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    cents.rescale(2);
    cents.mantissa() as f64 / 100.0
}

/// Two-decimal rendering used everywhere a score is displayed.
pub fn format_score(value: f64) -> String {
    format!("{value:.2}")
}

/// How subcriterion priorities take part in a criterion score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubcriterionWeighting {
    /// Plain arithmetic mean; subcriterion priorities are ignored.
    #[default]
    Uniform,
    /// Each subcriterion counts with its priority weight.
    Prioritized,
}

impl SubcriterionWeighting {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::Prioritized => "prioritized",
        }
    }
}

/// Criterion-level score from `(score, priority label)` pairs.
pub fn criterion_score<'a, I>(subcriteria: I, weighting: SubcriterionWeighting) -> f64
where
    I: IntoIterator<Item = (f64, Option<&'a str>)>,
{
    weighted_mean(
        subcriteria
            .into_iter()
            .map(|(score, label)| match weighting {
                SubcriterionWeighting::Uniform => (score, 1),
                SubcriterionWeighting::Prioritized => (score, weight_for_label(label)),
            }),
    )
}

/// Framework-level score from `(criterion score, criterion priority label)` pairs.
pub fn final_score<'a, I>(criteria: I) -> f64
where
    I: IntoIterator<Item = (f64, Option<&'a str>)>,
{
    weighted_mean(
        criteria
            .into_iter()
            .map(|(score, label)| (score, weight_for_label(label))),
    )
}

/// Mean of already aggregated final scores (used when grouping by framework).
pub fn mean_of_scores<I>(scores: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    weighted_mean(scores.into_iter().map(|score| (score, 1)))
}
