use serde::Serialize;

use crate::rubric::Priority;

#[derive(Debug, Clone, Serialize)]
pub struct SubcriterionLine {
    pub title: String,
    pub score: Option<u8>,
    pub priority: Option<Priority>,
    pub priority_label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct CriterionSection {
    pub title: String,
    pub score: f64,
    pub score_display: String,
    pub priority: Option<Priority>,
    pub priority_label: &'static str,
    pub subcriteria: Vec<SubcriterionLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryLine {
    pub criterion: String,
    pub score_display: String,
    pub priority_label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameworkSection {
    pub framework: String,
    pub criteria: Vec<CriterionSection>,
    pub summary: Vec<SummaryLine>,
    pub final_score: f64,
    pub final_score_display: String,
}

/// Bar chart series: one dataset per framework over the shared criterion labels.
#[derive(Debug, Clone, Serialize)]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CriterionChart {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

pub(super) fn priority_label(priority: Option<Priority>) -> &'static str {
    priority.map(Priority::label).unwrap_or("")
}
