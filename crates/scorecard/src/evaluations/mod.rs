//! Evaluation drafts, submission, read-time rankings, comparisons, and reports.
//!
//! Drafts hold answers against the static rubric until they validate; submission writes the
//! evaluation and all of its criterion and subcriterion rows in one store call. Everything
//! shown afterwards (rankings, comparisons) is recomputed from those stored rows.

pub mod comparison;
pub mod draft;
pub mod ranking;
pub mod report;
pub mod router;
pub mod service;
pub mod snapshot;
pub mod stored;

#[cfg(test)]
mod tests;

pub use comparison::{
    compare_evaluations, compare_frameworks, ComparisonError, EvaluationComparison,
    FrameworkComparison,
};
pub use draft::{
    CellAnswer, CellKey, DraftEdit, DraftError, EvaluationDraft, MissingField, SubmissionError,
    ValidationError, ValidationIssue,
};
pub use ranking::{
    group_by_framework, rank, FrameworkAverage, RankingColumn, RankingEntry, RankingSort,
    SortDirection,
};
pub use report::{ExportError, ReportDocument};
pub use router::evaluation_router;
pub use service::{
    DraftId, DraftSetup, DraftView, EvaluationService, EvaluationServiceError, EvaluationSummary,
    RankingView, SubmittedEvaluation,
};
pub use snapshot::{FrameworkScore, RubricSnapshot, SnapshotError};
pub use stored::StoredRows;
