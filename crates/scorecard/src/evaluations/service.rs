use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::comparison::{self, ComparisonError, EvaluationComparison, FrameworkComparison};
use super::draft::{DraftEdit, DraftError, EvaluationDraft, SubmissionError, ValidationError};
use super::ranking::{self, FrameworkAverage, RankingEntry, RankingSort};
use super::report::{self, ExportError, ReportDocument};
use super::snapshot::{FrameworkScore, RubricSnapshot, SnapshotError};
use super::stored::StoredRows;
use crate::accounts::UserSummary;
use crate::rubric::Priority;
use crate::scoring::SubcriterionWeighting;
use crate::store::{EvaluationId, EvaluationRecord, RecordStore, StoreError, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftId(pub u64);

impl std::fmt::Display for DraftId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "draft-{:06}", self.0)
    }
}

/// Framework-set setup that opens a draft.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftSetup {
    #[serde(default)]
    pub frameworks: Vec<String>,
    /// Pre-select this priority everywhere instead of leaving priorities blank.
    #[serde(default)]
    pub default_priority: Option<Priority>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DraftView {
    pub id: DraftId,
    pub display_name: String,
    pub frameworks: Vec<String>,
    pub missing_fields: usize,
    pub complete: bool,
    pub rubric: RubricSnapshot,
    pub preview: Vec<FrameworkScore>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationSummary {
    pub id: EvaluationId,
    pub display_name: String,
    pub frameworks: Vec<String>,
    pub owner: UserId,
    pub owner_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmittedEvaluation {
    pub evaluation: EvaluationSummary,
    pub scores: Vec<FrameworkScore>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankingView {
    pub weighting: SubcriterionWeighting,
    pub sort: RankingSort,
    pub entries: Vec<RankingEntry>,
}

struct DraftEntry {
    owner: UserId,
    draft: EvaluationDraft,
}

/// Service composing drafts, submission, read-time scoring, and reports over a record store.
pub struct EvaluationService<S> {
    store: Arc<S>,
    drafts: Mutex<HashMap<DraftId, DraftEntry>>,
    draft_sequence: AtomicU64,
}

impl<S> EvaluationService<S>
where
    S: RecordStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            drafts: Mutex::new(HashMap::new()),
            draft_sequence: AtomicU64::new(1),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn create_draft(
        &self,
        user: &UserSummary,
        setup: DraftSetup,
    ) -> Result<DraftView, EvaluationServiceError> {
        let mut draft = EvaluationDraft::new(&setup.frameworks)?;
        if let Some(priority) = setup.default_priority {
            draft.prefill_priorities(priority);
        }

        let id = DraftId(self.draft_sequence.fetch_add(1, Ordering::Relaxed));
        let view = draft_view(id, &draft);
        self.lock_drafts()?.insert(
            id,
            DraftEntry {
                owner: user.id,
                draft,
            },
        );
        debug!(%id, user_id = %user.id, "draft opened");
        Ok(view)
    }

    pub fn draft(&self, user: &UserSummary, id: DraftId) -> Result<DraftView, EvaluationServiceError> {
        let drafts = self.lock_drafts()?;
        let entry = owned_draft(&drafts, user, id)?;
        Ok(draft_view(id, &entry.draft))
    }

    /// Apply `edits` in order; if any is rejected the draft is left as it was.
    pub fn edit_draft(
        &self,
        user: &UserSummary,
        id: DraftId,
        edits: Vec<DraftEdit>,
    ) -> Result<DraftView, EvaluationServiceError> {
        let mut drafts = self.lock_drafts()?;
        let mut updated = owned_draft(&drafts, user, id)?.draft.clone();
        for edit in edits {
            updated.apply(edit)?;
        }
        let view = draft_view(id, &updated);
        if let Some(entry) = drafts.get_mut(&id) {
            entry.draft = updated;
        }
        Ok(view)
    }

    pub fn discard_draft(&self, user: &UserSummary, id: DraftId) -> Result<(), EvaluationServiceError> {
        let mut drafts = self.lock_drafts()?;
        owned_draft(&drafts, user, id)?;
        drafts.remove(&id);
        debug!(%id, user_id = %user.id, "draft discarded");
        Ok(())
    }

    /// Drop every open draft owned by `owner`, e.g. once they have no session left.
    pub fn discard_drafts_of(&self, owner: UserId) -> Result<usize, EvaluationServiceError> {
        let mut drafts = self.lock_drafts()?;
        let before = drafts.len();
        drafts.retain(|_, entry| entry.owner != owner);
        let dropped = before - drafts.len();
        if dropped > 0 {
            debug!(user_id = %owner, dropped, "drafts discarded");
        }
        Ok(dropped)
    }

    /// Validate and persist a draft; the draft is kept when validation or the write fails.
    pub fn submit_draft(
        &self,
        user: &UserSummary,
        id: DraftId,
    ) -> Result<SubmittedEvaluation, EvaluationServiceError> {
        let mut drafts = self.lock_drafts()?;
        let draft = owned_draft(&drafts, user, id)?.draft.clone();
        let submitted = self.persist(user, &draft)?;
        drafts.remove(&id);
        Ok(submitted)
    }

    /// Persist a complete rubric in one call, bypassing the draft registry.
    pub fn submit_snapshot(
        &self,
        user: &UserSummary,
        snapshot: &RubricSnapshot,
    ) -> Result<SubmittedEvaluation, EvaluationServiceError> {
        let draft = EvaluationDraft::from_snapshot(snapshot)?;
        self.persist(user, &draft)
    }

    fn persist(
        &self,
        user: &UserSummary,
        draft: &EvaluationDraft,
    ) -> Result<SubmittedEvaluation, EvaluationServiceError> {
        let evaluation = match draft.prepare_submission(user.id, Utc::now()) {
            Ok(evaluation) => evaluation,
            Err(err) => {
                warn!(user_id = %user.id, error = %err, "submission rejected");
                return Err(err.into());
            }
        };

        let record = self.store.insert_evaluation(evaluation).map_err(|err| {
            warn!(user_id = %user.id, error = %err, "failed to store evaluation");
            err
        })?;

        info!(
            evaluation_id = %record.id,
            user_id = %user.id,
            frameworks = record.frameworks.len(),
            "evaluation submitted"
        );

        Ok(SubmittedEvaluation {
            evaluation: summarize(&record, user.name.clone(), None),
            scores: draft.preview(),
        })
    }

    pub fn list_own(&self, user: &UserSummary) -> Result<Vec<EvaluationSummary>, EvaluationServiceError> {
        let records = self.store.evaluations(Some(user.id))?;
        Ok(records
            .iter()
            .map(|record| summarize(record, user.name.clone(), None))
            .collect())
    }

    /// Every evaluation joined with its owner's name and e-mail (administrators only).
    pub fn list_all(&self, user: &UserSummary) -> Result<Vec<EvaluationSummary>, EvaluationServiceError> {
        if !user.is_admin() {
            warn!(user_id = %user.id, "evaluation listing rejected");
            return Err(EvaluationServiceError::Forbidden);
        }

        let owners: HashMap<UserId, (String, String)> = self
            .store
            .users()?
            .into_iter()
            .map(|owner| (owner.id, (owner.name, owner.email)))
            .collect();

        Ok(self
            .store
            .evaluations(None)?
            .iter()
            .map(|record| match owners.get(&record.owner) {
                Some((name, email)) => summarize(record, name.clone(), Some(email.clone())),
                None => summarize(record, super::stored::UNKNOWN_USER.to_string(), None),
            })
            .collect())
    }

    pub fn delete(&self, user: &UserSummary, id: EvaluationId) -> Result<(), EvaluationServiceError> {
        let record = self.owned_record(user, id)?;
        self.store.delete_evaluation(record.id)?;
        info!(evaluation_id = %id, user_id = %user.id, "evaluation deleted");
        Ok(())
    }

    pub fn report(&self, user: &UserSummary, id: EvaluationId) -> Result<ReportDocument, EvaluationServiceError> {
        let record = self.owned_record(user, id)?;
        let snapshot = RubricSnapshot::parse(&record.snapshot).map_err(|err| {
            warn!(evaluation_id = %id, error = %err, "stored evaluation data unreadable");
            err
        })?;
        Ok(ReportDocument::from_snapshot(&snapshot))
    }

    pub fn report_csv(&self, user: &UserSummary, id: EvaluationId) -> Result<String, EvaluationServiceError> {
        let document = self.report(user, id)?;
        Ok(report::render_csv(&document)?)
    }

    pub fn report_text(&self, user: &UserSummary, id: EvaluationId) -> Result<String, EvaluationServiceError> {
        let document = self.report(user, id)?;
        Ok(report::render_text(&document))
    }

    pub fn rankings(
        &self,
        weighting: SubcriterionWeighting,
        sort: RankingSort,
    ) -> Result<RankingView, EvaluationServiceError> {
        let rows = StoredRows::load(self.store.as_ref())?;
        let mut entries = ranking::rank(&rows, weighting);
        sort.apply(&mut entries);
        debug!(
            entries = entries.len(),
            weighting = weighting.label(),
            direction = sort.direction.label(),
            "rankings computed"
        );
        Ok(RankingView {
            weighting,
            sort,
            entries,
        })
    }

    pub fn framework_rankings(
        &self,
        weighting: SubcriterionWeighting,
    ) -> Result<Vec<FrameworkAverage>, EvaluationServiceError> {
        let rows = StoredRows::load(self.store.as_ref())?;
        let averages = ranking::group_by_framework(&ranking::rank(&rows, weighting));
        debug!(frameworks = averages.len(), "framework averages computed");
        Ok(averages)
    }

    pub fn compare_evaluations(
        &self,
        ids: &[EvaluationId],
        weighting: SubcriterionWeighting,
    ) -> Result<EvaluationComparison, EvaluationServiceError> {
        let rows = StoredRows::load(self.store.as_ref())?;
        Ok(comparison::compare_evaluations(&rows, ids, weighting)?)
    }

    pub fn compare_frameworks(
        &self,
        names: &[String],
    ) -> Result<FrameworkComparison, EvaluationServiceError> {
        let rows = StoredRows::load(self.store.as_ref())?;
        Ok(comparison::compare_frameworks(&rows, names)?)
    }

    fn owned_record(
        &self,
        user: &UserSummary,
        id: EvaluationId,
    ) -> Result<EvaluationRecord, EvaluationServiceError> {
        let record = self
            .store
            .fetch_evaluation(id)?
            .ok_or(StoreError::NotFound)?;
        if record.owner != user.id && !user.is_admin() {
            warn!(evaluation_id = %id, user_id = %user.id, "access to foreign evaluation rejected");
            return Err(EvaluationServiceError::Forbidden);
        }
        Ok(record)
    }

    fn lock_drafts(&self) -> Result<MutexGuard<'_, HashMap<DraftId, DraftEntry>>, EvaluationServiceError> {
        self.drafts
            .lock()
            .map_err(|_| EvaluationServiceError::Unavailable("draft registry poisoned".to_string()))
    }
}

fn owned_draft<'a>(
    drafts: &'a HashMap<DraftId, DraftEntry>,
    user: &UserSummary,
    id: DraftId,
) -> Result<&'a DraftEntry, EvaluationServiceError> {
    drafts
        .get(&id)
        .filter(|entry| entry.owner == user.id)
        .ok_or(EvaluationServiceError::DraftNotFound(id))
}

fn draft_view(id: DraftId, draft: &EvaluationDraft) -> DraftView {
    let missing_fields = draft.missing_fields().len();
    DraftView {
        id,
        display_name: draft.display_name(),
        frameworks: draft.frameworks().to_vec(),
        missing_fields,
        complete: missing_fields == 0,
        rubric: draft.snapshot(),
        preview: draft.preview(),
    }
}

fn summarize(record: &EvaluationRecord, owner_name: String, owner_email: Option<String>) -> EvaluationSummary {
    let frameworks = if record.frameworks.is_empty() {
        record
            .display_name
            .split(", ")
            .map(str::to_string)
            .collect()
    } else {
        record.frameworks.clone()
    };

    EvaluationSummary {
        id: record.id,
        display_name: record.display_name.clone(),
        frameworks,
        owner: record.owner,
        owner_name,
        owner_email,
        created_at: record.created_at,
        date: record.created_at.format("%Y-%m-%d").to_string(),
    }
}

/// Error raised by the evaluation service.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationServiceError {
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Comparison(#[from] ComparisonError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0} not found")]
    DraftNotFound(DraftId),
    #[error("evaluation belongs to another user")]
    Forbidden,
    #[error("{0}")]
    Unavailable(String),
}

impl From<SubmissionError> for EvaluationServiceError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Incomplete(err) => Self::Validation(err),
            SubmissionError::Snapshot(err) => Self::Snapshot(err),
        }
    }
}
