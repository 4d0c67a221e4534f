use std::collections::HashMap;

use serde::Serialize;

use crate::scoring::{self, SubcriterionWeighting};
use crate::store::{
    CriterionRecord, CriterionRowId, EvaluationId, EvaluationRecord, RecordStore, StoreError,
    SubcriterionRecord, UserId, UserRecord,
};

pub const UNKNOWN_USER: &str = "Unknown";

/// Persisted rows indexed for read-time scoring.
///
/// Scores are always recomputed from the criterion and subcriterion rows, never taken from the
/// serialized snapshot, so rankings reflect exactly what was stored.
#[derive(Debug, Clone, Default)]
pub struct StoredRows {
    evaluations: Vec<EvaluationRecord>,
    criteria_by_evaluation: HashMap<EvaluationId, Vec<CriterionRecord>>,
    subcriteria_by_criterion: HashMap<CriterionRowId, Vec<SubcriterionRecord>>,
    user_names: HashMap<UserId, String>,
}

impl StoredRows {
    pub fn load<S>(store: &S) -> Result<Self, StoreError>
    where
        S: RecordStore + ?Sized,
    {
        Ok(Self::from_parts(
            store.evaluations(None)?,
            store.criteria()?,
            store.subcriteria()?,
            store.users()?,
        ))
    }

    pub fn from_parts(
        mut evaluations: Vec<EvaluationRecord>,
        criteria: Vec<CriterionRecord>,
        subcriteria: Vec<SubcriterionRecord>,
        users: Vec<UserRecord>,
    ) -> Self {
        evaluations.sort_by_key(|evaluation| evaluation.id);

        let mut criteria_by_evaluation: HashMap<EvaluationId, Vec<CriterionRecord>> =
            HashMap::new();
        for criterion in criteria {
            criteria_by_evaluation
                .entry(criterion.evaluation_id)
                .or_default()
                .push(criterion);
        }
        for rows in criteria_by_evaluation.values_mut() {
            rows.sort_by_key(|criterion| criterion.id);
        }

        let mut subcriteria_by_criterion: HashMap<CriterionRowId, Vec<SubcriterionRecord>> =
            HashMap::new();
        for subcriterion in subcriteria {
            subcriteria_by_criterion
                .entry(subcriterion.criterion_id)
                .or_default()
                .push(subcriterion);
        }
        for rows in subcriteria_by_criterion.values_mut() {
            rows.sort_by_key(|subcriterion| subcriterion.id);
        }

        let user_names = users
            .into_iter()
            .map(|user| (user.id, user.name))
            .collect();

        Self {
            evaluations,
            criteria_by_evaluation,
            subcriteria_by_criterion,
            user_names,
        }
    }

    pub fn evaluations(&self) -> &[EvaluationRecord] {
        &self.evaluations
    }

    pub fn evaluation(&self, id: EvaluationId) -> Option<&EvaluationRecord> {
        self.evaluations.iter().find(|evaluation| evaluation.id == id)
    }

    pub fn owner_name(&self, owner: UserId) -> &str {
        self.user_names
            .get(&owner)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_USER)
    }

    /// One score per framework evaluated in `evaluation`, in submission order.
    ///
    /// Rows written before criteria carried a framework name are scored together under the
    /// evaluation's display name.
    pub fn framework_scores(
        &self,
        evaluation: &EvaluationRecord,
        weighting: SubcriterionWeighting,
    ) -> Vec<StoredFrameworkScore> {
        let Some(rows) = self.criteria_by_evaluation.get(&evaluation.id) else {
            return Vec::new();
        };

        let mut grouped: Vec<(String, Vec<StoredCriterionScore>)> = Vec::new();
        for criterion in rows {
            let framework = if criterion.framework.trim().is_empty() {
                evaluation.display_name.clone()
            } else {
                criterion.framework.clone()
            };
            let scored = self.criterion_score(criterion, weighting);
            match grouped.iter_mut().find(|(name, _)| *name == framework) {
                Some((_, criteria)) => criteria.push(scored),
                None => grouped.push((framework, vec![scored])),
            }
        }

        grouped
            .into_iter()
            .map(|(framework, criteria)| {
                let final_score = scoring::final_score(
                    criteria
                        .iter()
                        .map(|criterion| (criterion.score, criterion.priority.as_deref())),
                );
                StoredFrameworkScore {
                    evaluation_id: evaluation.id,
                    framework,
                    criteria,
                    final_score,
                }
            })
            .collect()
    }

    fn criterion_score(
        &self,
        criterion: &CriterionRecord,
        weighting: SubcriterionWeighting,
    ) -> StoredCriterionScore {
        let subcriteria = self
            .subcriteria_by_criterion
            .get(&criterion.id)
            .map(Vec::as_slice)
            .unwrap_or_default();

        // Without subcriterion rows the stored criterion score is all there is.
        let score = if subcriteria.is_empty() {
            scoring::round_to_cents(criterion.score)
        } else {
            scoring::criterion_score(
                subcriteria
                    .iter()
                    .map(|sub| (sub.score, sub.priority.as_deref())),
                weighting,
            )
        };

        StoredCriterionScore {
            title: criterion.title.clone(),
            priority: criterion.priority.clone(),
            score,
            subcriteria: subcriteria
                .iter()
                .map(|sub| StoredSubcriterionScore {
                    title: sub.title.clone(),
                    score: sub.score,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredFrameworkScore {
    pub evaluation_id: EvaluationId,
    pub framework: String,
    pub criteria: Vec<StoredCriterionScore>,
    pub final_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredCriterionScore {
    pub title: String,
    pub priority: Option<String>,
    pub score: f64,
    pub subcriteria: Vec<StoredSubcriterionScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredSubcriterionScore {
    pub title: String,
    pub score: f64,
}
