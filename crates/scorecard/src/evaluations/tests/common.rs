use std::sync::Arc;

use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::accounts::UserSummary;
use crate::evaluations::draft::{CellKey, EvaluationDraft};
use crate::evaluations::service::EvaluationService;
use crate::rubric::{CriterionId, Priority, RubricTemplate, Score, SUBCRITERIA_PER_CRITERION};
use crate::store::{
    CriterionRecord, CriterionRowId, EvaluationId, EvaluationRecord, MemoryRecordStore,
    NewEvaluation, NewUser, RecordStore, StoreError, SubcriterionRecord, SubcriterionRowId,
    UserId, UserRecord, UserRole,
};

pub(super) fn register(store: &MemoryRecordStore, name: &str, role: UserRole) -> UserSummary {
    let record = store
        .insert_user(NewUser {
            name: name.to_string(),
            username: name.to_lowercase(),
            email: format!("{}@example.com", name.to_lowercase()),
            password_hash: "unused".to_string(),
            company: None,
            role,
            created_at: Utc::now(),
        })
        .expect("user inserted");
    UserSummary::from(&record)
}

pub(super) struct Fixture {
    pub store: Arc<MemoryRecordStore>,
    pub service: EvaluationService<MemoryRecordStore>,
    pub ana: UserSummary,
    pub bruno: UserSummary,
    pub admin: UserSummary,
}

pub(super) fn fixture() -> Fixture {
    let store = Arc::new(MemoryRecordStore::default());
    let ana = register(&store, "Ana", UserRole::Member);
    let bruno = register(&store, "Bruno", UserRole::Member);
    let admin = register(&store, "Root", UserRole::Administrator);
    let service = EvaluationService::new(Arc::clone(&store));
    Fixture {
        store,
        service,
        ana,
        bruno,
        admin,
    }
}

/// Every cell answered with `value`, every priority `priority`.
pub(super) fn complete_draft(frameworks: &[&str], value: u8, priority: Priority) -> EvaluationDraft {
    let mut draft = EvaluationDraft::new(frameworks.iter().copied()).expect("valid setup");
    draft.prefill_priorities(priority);
    for framework in 0..frameworks.len() {
        for criterion in RubricTemplate::standard().criteria() {
            for subcriterion in 0..SUBCRITERIA_PER_CRITERION {
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
}

/// A draft whose scores and priorities vary so weighted and plain means diverge.
pub(super) fn varied_draft(frameworks: &[&str]) -> EvaluationDraft {
    let mut draft = complete_draft(frameworks, 3, Priority::Medium);
    let priorities = Priority::ordered();
    for framework in 0..frameworks.len() {
        for criterion in RubricTemplate::standard().criteria() {
            let CriterionId(id) = criterion.id;
            draft
                .set_criterion_priority(
                    framework,
                    criterion.id,
                    Some(priorities[(usize::from(id) + framework) % 3]),
                )
                .expect("criterion exists");
            for subcriterion in 0..SUBCRITERIA_PER_CRITERION {
                let cell = CellKey {
                    framework,
                    criterion: criterion.id,
                    subcriterion,
                };
                let value = ((usize::from(id) + subcriterion + framework) % 5) as u8 + 1;
                draft
                    .set_score(cell, Score::new(value).ok())
                    .expect("cell exists");
                draft
                    .set_subcriterion_priority(cell, Some(priorities[subcriterion % 3]))
                    .expect("cell exists");
            }
        }
    }
    draft
}

pub(super) fn at(day: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

/// Hand-built stored rows: one evaluation whose criteria carry `(priority, [scores])`.
pub(super) struct StoredEvaluation<'a> {
    pub id: u64,
    pub owner: u64,
    pub framework: &'a str,
    pub day: u32,
    pub criteria: Vec<(&'a str, Vec<(f64, &'a str)>)>,
}

pub(super) fn stored_rows(
    evaluations: &[StoredEvaluation<'_>],
    users: Vec<UserRecord>,
) -> crate::evaluations::StoredRows {
    let mut records = Vec::new();
    let mut criteria = Vec::new();
    let mut subcriteria = Vec::new();
    let mut next_row = 1000;

    for evaluation in evaluations {
        records.push(EvaluationRecord {
            id: EvaluationId(evaluation.id),
            owner: UserId(evaluation.owner),
            display_name: evaluation.framework.to_string(),
            frameworks: vec![evaluation.framework.to_string()],
            created_at: at(evaluation.day),
            snapshot: String::new(),
        });
        for (index, (priority, subs)) in evaluation.criteria.iter().enumerate() {
            next_row += 1;
            let criterion_id = CriterionRowId(next_row);
            criteria.push(CriterionRecord {
                id: criterion_id,
                evaluation_id: EvaluationId(evaluation.id),
                framework: evaluation.framework.to_string(),
                title: format!("Criterion {}", index + 1),
                priority: Some((*priority).to_string()),
                score: 0.0,
            });
            for (sub_index, (score, sub_priority)) in subs.iter().enumerate() {
                next_row += 1;
                subcriteria.push(SubcriterionRecord {
                    id: SubcriterionRowId(next_row),
                    criterion_id,
                    title: format!("Subcriterion {}", sub_index + 1),
                    score: *score,
                    priority: Some((*sub_priority).to_string()),
                });
            }
        }
    }

    crate::evaluations::StoredRows::from_parts(records, criteria, subcriteria, users)
}

pub(super) fn user_record(id: u64, name: &str) -> UserRecord {
    UserRecord {
        id: UserId(id),
        name: name.to_string(),
        username: name.to_lowercase(),
        email: format!("{}@example.com", name.to_lowercase()),
        password_hash: String::new(),
        company: None,
        role: UserRole::Member,
        created_at: at(1),
    }
}

/// Store double whose evaluation write always fails.
#[derive(Default)]
pub(super) struct UnavailableStore {
    pub inner: MemoryRecordStore,
}

impl RecordStore for UnavailableStore {
    fn insert_user(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        self.inner.insert_user(user)
    }

    fn update_user(&self, user: UserRecord) -> Result<(), StoreError> {
        self.inner.update_user(user)
    }

    fn fetch_user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        self.inner.fetch_user(id)
    }

    fn find_user(&self, identifier: &str) -> Result<Option<UserRecord>, StoreError> {
        self.inner.find_user(identifier)
    }

    fn users(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.inner.users()
    }

    fn insert_evaluation(&self, _evaluation: NewEvaluation) -> Result<EvaluationRecord, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn fetch_evaluation(&self, id: EvaluationId) -> Result<Option<EvaluationRecord>, StoreError> {
        self.inner.fetch_evaluation(id)
    }

    fn evaluations(&self, owner: Option<UserId>) -> Result<Vec<EvaluationRecord>, StoreError> {
        self.inner.evaluations(owner)
    }

    fn delete_evaluation(&self, id: EvaluationId) -> Result<(), StoreError> {
        self.inner.delete_evaluation(id)
    }

    fn criteria(&self) -> Result<Vec<CriterionRecord>, StoreError> {
        self.inner.criteria()
    }

    fn subcriteria(&self) -> Result<Vec<SubcriterionRecord>, StoreError> {
        self.inner.subcriteria()
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
