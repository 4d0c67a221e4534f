use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use super::{
    CriterionRecord, CriterionRowId, EvaluationId, EvaluationRecord, NewEvaluation, NewUser,
    RecordStore, StoreError, SubcriterionRecord, SubcriterionRowId, UserId, UserRecord,
};

/// Full contents of a store, in the shape written to disk by file-backed deployments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default, alias = "usuarios")]
    pub users: Vec<UserRecord>,
    #[serde(default, alias = "avaliacoes")]
    pub evaluations: Vec<EvaluationRecord>,
    #[serde(default, alias = "criterios")]
    pub criteria: Vec<CriterionRecord>,
    #[serde(default, alias = "subcriterios")]
    pub subcriteria: Vec<SubcriterionRecord>,
    #[serde(default)]
    pub next_id: u64,
}

impl StoreSnapshot {
    fn highest_id(&self) -> u64 {
        let users = self.users.iter().map(|user| user.id.0);
        let evaluations = self.evaluations.iter().map(|evaluation| evaluation.id.0);
        let criteria = self.criteria.iter().map(|criterion| criterion.id.0);
        let subcriteria = self.subcriteria.iter().map(|sub| sub.id.0);
        users
            .chain(evaluations)
            .chain(criteria)
            .chain(subcriteria)
            .max()
            .unwrap_or(0)
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn identity_taken(&self, username: &str, email: &str, except: Option<UserId>) -> bool {
        self.users.iter().any(|user| {
            Some(user.id) != except
                && (user.username == username || user.email.eq_ignore_ascii_case(email))
        })
    }
}

/// Mutex-guarded store; every trait call holds the lock for its whole duration.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    state: Mutex<StoreSnapshot>,
}

impl MemoryRecordStore {
    pub fn from_snapshot(mut snapshot: StoreSnapshot) -> Self {
        snapshot.next_id = snapshot.next_id.max(snapshot.highest_id());
        Self {
            state: Mutex::new(snapshot),
        }
    }

    pub fn snapshot(&self) -> Result<StoreSnapshot, StoreError> {
        Ok(self.lock()?.clone())
    }

    /// Replace the whole contents, e.g. to undo a write that could not be persisted.
    pub fn restore(&self, snapshot: StoreSnapshot) -> Result<(), StoreError> {
        *self.lock()? = snapshot;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreSnapshot>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl RecordStore for MemoryRecordStore {
    fn insert_user(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let mut state = self.lock()?;
        if state.identity_taken(&user.username, &user.email, None) {
            return Err(StoreError::Conflict(
                "username or email already registered".to_string(),
            ));
        }

        let record = UserRecord {
            id: UserId(state.allocate()),
            name: user.name,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            company: user.company,
            role: user.role,
            created_at: user.created_at,
        };
        state.users.push(record.clone());
        Ok(record)
    }

    fn update_user(&self, user: UserRecord) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.identity_taken(&user.username, &user.email, Some(user.id)) {
            return Err(StoreError::Conflict(
                "username or email already registered".to_string(),
            ));
        }

        let slot = state
            .users
            .iter_mut()
            .find(|existing| existing.id == user.id)
            .ok_or(StoreError::NotFound)?;
        *slot = user;
        Ok(())
    }

    fn fetch_user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let state = self.lock()?;
        Ok(state.users.iter().find(|user| user.id == id).cloned())
    }

    fn find_user(&self, identifier: &str) -> Result<Option<UserRecord>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .users
            .iter()
            .find(|user| user.username == identifier || user.email == identifier)
            .cloned())
    }

    fn users(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self.lock()?.users.clone())
    }

    fn insert_evaluation(
        &self,
        evaluation: NewEvaluation,
    ) -> Result<EvaluationRecord, StoreError> {
        let mut state = self.lock()?;

        let record = EvaluationRecord {
            id: EvaluationId(state.allocate()),
            owner: evaluation.owner,
            display_name: evaluation.display_name,
            frameworks: evaluation.frameworks,
            created_at: evaluation.created_at,
            snapshot: evaluation.snapshot,
        };

        let mut criteria = Vec::with_capacity(evaluation.criteria.len());
        let mut subcriteria = Vec::new();
        for criterion in evaluation.criteria {
            let criterion_id = CriterionRowId(state.allocate());
            for sub in criterion.subcriteria {
                subcriteria.push(SubcriterionRecord {
                    id: SubcriterionRowId(state.allocate()),
                    criterion_id,
                    title: sub.title,
                    score: sub.score,
                    priority: Some(sub.priority),
                });
            }
            criteria.push(CriterionRecord {
                id: criterion_id,
                evaluation_id: record.id,
                framework: criterion.framework,
                title: criterion.title,
                priority: Some(criterion.priority),
                score: criterion.score,
            });
        }

        state.evaluations.push(record.clone());
        state.criteria.extend(criteria);
        state.subcriteria.extend(subcriteria);
        Ok(record)
    }

    fn fetch_evaluation(&self, id: EvaluationId) -> Result<Option<EvaluationRecord>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .evaluations
            .iter()
            .find(|evaluation| evaluation.id == id)
            .cloned())
    }

    fn evaluations(&self, owner: Option<UserId>) -> Result<Vec<EvaluationRecord>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .evaluations
            .iter()
            .filter(|evaluation| owner.map_or(true, |owner| evaluation.owner == owner))
            .cloned()
            .collect())
    }

    fn delete_evaluation(&self, id: EvaluationId) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let before = state.evaluations.len();
        state.evaluations.retain(|evaluation| evaluation.id != id);
        if state.evaluations.len() == before {
            return Err(StoreError::NotFound);
        }

        let removed: Vec<CriterionRowId> = state
            .criteria
            .iter()
            .filter(|criterion| criterion.evaluation_id == id)
            .map(|criterion| criterion.id)
            .collect();
        state.criteria.retain(|criterion| criterion.evaluation_id != id);
        state
            .subcriteria
            .retain(|sub| !removed.contains(&sub.criterion_id));
        Ok(())
    }

    fn criteria(&self) -> Result<Vec<CriterionRecord>, StoreError> {
        Ok(self.lock()?.criteria.clone())
    }

    fn subcriteria(&self) -> Result<Vec<SubcriterionRecord>, StoreError> {
        Ok(self.lock()?.subcriteria.clone())
    }
}
