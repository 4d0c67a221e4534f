use metrics_exporter_prometheus::PrometheusHandle;
use scorecard::store::{
    CriterionRecord, EvaluationId, EvaluationRecord, MemoryRecordStore, NewEvaluation, NewUser,
    RecordStore, StoreError, StoreSnapshot, SubcriterionRecord, UserId, UserRecord,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Record store kept in memory and, when a data file is configured, rewritten to disk after
/// every write. A write that cannot be persisted is rolled back in memory as well.
pub(crate) struct FileRecordStore {
    path: Option<PathBuf>,
    inner: MemoryRecordStore,
    writes: Mutex<()>,
}

impl FileRecordStore {
    pub(crate) fn in_memory() -> Self {
        Self {
            path: None,
            inner: MemoryRecordStore::default(),
            writes: Mutex::new(()),
        }
    }

    /// Load `path` if it exists; a missing or empty file starts an empty store.
    pub(crate) fn open(path: PathBuf) -> Result<Self, StoreError> {
        let snapshot = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => StoreSnapshot::default(),
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|err| StoreError::Unavailable(format!("{}: {err}", path.display())))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => StoreSnapshot::default(),
            Err(err) => return Err(unavailable(&path, err)),
        };

        info!(
            path = %path.display(),
            users = snapshot.users.len(),
            evaluations = snapshot.evaluations.len(),
            "record store loaded"
        );

        Ok(Self {
            path: Some(path),
            inner: MemoryRecordStore::from_snapshot(snapshot),
            writes: Mutex::new(()),
        })
    }

    fn write<T>(
        &self,
        apply: impl FnOnce(&MemoryRecordStore) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self
            .writes
            .lock()
            .map_err(|_| StoreError::Unavailable("store writer poisoned".to_string()))?;

        let Some(path) = self.path.as_deref() else {
            return apply(&self.inner);
        };

        let before = self.inner.snapshot()?;
        let value = apply(&self.inner)?;
        if let Err(err) = self.persist(path) {
            warn!(path = %path.display(), error = %err, "failed to persist record store");
            self.inner.restore(before)?;
            return Err(err);
        }
        Ok(value)
    }

    fn persist(&self, path: &Path) -> Result<(), StoreError> {
        let snapshot = self.inner.snapshot()?;
        let encoded = serde_json::to_vec_pretty(&snapshot)
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        let staging = path.with_extension("tmp");
        fs::write(&staging, encoded).map_err(|err| unavailable(&staging, err))?;
        fs::rename(&staging, path).map_err(|err| unavailable(path, err))
    }
}

fn unavailable(path: &Path, err: io::Error) -> StoreError {
    StoreError::Unavailable(format!("{}: {err}", path.display()))
}

impl RecordStore for FileRecordStore {
    fn insert_user(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        self.write(|store| store.insert_user(user))
    }

    fn update_user(&self, user: UserRecord) -> Result<(), StoreError> {
        self.write(|store| store.update_user(user))
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

    fn insert_evaluation(&self, evaluation: NewEvaluation) -> Result<EvaluationRecord, StoreError> {
        self.write(|store| store.insert_evaluation(evaluation))
    }

    fn fetch_evaluation(&self, id: EvaluationId) -> Result<Option<EvaluationRecord>, StoreError> {
        self.inner.fetch_evaluation(id)
    }

    fn evaluations(&self, owner: Option<UserId>) -> Result<Vec<EvaluationRecord>, StoreError> {
        self.inner.evaluations(owner)
    }

    fn delete_evaluation(&self, id: EvaluationId) -> Result<(), StoreError> {
        self.write(|store| store.delete_evaluation(id))
    }

    fn criteria(&self) -> Result<Vec<CriterionRecord>, StoreError> {
        self.inner.criteria()
    }

    fn subcriteria(&self) -> Result<Vec<SubcriterionRecord>, StoreError> {
        self.inner.subcriteria()
    }
}
