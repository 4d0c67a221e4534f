//! Record store boundary: users, evaluations, and the per-evaluation criterion/subcriterion rows.

mod memory;

pub use memory::{MemoryRecordStore, StoreSnapshot};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! record_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(UserId);
record_id!(EvaluationId);
record_id!(CriterionRowId);
record_id!(SubcriterionRowId);

/// Single role flag; legacy rows encode it as `roles_id` 1 (admin) or 3 (member).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Member,
    Administrator,
}

impl UserRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Member => "Member",
            Self::Administrator => "Administrator",
        }
    }

    pub const fn from_legacy_roles_id(value: u8) -> Self {
        match value {
            1 => Self::Administrator,
            _ => Self::Member,
        }
    }

    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Administrator)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyAffiliation {
    pub company_name: String,
    pub sector: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "UserRow")]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub company: Option<CompanyAffiliation>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// On-disk user row. Accepts both the current layout and the legacy `usuarios`
/// columns (`roles_id`, flat `is_part_of_company`/`company_name`/`sector`).
#[derive(Deserialize)]
struct UserRow {
    id: UserId,
    #[serde(alias = "nome")]
    name: String,
    username: String,
    email: String,
    #[serde(alias = "senha")]
    password_hash: String,
    #[serde(default)]
    company: Option<CompanyAffiliation>,
    #[serde(default)]
    is_part_of_company: Option<bool>,
    #[serde(default)]
    company_name: Option<String>,
    #[serde(default)]
    sector: Option<String>,
    #[serde(default)]
    role: Option<UserRole>,
    #[serde(default)]
    roles_id: Option<u8>,
    #[serde(alias = "criado_em")]
    created_at: DateTime<Utc>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        let flat_company = match (row.is_part_of_company, row.company_name, row.sector) {
            (Some(false), _, _) | (None, None, None) => None,
            (_, company_name, sector) => Some(CompanyAffiliation {
                company_name: company_name.unwrap_or_default(),
                sector: sector.unwrap_or_default(),
            }),
        };
        let role = row
            .role
            .or_else(|| row.roles_id.map(UserRole::from_legacy_roles_id))
            .unwrap_or(UserRole::Member);

        Self {
            id: row.id,
            name: row.name,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            company: row.company.or(flat_company),
            role,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub company: Option<CompanyAffiliation>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub id: EvaluationId,
    #[serde(alias = "usuario_id")]
    pub owner: UserId,
    #[serde(alias = "nome_framework")]
    pub display_name: String,
    #[serde(default)]
    pub frameworks: Vec<String>,
    #[serde(alias = "data_avaliacao")]
    pub created_at: DateTime<Utc>,
    /// Serialized rubric as answered; parsed lazily because old rows may be malformed.
    #[serde(alias = "dados")]
    pub snapshot: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionRecord {
    pub id: CriterionRowId,
    #[serde(alias = "avaliacao_id")]
    pub evaluation_id: EvaluationId,
    /// Empty on legacy rows, which scored every framework of the evaluation together.
    #[serde(default)]
    pub framework: String,
    #[serde(alias = "titulo")]
    pub title: String,
    #[serde(alias = "peso", default)]
    pub priority: Option<String>,
    #[serde(alias = "nota_final")]
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubcriterionRecord {
    pub id: SubcriterionRowId,
    #[serde(alias = "criterio_id")]
    pub criterion_id: CriterionRowId,
    #[serde(alias = "titulo")]
    pub title: String,
    #[serde(alias = "nota")]
    pub score: f64,
    #[serde(alias = "peso", default)]
    pub priority: Option<String>,
}

/// Everything one submission writes, handed to the store in a single call.
#[derive(Debug, Clone)]
pub struct NewEvaluation {
    pub owner: UserId,
    pub display_name: String,
    pub frameworks: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub snapshot: String,
    pub criteria: Vec<NewCriterion>,
}

#[derive(Debug, Clone)]
pub struct NewCriterion {
    pub framework: String,
    pub title: String,
    pub priority: String,
    pub score: f64,
    pub subcriteria: Vec<NewSubcriterion>,
}

#[derive(Debug, Clone)]
pub struct NewSubcriterion {
    pub title: String,
    pub score: f64,
    pub priority: String,
}

/// Storage abstraction so the services can be exercised in isolation.
///
/// `insert_evaluation` must be all-or-nothing: either the evaluation and every criterion and
/// subcriterion row become visible, or none of them do.
pub trait RecordStore: Send + Sync {
    fn insert_user(&self, user: NewUser) -> Result<UserRecord, StoreError>;
    fn update_user(&self, user: UserRecord) -> Result<(), StoreError>;
    fn fetch_user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError>;
    /// Matches either the username or the e-mail address.
    fn find_user(&self, identifier: &str) -> Result<Option<UserRecord>, StoreError>;
    fn users(&self) -> Result<Vec<UserRecord>, StoreError>;

    fn insert_evaluation(&self, evaluation: NewEvaluation)
        -> Result<EvaluationRecord, StoreError>;
    fn fetch_evaluation(&self, id: EvaluationId) -> Result<Option<EvaluationRecord>, StoreError>;
    fn evaluations(&self, owner: Option<UserId>) -> Result<Vec<EvaluationRecord>, StoreError>;
    /// Removes the evaluation together with its criterion and subcriterion rows.
    fn delete_evaluation(&self, id: EvaluationId) -> Result<(), StoreError>;

    fn criteria(&self) -> Result<Vec<CriterionRecord>, StoreError>;
    fn subcriteria(&self) -> Result<Vec<SubcriterionRecord>, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
