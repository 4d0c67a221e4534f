use serde::{Deserialize, Serialize};

use crate::store::{CompanyAffiliation, UserId, UserRecord, UserRole};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub part_of_company: bool,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
}

/// Credentials; `identifier` is either the username or the e-mail address.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default, alias = "username", alias = "email")]
    pub identifier: String,
    #[serde(default)]
    pub password: String,
}

/// Administrator edit of a user's identity fields; omitted fields stay unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
}

/// Public view of a user; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub email: String,
    pub company: Option<CompanyAffiliation>,
    pub role: UserRole,
    pub role_label: &'static str,
}

impl UserSummary {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<&UserRecord> for UserSummary {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            username: record.username.clone(),
            email: record.email.clone(),
            company: record.company.clone(),
            role: record.role,
            role_label: record.role.label(),
        }
    }
}
