use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{LoginRequest, SignupRequest, UserSummary, UserUpdate};
use super::password::{hash_password, verify_password};
use super::session::{Session, SessionError, SessionRegistry};
use crate::config::AdminBootstrap;
use crate::store::{CompanyAffiliation, NewUser, RecordStore, StoreError, UserId, UserRole};

/// Registration, login, and administrator user management.
pub struct AccountService<S> {
    store: Arc<S>,
    sessions: Arc<SessionRegistry>,
}

impl<S> AccountService<S>
where
    S: RecordStore + 'static,
{
    pub fn new(store: Arc<S>, sessions: Arc<SessionRegistry>) -> Self {
        Self { store, sessions }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn register(&self, request: SignupRequest) -> Result<UserSummary, AccountError> {
        let name = request.name.trim();
        let username = request.username.trim();
        let email = request.email.trim();
        if name.is_empty() || username.is_empty() || email.is_empty() || request.password.is_empty()
        {
            return Err(AccountError::MissingFields);
        }

        let company = if request.part_of_company {
            let company_name = non_blank(request.company_name.as_deref());
            let sector = non_blank(request.sector.as_deref());
            match (company_name, sector) {
                (Some(company_name), Some(sector)) => Some(CompanyAffiliation {
                    company_name,
                    sector,
                }),
                _ => return Err(AccountError::MissingCompanyDetails),
            }
        } else {
            None
        };

        let password_hash = hash_password(&request.password)
            .map_err(|err| AccountError::Credential(err.to_string()))?;

        let record = self.store.insert_user(NewUser {
            name: name.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            company,
            role: UserRole::Member,
            created_at: Utc::now(),
        })?;

        info!(user_id = %record.id, username = %record.username, "user registered");
        Ok(UserSummary::from(&record))
    }

    pub fn login(&self, request: LoginRequest) -> Result<Session, AccountError> {
        let identifier = request.identifier.trim();
        if identifier.is_empty() || request.password.is_empty() {
            return Err(AccountError::MissingCredentials);
        }

        let Some(mut record) = self.store.find_user(identifier)? else {
            warn!(identifier, "login rejected: unknown user");
            return Err(AccountError::UserNotFound);
        };

        match verify_password(&request.password, &record.password_hash) {
            Ok(true) => {}
            Ok(false) => {
                warn!(user_id = %record.id, "login rejected: incorrect password");
                return Err(AccountError::IncorrectPassword);
            }
            // Rows imported from the legacy tables still hold the plaintext password.
            Err(_) if record.password_hash == request.password => {
                record.password_hash = hash_password(&request.password)
                    .map_err(|err| AccountError::Credential(err.to_string()))?;
                self.store.update_user(record.clone())?;
                info!(user_id = %record.id, "legacy credential upgraded");
            }
            Err(_) => {
                warn!(user_id = %record.id, "login rejected: incorrect password");
                return Err(AccountError::IncorrectPassword);
            }
        }

        let session = self.sessions.open(UserSummary::from(&record))?;
        info!(user_id = %record.id, "user logged in");
        Ok(session)
    }

    /// Close the session behind `token`. Returns the user when that was their last open session.
    pub fn logout(&self, token: &str) -> Result<Option<UserId>, AccountError> {
        let Some(session) = self.sessions.resolve(token)? else {
            return Ok(None);
        };
        if !self.sessions.close(token)? {
            return Ok(None);
        }
        info!(user_id = %session.user.id, "session closed");

        if self.sessions.active_for(session.user.id)? == 0 {
            Ok(Some(session.user.id))
        } else {
            Ok(None)
        }
    }

    pub fn resolve(&self, token: Option<&str>) -> Result<Session, AccountError> {
        let token = token.ok_or(AccountError::Unauthenticated)?;
        self.sessions
            .resolve(token)?
            .ok_or(AccountError::Unauthenticated)
    }

    pub fn require_admin(&self, token: Option<&str>) -> Result<Session, AccountError> {
        let session = self.resolve(token)?;
        if !session.user.is_admin() {
            warn!(user_id = %session.user.id, "admin action rejected");
            return Err(AccountError::Forbidden);
        }
        Ok(session)
    }

    pub fn list_users(&self, session: &Session) -> Result<Vec<UserSummary>, AccountError> {
        ensure_admin(session)?;
        let users = self.store.users()?;
        Ok(users.iter().map(UserSummary::from).collect())
    }

    pub fn update_user(
        &self,
        session: &Session,
        id: UserId,
        update: UserUpdate,
    ) -> Result<UserSummary, AccountError> {
        ensure_admin(session)?;
        let mut record = self.store.fetch_user(id)?.ok_or(StoreError::NotFound)?;

        for (value, slot) in [
            (update.name, &mut record.name),
            (update.username, &mut record.username),
            (update.email, &mut record.email),
        ] {
            if let Some(value) = value {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(AccountError::MissingFields);
                }
                *slot = trimmed.to_string();
            }
        }
        if let Some(role) = update.role {
            record.role = role;
        }

        self.store.update_user(record.clone())?;
        let summary = UserSummary::from(&record);
        self.sessions.refresh_user(&summary)?;
        info!(admin_id = %session.user.id, user_id = %id, "user updated");
        Ok(summary)
    }

    /// Create the configured administrator unless that username or e-mail already exists.
    pub fn bootstrap_admin(&self, admin: &AdminBootstrap) -> Result<Option<UserSummary>, AccountError> {
        if self.store.find_user(&admin.username)?.is_some()
            || self.store.find_user(&admin.email)?.is_some()
        {
            return Ok(None);
        }

        let password_hash =
            hash_password(&admin.password).map_err(|err| AccountError::Credential(err.to_string()))?;
        let record = self.store.insert_user(NewUser {
            name: admin.username.clone(),
            username: admin.username.clone(),
            email: admin.email.clone(),
            password_hash,
            company: None,
            role: UserRole::Administrator,
            created_at: Utc::now(),
        })?;
        info!(user_id = %record.id, username = %record.username, "administrator bootstrapped");
        Ok(Some(UserSummary::from(&record)))
    }
}

fn ensure_admin(session: &Session) -> Result<(), AccountError> {
    if session.user.is_admin() {
        Ok(())
    } else {
        Err(AccountError::Forbidden)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("All fields are required.")]
    MissingFields,
    #[error("Company name and sector are required for company members.")]
    MissingCompanyDetails,
    #[error("Please enter your username or email and password.")]
    MissingCredentials,
    #[error("User not found.")]
    UserNotFound,
    #[error("Incorrect password.")]
    IncorrectPassword,
    #[error("authentication required")]
    Unauthenticated,
    #[error("administrator role required")]
    Forbidden,
    #[error("credential processing failed: {0}")]
    Credential(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Session(#[from] SessionError),
}
