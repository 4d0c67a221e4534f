use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use axum::http::{header, HeaderMap};
use serde::Serialize;
use uuid::Uuid;

use super::domain::UserSummary;
use crate::evaluations::RankingSort;
use crate::store::UserId;

/// Authenticated context handed to every protected operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub token: String,
    pub user: UserSummary,
    pub ranking_sort: RankingSort,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session registry unavailable")]
    Poisoned,
}

/// Token to session map; a token is valid from login until logout.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn open(&self, user: UserSummary) -> Result<Session, SessionError> {
        let session = Session {
            token: Uuid::new_v4().simple().to_string(),
            user,
            ranking_sort: RankingSort::default(),
        };
        self.lock()?
            .insert(session.token.clone(), session.clone());
        Ok(session)
    }

    pub fn resolve(&self, token: &str) -> Result<Option<Session>, SessionError> {
        Ok(self.lock()?.get(token).cloned())
    }

    pub fn close(&self, token: &str) -> Result<bool, SessionError> {
        Ok(self.lock()?.remove(token).is_some())
    }

    pub fn store_sort(&self, token: &str, sort: RankingSort) -> Result<(), SessionError> {
        if let Some(session) = self.lock()?.get_mut(token) {
            session.ranking_sort = sort;
        }
        Ok(())
    }

    /// Refresh the cached user on every open session after an edit.
    pub fn refresh_user(&self, user: &UserSummary) -> Result<(), SessionError> {
        for session in self.lock()?.values_mut() {
            if session.user.id == user.id {
                session.user = user.clone();
            }
        }
        Ok(())
    }

    pub fn active_for(&self, user: UserId) -> Result<usize, SessionError> {
        Ok(self
            .lock()?
            .values()
            .filter(|session| session.user.id == user)
            .count())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Session>>, SessionError> {
        self.sessions.lock().map_err(|_| SessionError::Poisoned)
    }
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
