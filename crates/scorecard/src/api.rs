//! HTTP surface: shared handler state, the combined router, and JSON error payloads.

use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::json;

use crate::accounts::{account_router, AccountService, SessionRegistry};
use crate::evaluations::{evaluation_router, EvaluationService};
use crate::rubric;
use crate::store::RecordStore;

pub const LOGIN_ROUTE: &str = "/api/v1/auth/login";

/// Services shared by every handler.
pub struct ScorecardState<S> {
    pub accounts: Arc<AccountService<S>>,
    pub evaluations: Arc<EvaluationService<S>>,
}

impl<S> Clone for ScorecardState<S> {
    fn clone(&self) -> Self {
        Self {
            accounts: Arc::clone(&self.accounts),
            evaluations: Arc::clone(&self.evaluations),
        }
    }
}

impl<S> ScorecardState<S>
where
    S: RecordStore + 'static,
{
    /// Wire both services over one store with a fresh session registry.
    pub fn new(store: Arc<S>) -> Self {
        let sessions = Arc::new(SessionRegistry::default());
        Self {
            accounts: Arc::new(AccountService::new(Arc::clone(&store), sessions)),
            evaluations: Arc::new(EvaluationService::new(store)),
        }
    }
}

/// Router builder exposing every scorecard endpoint; unknown paths point back to login.
pub fn scorecard_router<S>(state: ScorecardState<S>) -> Router
where
    S: RecordStore + 'static,
{
    Router::new()
        .route("/api/v1/rubric", get(rubric_handler))
        .route("/api/v1/explanation", get(explanation_handler))
        .merge(account_router(state.clone()))
        .merge(evaluation_router(state))
        .fallback(not_found_handler)
}

async fn rubric_handler() -> Response {
    let criteria = rubric::RubricTemplate::standard().criteria();
    (StatusCode::OK, axum::Json(json!({ "criteria": criteria }))).into_response()
}

async fn explanation_handler() -> Response {
    (StatusCode::OK, axum::Json(rubric::explanation())).into_response()
}

async fn not_found_handler(uri: Uri) -> Response {
    let payload = json!({
        "error": format!("no route for {}", uri.path()),
        "login": LOGIN_ROUTE,
    });
    (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
}

pub(crate) fn error_response(status: StatusCode, message: impl ToString) -> Response {
    let payload = json!({
        "error": message.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

/// Body taken as a `Result` so handlers check the session before judging the payload.
pub(crate) fn json_body<T>(body: Result<axum::Json<T>, JsonRejection>) -> Result<T, Response> {
    body.map(|axum::Json(value)| value)
        .map_err(|rejection| error_response(rejection.status(), rejection.body_text()))
}

pub(crate) fn login_required() -> Response {
    let payload = json!({
        "error": "authentication required",
        "login": LOGIN_ROUTE,
    });
    (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
}
