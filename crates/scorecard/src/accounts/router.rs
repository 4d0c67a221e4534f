use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde_json::json;
use tracing::error;

use super::domain::{LoginRequest, SignupRequest, UserUpdate};
use super::service::AccountError;
use super::session::bearer_token;
use crate::api::{error_response, json_body, login_required, ScorecardState};
use crate::store::{RecordStore, StoreError, UserId};

/// Router builder exposing signup, login, session, and user administration endpoints.
pub fn account_router<S>(state: ScorecardState<S>) -> Router
where
    S: RecordStore + 'static,
{
    Router::new()
        .route("/api/v1/auth/signup", post(signup_handler::<S>))
        .route("/api/v1/auth/login", post(login_handler::<S>))
        .route("/api/v1/auth/logout", post(logout_handler::<S>))
        .route("/api/v1/auth/session", get(session_handler::<S>))
        .route("/api/v1/admin/users", get(list_users_handler::<S>))
        .route("/api/v1/admin/users/:user_id", put(update_user_handler::<S>))
        .with_state(state)
}

pub(crate) async fn signup_handler<S>(
    State(state): State<ScorecardState<S>>,
    axum::Json(request): axum::Json<SignupRequest>,
) -> Response
where
    S: RecordStore + 'static,
{
    match state.accounts.register(request) {
        Ok(user) => (
            StatusCode::CREATED,
            axum::Json(json!({
                "message": "User registered successfully!",
                "user": user,
            })),
        )
            .into_response(),
        Err(err) => account_error_response(err),
    }
}

pub(crate) async fn login_handler<S>(
    State(state): State<ScorecardState<S>>,
    axum::Json(request): axum::Json<LoginRequest>,
) -> Response
where
    S: RecordStore + 'static,
{
    match state.accounts.login(request) {
        Ok(session) => (StatusCode::OK, axum::Json(session)).into_response(),
        Err(err) => account_error_response(err),
    }
}

pub(crate) async fn logout_handler<S>(
    State(state): State<ScorecardState<S>>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
{
    let Some(token) = bearer_token(&headers) else {
        return login_required();
    };
    let signed_out = match state.accounts.logout(token) {
        Ok(signed_out) => signed_out,
        Err(err) => return account_error_response(err),
    };
    if let Some(user_id) = signed_out {
        if let Err(err) = state.evaluations.discard_drafts_of(user_id) {
            error!(%user_id, error = %err, "failed to drop drafts on logout");
        }
    }
    StatusCode::NO_CONTENT.into_response()
}

pub(crate) async fn session_handler<S>(
    State(state): State<ScorecardState<S>>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
{
    match state.accounts.resolve(bearer_token(&headers)) {
        Ok(session) => (StatusCode::OK, axum::Json(session)).into_response(),
        Err(err) => account_error_response(err),
    }
}

pub(crate) async fn list_users_handler<S>(
    State(state): State<ScorecardState<S>>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
{
    let result = state
        .accounts
        .resolve(bearer_token(&headers))
        .and_then(|session| state.accounts.list_users(&session));
    match result {
        Ok(users) => (StatusCode::OK, axum::Json(json!({ "users": users }))).into_response(),
        Err(err) => account_error_response(err),
    }
}

pub(crate) async fn update_user_handler<S>(
    State(state): State<ScorecardState<S>>,
    headers: HeaderMap,
    Path(user_id): Path<u64>,
    body: Result<axum::Json<UserUpdate>, JsonRejection>,
) -> Response
where
    S: RecordStore + 'static,
{
    let session = match state.accounts.resolve(bearer_token(&headers)) {
        Ok(session) => session,
        Err(err) => return account_error_response(err),
    };
    let update = match json_body(body) {
        Ok(update) => update,
        Err(response) => return response,
    };
    let result = state.accounts.update_user(&session, UserId(user_id), update);
    match result {
        Ok(user) => (StatusCode::OK, axum::Json(user)).into_response(),
        Err(err) => account_error_response(err),
    }
}

pub(crate) fn account_error_response(err: AccountError) -> Response {
    match err {
        AccountError::MissingFields
        | AccountError::MissingCompanyDetails
        | AccountError::MissingCredentials => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, err)
        }
        AccountError::UserNotFound | AccountError::IncorrectPassword => {
            error_response(StatusCode::UNAUTHORIZED, err)
        }
        AccountError::Unauthenticated => login_required(),
        AccountError::Forbidden => error_response(StatusCode::FORBIDDEN, err),
        AccountError::Store(StoreError::NotFound) => {
            error_response(StatusCode::NOT_FOUND, "user not found")
        }
        AccountError::Store(StoreError::Conflict(message)) => {
            error_response(StatusCode::CONFLICT, message)
        }
        other => {
            error!(error = %other, "account request failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, other)
        }
    }
}
