use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::comparison::ComparisonError;
use super::draft::DraftEdit;
use super::ranking::{RankingColumn, RankingSort, SortDirection};
use super::service::{DraftId, DraftSetup, EvaluationServiceError};
use super::snapshot::RubricSnapshot;
use crate::accounts::{bearer_token, AccountError, Session};
use crate::api::{error_response, json_body, login_required, ScorecardState};
use crate::scoring::SubcriterionWeighting;
use crate::store::{EvaluationId, RecordStore, StoreError};

/// Router builder exposing drafts, submissions, reports, rankings, and comparisons.
pub fn evaluation_router<S>(state: ScorecardState<S>) -> Router
where
    S: RecordStore + 'static,
{
    Router::new()
        .route("/api/v1/drafts", post(create_draft_handler::<S>))
        .route(
            "/api/v1/drafts/:draft_id",
            get(draft_handler::<S>)
                .patch(edit_draft_handler::<S>)
                .delete(discard_draft_handler::<S>),
        )
        .route("/api/v1/drafts/:draft_id/submit", post(submit_draft_handler::<S>))
        .route(
            "/api/v1/evaluations",
            post(submit_snapshot_handler::<S>).get(list_own_handler::<S>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id",
            delete(delete_handler::<S>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/report",
            get(report_handler::<S>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/report.csv",
            get(report_csv_handler::<S>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/report.txt",
            get(report_text_handler::<S>),
        )
        .route("/api/v1/rankings", get(rankings_handler::<S>))
        .route(
            "/api/v1/rankings/frameworks",
            get(framework_rankings_handler::<S>),
        )
        .route(
            "/api/v1/comparisons/evaluations",
            post(compare_evaluations_handler::<S>),
        )
        .route(
            "/api/v1/comparisons/frameworks",
            post(compare_frameworks_handler::<S>),
        )
        .route("/api/v1/admin/evaluations", get(admin_list_handler::<S>))
        .route(
            "/api/v1/admin/evaluations/:evaluation_id",
            delete(admin_delete_handler::<S>),
        )
        .with_state(state)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RankingQuery {
    pub weighting: Option<SubcriterionWeighting>,
    pub sort: Option<RankingColumn>,
    pub direction: Option<SortDirection>,
    /// Column header click; flips the sort kept in the session.
    pub toggle: Option<RankingColumn>,
}

impl RankingQuery {
    pub fn resolve(&self, current: RankingSort) -> RankingSort {
        if let Some(column) = self.toggle {
            return current.toggle(column);
        }
        match self.sort {
            Some(column) => RankingSort {
                column,
                direction: self.direction.unwrap_or(SortDirection::Ascending),
            },
            None => current,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditRequest {
    pub edits: Vec<DraftEdit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationComparisonRequest {
    #[serde(default)]
    pub evaluation_ids: Vec<EvaluationId>,
    #[serde(default)]
    pub weighting: SubcriterionWeighting,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrameworkComparisonRequest {
    #[serde(default)]
    pub frameworks: Vec<String>,
}

macro_rules! body_or_reject {
    ($body:expr) => {
        match json_body($body) {
            Ok(value) => value,
            Err(response) => return response,
        }
    };
}

macro_rules! session_or_reject {
    ($state:expr, $headers:expr) => {
        match $state.accounts.resolve(bearer_token(&$headers)) {
            Ok(session) => session,
            Err(err) => return session_error_response(err),
        }
    };
}

pub(crate) async fn create_draft_handler<S>(
    State(state): State<ScorecardState<S>>,
    headers: HeaderMap,
    body: Result<axum::Json<DraftSetup>, JsonRejection>,
) -> Response
where
    S: RecordStore + 'static,
{
    let session = session_or_reject!(state, headers);
    let setup: DraftSetup = body_or_reject!(body);
    match state.evaluations.create_draft(&session.user, setup) {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(err) => evaluation_error_response(err),
    }
}

pub(crate) async fn draft_handler<S>(
    State(state): State<ScorecardState<S>>,
    headers: HeaderMap,
    Path(draft_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
{
    let session = session_or_reject!(state, headers);
    match state.evaluations.draft(&session.user, DraftId(draft_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => evaluation_error_response(err),
    }
}

pub(crate) async fn edit_draft_handler<S>(
    State(state): State<ScorecardState<S>>,
    headers: HeaderMap,
    Path(draft_id): Path<u64>,
    body: Result<axum::Json<EditRequest>, JsonRejection>,
) -> Response
where
    S: RecordStore + 'static,
{
    let session = session_or_reject!(state, headers);
    let request: EditRequest = body_or_reject!(body);
    match state
        .evaluations
        .edit_draft(&session.user, DraftId(draft_id), request.edits)
    {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => evaluation_error_response(err),
    }
}

pub(crate) async fn discard_draft_handler<S>(
    State(state): State<ScorecardState<S>>,
    headers: HeaderMap,
    Path(draft_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
{
    let session = session_or_reject!(state, headers);
    match state
        .evaluations
        .discard_draft(&session.user, DraftId(draft_id))
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => evaluation_error_response(err),
    }
}

pub(crate) async fn submit_draft_handler<S>(
    State(state): State<ScorecardState<S>>,
    headers: HeaderMap,
    Path(draft_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
{
    let session = session_or_reject!(state, headers);
    match state
        .evaluations
        .submit_draft(&session.user, DraftId(draft_id))
    {
        Ok(submitted) => (StatusCode::CREATED, axum::Json(submitted)).into_response(),
        Err(err) => evaluation_error_response(err),
    }
}

pub(crate) async fn submit_snapshot_handler<S>(
    State(state): State<ScorecardState<S>>,
    headers: HeaderMap,
    body: Result<axum::Json<RubricSnapshot>, JsonRejection>,
) -> Response
where
    S: RecordStore + 'static,
{
    let session = session_or_reject!(state, headers);
    let snapshot: RubricSnapshot = body_or_reject!(body);
    match state.evaluations.submit_snapshot(&session.user, &snapshot) {
        Ok(submitted) => (StatusCode::CREATED, axum::Json(submitted)).into_response(),
        Err(err) => evaluation_error_response(err),
    }
}

pub(crate) async fn list_own_handler<S>(
    State(state): State<ScorecardState<S>>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
{
    let session = session_or_reject!(state, headers);
    match state.evaluations.list_own(&session.user) {
        Ok(evaluations) => (
            StatusCode::OK,
            axum::Json(json!({ "evaluations": evaluations })),
        )
            .into_response(),
        Err(err) => evaluation_error_response(err),
    }
}

pub(crate) async fn delete_handler<S>(
    State(state): State<ScorecardState<S>>,
    headers: HeaderMap,
    Path(evaluation_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
{
    let session = session_or_reject!(state, headers);
    match state
        .evaluations
        .delete(&session.user, EvaluationId(evaluation_id))
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => evaluation_error_response(err),
    }
}

pub(crate) async fn report_handler<S>(
    State(state): State<ScorecardState<S>>,
    headers: HeaderMap,
    Path(evaluation_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
{
    let session = session_or_reject!(state, headers);
    match state
        .evaluations
        .report(&session.user, EvaluationId(evaluation_id))
    {
        Ok(document) => (StatusCode::OK, axum::Json(document)).into_response(),
        Err(err) => evaluation_error_response(err),
    }
}

pub(crate) async fn report_csv_handler<S>(
    State(state): State<ScorecardState<S>>,
    headers: HeaderMap,
    Path(evaluation_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
{
    let session = session_or_reject!(state, headers);
    match state
        .evaluations
        .report_csv(&session.user, EvaluationId(evaluation_id))
    {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"report.csv\""),
            ],
            body,
        )
            .into_response(),
        Err(err) => evaluation_error_response(err),
    }
}

pub(crate) async fn report_text_handler<S>(
    State(state): State<ScorecardState<S>>,
    headers: HeaderMap,
    Path(evaluation_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
{
    let session = session_or_reject!(state, headers);
    match state
        .evaluations
        .report_text(&session.user, EvaluationId(evaluation_id))
    {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => evaluation_error_response(err),
    }
}

pub(crate) async fn rankings_handler<S>(
    State(state): State<ScorecardState<S>>,
    headers: HeaderMap,
    Query(query): Query<RankingQuery>,
) -> Response
where
    S: RecordStore + 'static,
{
    let session = session_or_reject!(state, headers);
    let sort = query.resolve(session.ranking_sort);
    if sort != session.ranking_sort {
        if let Err(err) = state.accounts.sessions().store_sort(&session.token, sort) {
            return session_error_response(err.into());
        }
    }

    match state
        .evaluations
        .rankings(query.weighting.unwrap_or_default(), sort)
    {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => evaluation_error_response(err),
    }
}

pub(crate) async fn framework_rankings_handler<S>(
    State(state): State<ScorecardState<S>>,
    headers: HeaderMap,
    Query(query): Query<RankingQuery>,
) -> Response
where
    S: RecordStore + 'static,
{
    let _session: Session = session_or_reject!(state, headers);
    let weighting = query.weighting.unwrap_or_default();
    match state.evaluations.framework_rankings(weighting) {
        Ok(frameworks) => (
            StatusCode::OK,
            axum::Json(json!({ "weighting": weighting, "frameworks": frameworks })),
        )
            .into_response(),
        Err(err) => evaluation_error_response(err),
    }
}

pub(crate) async fn compare_evaluations_handler<S>(
    State(state): State<ScorecardState<S>>,
    headers: HeaderMap,
    body: Result<axum::Json<EvaluationComparisonRequest>, JsonRejection>,
) -> Response
where
    S: RecordStore + 'static,
{
    let _session: Session = session_or_reject!(state, headers);
    let request: EvaluationComparisonRequest = body_or_reject!(body);
    match state
        .evaluations
        .compare_evaluations(&request.evaluation_ids, request.weighting)
    {
        Ok(comparison) => (StatusCode::OK, axum::Json(comparison)).into_response(),
        Err(err) => evaluation_error_response(err),
    }
}

pub(crate) async fn compare_frameworks_handler<S>(
    State(state): State<ScorecardState<S>>,
    headers: HeaderMap,
    body: Result<axum::Json<FrameworkComparisonRequest>, JsonRejection>,
) -> Response
where
    S: RecordStore + 'static,
{
    let _session: Session = session_or_reject!(state, headers);
    let request: FrameworkComparisonRequest = body_or_reject!(body);
    match state.evaluations.compare_frameworks(&request.frameworks) {
        Ok(comparison) => (StatusCode::OK, axum::Json(comparison)).into_response(),
        Err(err) => evaluation_error_response(err),
    }
}

pub(crate) async fn admin_list_handler<S>(
    State(state): State<ScorecardState<S>>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + 'static,
{
    let session = match state.accounts.require_admin(bearer_token(&headers)) {
        Ok(session) => session,
        Err(err) => return session_error_response(err),
    };
    match state.evaluations.list_all(&session.user) {
        Ok(evaluations) => (
            StatusCode::OK,
            axum::Json(json!({ "evaluations": evaluations })),
        )
            .into_response(),
        Err(err) => evaluation_error_response(err),
    }
}

pub(crate) async fn admin_delete_handler<S>(
    State(state): State<ScorecardState<S>>,
    headers: HeaderMap,
    Path(evaluation_id): Path<u64>,
) -> Response
where
    S: RecordStore + 'static,
{
    let session = match state.accounts.require_admin(bearer_token(&headers)) {
        Ok(session) => session,
        Err(err) => return session_error_response(err),
    };
    match state
        .evaluations
        .delete(&session.user, EvaluationId(evaluation_id))
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => evaluation_error_response(err),
    }
}

fn session_error_response(err: AccountError) -> Response {
    match err {
        AccountError::Unauthenticated => login_required(),
        AccountError::Forbidden => error_response(StatusCode::FORBIDDEN, err),
        other => {
            error!(error = %other, "session lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, other)
        }
    }
}

pub(crate) fn evaluation_error_response(err: EvaluationServiceError) -> Response {
    match err {
        EvaluationServiceError::Validation(validation) => {
            let payload = json!({
                "error": validation.to_string(),
                "messages": validation.messages(),
                "issues": validation.issues,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        EvaluationServiceError::Draft(err) => error_response(StatusCode::UNPROCESSABLE_ENTITY, err),
        EvaluationServiceError::Comparison(ComparisonError::TooFewSelections) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            ComparisonError::TooFewSelections,
        ),
        EvaluationServiceError::Comparison(err) => error_response(StatusCode::NOT_FOUND, err),
        EvaluationServiceError::Snapshot(super::snapshot::SnapshotError::Encode(err)) => {
            error!(error = %err, "failed to encode evaluation data");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to encode evaluation data")
        }
        EvaluationServiceError::Snapshot(_) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "evaluation data is invalid or missing",
        ),
        EvaluationServiceError::Store(StoreError::NotFound) => {
            error_response(StatusCode::NOT_FOUND, "evaluation not found")
        }
        EvaluationServiceError::DraftNotFound(id) => {
            error_response(StatusCode::NOT_FOUND, format!("{id} not found"))
        }
        EvaluationServiceError::Store(StoreError::Conflict(message)) => {
            error_response(StatusCode::CONFLICT, message)
        }
        EvaluationServiceError::Forbidden => {
            error_response(StatusCode::FORBIDDEN, EvaluationServiceError::Forbidden)
        }
        other => {
            error!(error = %other, "evaluation request failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, other)
        }
    }
}
