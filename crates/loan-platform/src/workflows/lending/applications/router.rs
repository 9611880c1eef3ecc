use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{Actor, ApplicationId, LoanStatus, Role, UserId};
use super::machine::TransitionError;
use super::repository::{ApplicationRepository, TransitionNotifier};
use super::service::{CreateLoanRequest, LoanWorkflowService, ReviewCommand, WorkflowError};

/// Router builder exposing the lending application endpoints.
///
/// The identity collaborator is an upstream gateway; it forwards the acting
/// user as `x-user-id` and `x-user-roles` headers, which are treated as
/// opaque, already-authenticated input.
pub fn application_router<R, N>(service: Arc<LoanWorkflowService<R, N>>) -> Router
where
    R: ApplicationRepository + 'static,
    N: TransitionNotifier + 'static,
{
    Router::new()
        .route("/api/v1/loans/types", get(loan_types_handler::<R, N>))
        .route(
            "/api/v1/loans/applications",
            post(create_handler::<R, N>).get(list_handler::<R, N>),
        )
        .route(
            "/api/v1/loans/applications/:application_id",
            get(get_handler::<R, N>),
        )
        .route(
            "/api/v1/loans/applications/:application_id/submit",
            post(submit_handler::<R, N>),
        )
        .route(
            "/api/v1/loans/applications/:application_id/review",
            post(review_handler::<R, N>),
        )
        .route(
            "/api/v1/loans/applications/:application_id/cancel",
            post(cancel_handler::<R, N>),
        )
        .route(
            "/api/v1/loans/applications/:application_id/disburse",
            post(disburse_handler::<R, N>),
        )
        .route(
            "/api/v1/loans/applications/:application_id/history",
            get(history_handler::<R, N>),
        )
        .with_state(service)
}

pub(crate) async fn loan_types_handler<R, N>(
    State(service): State<Arc<LoanWorkflowService<R, N>>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: TransitionNotifier + 'static,
{
    (StatusCode::OK, axum::Json(service.catalog().types())).into_response()
}

/// Optional free-text notes accompanying a transition request.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TransitionNote {
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

pub(crate) async fn create_handler<R, N>(
    State(service): State<Arc<LoanWorkflowService<R, N>>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<CreateLoanRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: TransitionNotifier + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.create(&actor, request) {
        Ok(application) => {
            (StatusCode::CREATED, axum::Json(application.status_view())).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<R, N>(
    State(service): State<Arc<LoanWorkflowService<R, N>>>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: TransitionNotifier + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.list(&actor) {
        Ok(applications) => {
            let views: Vec<_> = applications
                .iter()
                .map(|application| application.status_view())
                .collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_handler<R, N>(
    State(service): State<Arc<LoanWorkflowService<R, N>>>,
    headers: HeaderMap,
    Path(application_id): Path<ApplicationId>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: TransitionNotifier + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.get(&actor, &application_id) {
        Ok(application) => (StatusCode::OK, axum::Json(application.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn history_handler<R, N>(
    State(service): State<Arc<LoanWorkflowService<R, N>>>,
    headers: HeaderMap,
    Path(application_id): Path<ApplicationId>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: TransitionNotifier + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.history(&actor, &application_id) {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_handler<R, N>(
    State(service): State<Arc<LoanWorkflowService<R, N>>>,
    headers: HeaderMap,
    Path(application_id): Path<ApplicationId>,
    note: Option<axum::Json<TransitionNote>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: TransitionNotifier + 'static,
{
    transition_response(&service, &headers, &application_id, LoanStatus::Submitted, note)
}

pub(crate) async fn cancel_handler<R, N>(
    State(service): State<Arc<LoanWorkflowService<R, N>>>,
    headers: HeaderMap,
    Path(application_id): Path<ApplicationId>,
    note: Option<axum::Json<TransitionNote>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: TransitionNotifier + 'static,
{
    transition_response(&service, &headers, &application_id, LoanStatus::Cancelled, note)
}

pub(crate) async fn disburse_handler<R, N>(
    State(service): State<Arc<LoanWorkflowService<R, N>>>,
    headers: HeaderMap,
    Path(application_id): Path<ApplicationId>,
    note: Option<axum::Json<TransitionNote>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: TransitionNotifier + 'static,
{
    transition_response(&service, &headers, &application_id, LoanStatus::Disbursed, note)
}

pub(crate) async fn review_handler<R, N>(
    State(service): State<Arc<LoanWorkflowService<R, N>>>,
    headers: HeaderMap,
    Path(application_id): Path<ApplicationId>,
    axum::Json(command): axum::Json<ReviewCommand>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: TransitionNotifier + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.review(&actor, &application_id, command) {
        Ok(application) => (StatusCode::OK, axum::Json(application.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

fn transition_response<R, N>(
    service: &LoanWorkflowService<R, N>,
    headers: &HeaderMap,
    application_id: &ApplicationId,
    target: LoanStatus,
    note: Option<axum::Json<TransitionNote>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: TransitionNotifier + 'static,
{
    let actor = match actor_from_headers(headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let notes = note.and_then(|axum::Json(body)| body.notes);

    match service.request_transition(application_id, target, &actor, notes, None) {
        Ok(application) => (StatusCode::OK, axum::Json(application.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, Response> {
    let user_id = headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| {
            let payload = json!({ "error": "missing x-user-id header" });
            (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
        })?;

    let mut roles = Vec::new();
    if let Some(raw) = headers.get("x-user-roles").and_then(|value| value.to_str().ok()) {
        for part in raw.split(',').filter(|part| !part.trim().is_empty()) {
            let role: Role = part.parse().map_err(|err| {
                let payload = json!({ "error": format!("{err}") });
                (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
            })?;
            roles.push(role);
        }
    }

    Ok(Actor::new(UserId::new(user_id), roles))
}

fn error_response(err: WorkflowError) -> Response {
    let status = match &err {
        WorkflowError::NotFound => StatusCode::NOT_FOUND,
        WorkflowError::Forbidden(_) => StatusCode::FORBIDDEN,
        WorkflowError::Conflict => StatusCode::CONFLICT,
        WorkflowError::Transition(TransitionError::IllegalTransition { .. }) => {
            StatusCode::CONFLICT
        }
        WorkflowError::Transition(_) | WorkflowError::InvalidInput { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        WorkflowError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
