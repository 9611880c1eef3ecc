use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::workflows::lending::applications::domain::{Actor, LoanStatus, LoanTypeCatalog};
use crate::workflows::lending::applications::router;
use crate::workflows::lending::applications::LoanWorkflowService;

fn headers_for(actor: &Actor) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-user-id",
        HeaderValue::from_str(&actor.id.0).expect("header value"),
    );
    let roles = actor
        .roles
        .iter()
        .map(|role| role.label())
        .collect::<Vec<_>>()
        .join(",");
    headers.insert("x-user-roles", HeaderValue::from_str(&roles).expect("header value"));
    headers
}

fn create_body() -> serde_json::Value {
    json!({
        "loan_type_id": "11111111-1111-1111-1111-111111111111",
        "requested_amount": "12000",
        "term_months": 12,
        "purpose": "Kitchen renovation",
        "monthly_income": "6400",
        "monthly_expenses": "2800",
        "employment": {
            "status": "Employed",
            "employer_name": "Acme Fabrication",
            "years_employed": 4
        }
    })
}

fn post(uri: &str, actor: &Actor, body: Option<&serde_json::Value>) -> axum::http::Request<axum::body::Body> {
    let mut builder = axum::http::Request::post(uri).header("x-user-id", actor.id.0.clone());
    let roles = actor
        .roles
        .iter()
        .map(|role| role.label())
        .collect::<Vec<_>>()
        .join(",");
    builder = builder.header("x-user-roles", roles);
    match body {
        Some(value) => builder
            .header(axum::http::header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(
                serde_json::to_vec(value).expect("body serializes"),
            ))
            .expect("request builds"),
        None => builder
            .body(axum::body::Body::empty())
            .expect("request builds"),
    }
}

#[tokio::test]
async fn create_route_returns_created() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(post(
            "/api/v1/loans/applications",
            &applicant(),
            Some(&create_body()),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert!(payload.get("application_id").is_some());
    assert_eq!(payload["status"], "draft");
    assert!(payload
        .get("application_number")
        .and_then(|value| value.as_str())
        .is_some_and(|number| number.starts_with("LA")));
}

#[tokio::test]
async fn create_without_identity_is_unauthorized() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let request = axum::http::Request::post("/api/v1/loans/applications")
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            serde_json::to_vec(&create_body()).expect("body serializes"),
        ))
        .expect("request builds");

    let response = router.oneshot(request).await.expect("route executes");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn lifecycle_flows_through_the_router() {
    let (service, _, _) = build_service();
    let owner = applicant();
    let application = service.create(&owner, create_request()).expect("created");
    let router = router_with_service(service);

    let submit_uri = format!("/api/v1/loans/applications/{}/submit", application.id);
    let response = router
        .clone()
        .oneshot(post(&submit_uri, &owner, None))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "submitted");

    let review_uri = format!("/api/v1/loans/applications/{}/review", application.id);
    let review_body = json!({
        "status": "approved",
        "notes": "Income verified",
        "decision": { "approved_amount": "12000", "interest_rate": "12" }
    });
    let response = router
        .clone()
        .oneshot(post(&review_uri, &reviewer(), Some(&review_body)))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "approved");
    assert_eq!(payload["decision"]["monthly_payment"], "1066.19");

    // Approved is not re-reviewable; the graph rejects it with a conflict.
    let response = router
        .clone()
        .oneshot(post(&review_uri, &reviewer(), Some(&review_body)))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let history_uri = format!("/api/v1/loans/applications/{}/history", application.id);
    let request = axum::http::Request::get(&history_uri)
        .header("x-user-id", owner.id.0.clone())
        .body(axum::body::Body::empty())
        .expect("request builds");
    let response = router.oneshot(request).await.expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let entries = payload.as_array().expect("history array");
    assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn stranger_submission_is_forbidden() {
    let (service, _, _) = build_service();
    let owner = applicant();
    let application = service.create(&owner, create_request()).expect("created");
    let router = router_with_service(service);

    let submit_uri = format!("/api/v1/loans/applications/{}/submit", application.id);
    let response = router
        .oneshot(post(&submit_uri, &other_applicant(), None))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn out_of_bounds_amounts_are_unprocessable() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let mut body = create_body();
    body["requested_amount"] = json!("100");
    let response = router
        .oneshot(post("/api/v1/loans/applications", &applicant(), Some(&body)))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn repository_outages_surface_as_internal_errors() {
    let repository = Arc::new(FailingCommitRepository {
        inner: MemoryRepository::default(),
    });
    let notifier = Arc::new(MemoryNotifier::default());
    let service = LoanWorkflowService::new(
        repository,
        notifier,
        LoanTypeCatalog::standard(),
    );
    let owner = applicant();
    let application = service.create(&owner, create_request()).expect("created");
    let service = Arc::new(service);

    let response = router::submit_handler::<FailingCommitRepository, MemoryNotifier>(
        State(service),
        headers_for(&owner),
        Path(application.id),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn unknown_applications_are_not_found() {
    let (service, _, _) = build_service();
    let owner = applicant();
    let ghost = application_with_status(&owner, LoanStatus::Draft);
    let service = Arc::new(service);

    let response = router::get_handler::<MemoryRepository, MemoryNotifier>(
        State(service),
        headers_for(&owner),
        Path(ghost.id),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
