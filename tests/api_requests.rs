//! Request flows through application routes mounted with `build_router`.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    response::Response,
    routing::{get, post},
};
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use tower::ServiceExt;
use validator::Validate;

use grit_platform_server::api::{CurrentActor, ValidatedJson, build_router};
use grit_platform_server::app::{AppState, HttpPolicy};
use grit_platform_server::domain::{
    AppError, Audited, BusinessError, ErrorResponse, GlobalErrorCode, StorageError,
};
use grit_platform_server::test_utils::{TEST_SUBJECT, TEST_TOKEN, test_state};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
struct Signup {
    #[validate(length(min = 2, max = 20, message = "nickname must be 2 to 20 characters"))]
    nickname: String,
    #[validate(email(message = "email is malformed"))]
    email: String,
}

async fn signup(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    ValidatedJson(body): ValidatedJson<Signup>,
) -> Result<Json<Audited<Signup>>, AppError> {
    if body.nickname == "admin" {
        return Err(BusinessError::with_message(
            &GlobalErrorCode::BusinessRuleViolation,
            "That nickname is reserved",
        )
        .into());
    }
    let mut member = Audited::new(body);
    member.assign_id(1)?;
    state.service.stamp(&mut member, &actor);
    Ok(Json(member))
}

async fn version_conflict() -> Result<(), AppError> {
    Err(StorageError::Sql {
        state: Some("23000".to_string()),
        message: "row was updated by another transaction".to_string(),
    }
    .into())
}

async fn broken_query() -> Result<(), AppError> {
    Err(StorageError::Sql {
        state: Some("42S00".to_string()),
        message: "syntax error at or near SELEC".to_string(),
    }
    .into())
}

async fn explode() -> &'static str {
    panic!("handler exploded")
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_millis(500)).await;
    "done"
}

fn app_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/members", post(signup))
        .route("/conflict", get(version_conflict))
        .route("/broken", get(broken_query))
        .route("/explode", get(explode))
        .route("/slow", get(slow))
}

fn router_with(policy: HttpPolicy) -> Router {
    build_router(app_routes(), test_state(policy), None)
}

fn router() -> Router {
    router_with(HttpPolicy::default())
}

fn request(method: &str, uri: &str, content_type: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TEST_TOKEN}"));
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(body.into()).unwrap()
}

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    request("POST", uri, Some("application/json"), body.to_string())
}

async fn error_body(response: Response) -> ErrorResponse {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_signup_is_audited_with_the_caller() {
    let payload = serde_json::json!({ "nickname": "neo", "email": "neo@grit.im" });

    let response = router().oneshot(post_json("/members", &payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let member: Audited<Signup> = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(member.id(), Some(1));
    assert_eq!(member.value().nickname, "neo");

    let audit = member.audit().unwrap();
    assert_eq!(audit.created_by(), TEST_SUBJECT);
    assert_eq!(audit.updated_by(), TEST_SUBJECT);
    assert_eq!(audit.created_at(), audit.updated_at());
}

#[tokio::test]
async fn test_validation_failures_list_every_field() {
    let payload = serde_json::json!({ "nickname": "n", "email": "not-an-email" });

    let response = router().oneshot(post_json("/members", &payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = error_body(response).await;
    assert_eq!(body.code, "C400-01");
    assert_eq!(body.status, 400);
    assert_eq!(body.errors.len(), 2);

    let mut fields: Vec<&str> = body.errors.iter().map(|e| e.field.as_str()).collect();
    fields.sort_unstable();
    assert_eq!(fields, ["email", "nickname"]);

    let nickname = body.errors.iter().find(|e| e.field == "nickname").unwrap();
    assert_eq!(nickname.value.as_deref(), Some("n"));
    assert_eq!(
        nickname.reason.as_deref(),
        Some("nickname must be 2 to 20 characters")
    );
}

#[tokio::test]
async fn test_malformed_json_is_unreadable_body() {
    let response = router()
        .oneshot(request("POST", "/members", Some("application/json"), "{\"nickname\":"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = error_body(response).await;
    assert_eq!(body.code, "C400-02");
    assert!(body.errors.is_empty());
}

#[tokio::test]
async fn test_missing_content_type_is_unsupported_media_type() {
    let response = router()
        .oneshot(request("POST", "/members", None, "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_body(response).await.code, "C400-07");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let router = router_with(HttpPolicy::default().with_body_limit(64));
    let payload = serde_json::json!({ "nickname": "x".repeat(200), "email": "a@b.co" });

    let response = router.oneshot(post_json("/members", &payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_body(response).await.code, "C400-06");
}

#[tokio::test]
async fn test_business_error_keeps_its_message() {
    let payload = serde_json::json!({ "nickname": "admin", "email": "root@grit.im" });

    let response = router().oneshot(post_json("/members", &payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = error_body(response).await;
    assert_eq!(body.code, "C422-03");
    assert_eq!(body.message, "That nickname is reserved");
}

#[tokio::test]
async fn test_conflict_sql_state_is_version_conflict() {
    let response = router()
        .oneshot(request("GET", "/conflict", None, Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(error_body(response).await.code, "C409-03");
}

#[tokio::test]
async fn test_other_sql_state_is_database_error() {
    let response = router()
        .oneshot(request("GET", "/broken", None, Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = error_body(response).await;
    assert_eq!(body.code, "S500-02");
    // Driver detail never reaches the client
    assert!(!body.message.contains("SELEC"));
}

#[tokio::test]
async fn test_panicking_handler_is_unexpected_error() {
    let response = router()
        .oneshot(request("GET", "/explode", None, Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = error_body(response).await;
    assert_eq!(body.code, "S500-04");
    assert!(!body.message.contains("exploded"));
}

#[tokio::test]
async fn test_slow_handler_times_out() {
    let router = router_with(HttpPolicy::default().with_request_timeout(Duration::from_millis(50)));

    let response = router
        .oneshot(request("GET", "/slow", None, Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(error_body(response).await.code, "G504-01");
}

#[tokio::test]
async fn test_app_routes_share_the_fallbacks() {
    let response = router()
        .oneshot(request("GET", "/members", None, Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(error_body(response).await.code, "M405-01");
}
