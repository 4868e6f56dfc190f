use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::router::auth_routes;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

const MOBILE: &str = "+353871234567";

fn app(server: &MockServer) -> (Router, TestConfig) {
    let config = TestConfig::with_supabase_url(server.uri());
    (auth_routes(config.to_arc()), config)
}

fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", JwtTestUtils::bearer(token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_passcode_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/passcodes"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::passcode_response(MOBILE, "482913", false)
        ])))
        .mount(&server)
        .await;

    let (app, _) = app(&server);
    let response = app
        .oneshot(post_json("/passcode", json!({ "mobile_number": MOBILE }), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["expires_at"].is_string());
    assert!(body.get("code").is_none());
}

#[tokio::test]
async fn test_passcode_request_bad_mobile() {
    let server = MockServer::start().await;

    let (app, _) = app(&server);
    let response = app
        .oneshot(post_json("/passcode", json!({ "mobile_number": "abc" }), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["kind"], "invalid_input");
}

#[tokio::test]
async fn test_login_with_wrong_code() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/passcodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let (app, _) = app(&server);
    let response = app
        .oneshot(post_json("/login", json!({ "mobile_number": MOBILE, "code": "111111" }), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["kind"], "unauthenticated");
}

#[tokio::test]
async fn test_login_returns_token_and_patient() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/passcodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::passcode_response(MOBILE, "482913", true)
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_response("pabc123", MOBILE)
        ])))
        .mount(&server)
        .await;

    let (app, _) = app(&server);
    let response = app
        .oneshot(post_json("/login", json!({ "mobile_number": MOBILE, "code": "482913" }), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["patient"]["id"], "pabc123");
    assert_matches!(body["access_token"].as_str(), Some(token) if token.split('.').count() == 3);
}

#[tokio::test]
async fn test_admin_register_requires_admin() {
    let server = MockServer::start().await;
    let (app, config) = app(&server);

    let request = json!({ "username": "frontdesk", "password": "desk-password" });

    let response = app.clone()
        .oneshot(post_json("/admin/register", request.clone(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let patient_token = JwtTestUtils::create_test_token(&TestUser::patient("pabc123"), &config.jwt_secret);
    let response = app
        .oneshot(post_json("/admin/register", request, Some(&patient_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["kind"], "unauthorized");
}

#[tokio::test]
async fn test_validate_token() {
    let server = MockServer::start().await;
    let (app, config) = app(&server);

    let token = JwtTestUtils::create_test_token(&TestUser::admin("root"), &config.jwt_secret);
    let response = app.clone()
        .oneshot(post_json("/validate", json!({}), Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["user_id"], "root");
    assert_eq!(body["role"], "admin");

    let expired = JwtTestUtils::create_expired_token(&TestUser::admin("root"), &config.jwt_secret);
    let response = app.clone()
        .oneshot(post_json("/validate", json!({}), Some(&expired)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(post_json("/validate", json!({}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
