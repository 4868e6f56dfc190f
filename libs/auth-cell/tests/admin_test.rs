use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::models::{AdminRegisterRequest, AuthError};
use auth_cell::services::password::hash_password;
use auth_cell::services::AdminService;
use shared_config::BootstrapAdmin;
use shared_database::SupabaseClient;
use shared_models::auth::Role;
use shared_utils::jwt::{validate_token, TokenIssuer};
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn service(server: &MockServer) -> (AdminService, String) {
    let config = TestConfig::with_supabase_url(server.uri()).to_app_config();
    let service = AdminService::with_client(
        Arc::new(SupabaseClient::new(&config)),
        TokenIssuer::from_config(&config),
    );
    (service, config.jwt_secret)
}

fn admin_row(username: &str, password: &str, is_superadmin: bool) -> Value {
    json!({
        "id": 1,
        "username": username,
        "password_hash": hash_password(password).unwrap(),
        "is_superadmin": is_superadmin,
        "created_at": "2026-01-01T00:00:00+00:00"
    })
}

async fn mount_lookup(server: &MockServer, username: &str, rows: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/admins"))
        .and(query_param("username", format!("eq.{}", username)))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_admin_login_issues_admin_token() {
    let server = MockServer::start().await;
    mount_lookup(&server, "root", json!([admin_row("root", "s3cret-password", true)])).await;

    let (service, secret) = service(&server);
    let token = service.login("root", "s3cret-password").await.unwrap();

    let user = validate_token(&token.access_token, &secret).unwrap();
    assert_eq!(user.id, "root");
    assert_eq!(user.role, Role::Admin);
}

#[tokio::test]
async fn test_admin_login_wrong_password() {
    let server = MockServer::start().await;
    mount_lookup(&server, "root", json!([admin_row("root", "s3cret-password", true)])).await;

    let (service, _) = service(&server);
    assert_matches!(service.login("root", "guess-password").await, Err(AuthError::InvalidCredentials));
}

#[tokio::test]
async fn test_admin_login_unknown_username() {
    let server = MockServer::start().await;
    mount_lookup(&server, "nobody", json!([])).await;

    let (service, _) = service(&server);
    assert_matches!(service.login("nobody", "s3cret-password").await, Err(AuthError::InvalidCredentials));
}

#[tokio::test]
async fn test_register_stores_hash_not_password() {
    let server = MockServer::start().await;
    mount_lookup(&server, "frontdesk", json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/admins"))
        .and(body_partial_json(json!({ "username": "frontdesk", "is_superadmin": false })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            admin_row("frontdesk", "desk-password", false)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (service, _) = service(&server);
    let admin = service
        .register(AdminRegisterRequest {
            username: "frontdesk".to_string(),
            password: "desk-password".to_string(),
            is_superadmin: false,
        })
        .await
        .unwrap();
    assert_eq!(admin.username, "frontdesk");

    let requests = server.received_requests().await.unwrap();
    let insert = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
    let body: Value = serde_json::from_slice(&insert.body).unwrap();
    assert!(body["password_hash"].as_str().unwrap().starts_with("$argon2"));
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let server = MockServer::start().await;
    mount_lookup(&server, "root", json!([admin_row("root", "s3cret-password", true)])).await;

    let (service, _) = service(&server);
    let result = service
        .register(AdminRegisterRequest {
            username: "root".to_string(),
            password: "another-password".to_string(),
            is_superadmin: false,
        })
        .await;
    assert_matches!(result, Err(AuthError::UsernameTaken(_)));
}

#[tokio::test]
async fn test_register_concurrent_duplicate() {
    let server = MockServer::start().await;
    mount_lookup(&server, "frontdesk", json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/admins"))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockSupabaseResponses::constraint_violation("admins_username_key"),
        ))
        .mount(&server)
        .await;

    let (service, _) = service(&server);
    let result = service
        .register(AdminRegisterRequest {
            username: "frontdesk".to_string(),
            password: "desk-password".to_string(),
            is_superadmin: false,
        })
        .await;
    assert_matches!(result, Err(AuthError::UsernameTaken(_)));
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let server = MockServer::start().await;

    let (service, _) = service(&server);
    let result = service
        .register(AdminRegisterRequest {
            username: "frontdesk".to_string(),
            password: "short".to_string(),
            is_superadmin: false,
        })
        .await;
    assert_matches!(result, Err(AuthError::ValidationError(_)));
}

#[tokio::test]
async fn test_bootstrap_admin_created_once() {
    let server = MockServer::start().await;
    mount_lookup(&server, "root", json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/admins"))
        .and(body_partial_json(json!({ "username": "root", "is_superadmin": true })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            admin_row("root", "s3cret-password", true)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (service, _) = service(&server);
    let bootstrap = BootstrapAdmin {
        username: "root".to_string(),
        password: "s3cret-password".to_string(),
    };
    assert!(service.ensure_bootstrap_admin(&bootstrap).await.unwrap());
}

#[tokio::test]
async fn test_bootstrap_admin_left_alone_when_present() {
    let server = MockServer::start().await;
    mount_lookup(&server, "root", json!([admin_row("root", "s3cret-password", true)])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/admins"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let (service, _) = service(&server);
    let bootstrap = BootstrapAdmin {
        username: "root".to_string(),
        password: "s3cret-password".to_string(),
    };
    assert!(!service.ensure_bootstrap_admin(&bootstrap).await.unwrap());
}
