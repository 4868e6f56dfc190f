use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::models::AuthError;
use auth_cell::services::{PasscodeService, PatientLoginService};
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::Role;
use shared_utils::jwt::validate_token;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

const MOBILE: &str = "+353871234567";

fn config(server: &MockServer, gateway: Option<&MockServer>) -> AppConfig {
    let mut config = TestConfig::with_supabase_url(server.uri()).to_app_config();
    if let Some(gateway) = gateway {
        config.sms_gateway_url = format!("{}/sms", gateway.uri());
        config.sms_gateway_token = "gateway-token".to_string();
    }
    config
}

fn passcodes(config: &AppConfig) -> PasscodeService {
    PasscodeService::with_client(Arc::new(SupabaseClient::new(config)), config)
}

#[tokio::test]
async fn test_issue_replaces_record_and_delivers() {
    let server = MockServer::start().await;
    let gateway = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/passcodes"))
        .and(query_param("on_conflict", "mobile_number"))
        .and(body_partial_json(json!({ "mobile_number": MOBILE, "verified": false })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::passcode_response(MOBILE, "482913", false)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/sms"))
        .and(header("authorization", "Bearer gateway-token"))
        .and(body_partial_json(json!({ "to": MOBILE })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "queued": true })))
        .expect(1)
        .mount(&gateway)
        .await;

    let config = config(&server, Some(&gateway));
    let expires_at = passcodes(&config).issue("+353 87 123 4567").await.unwrap();
    assert!(expires_at > chrono::Utc::now());
}

#[tokio::test]
async fn test_gateway_failure_does_not_fail_issue() {
    let server = MockServer::start().await;
    let gateway = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/passcodes"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::passcode_response(MOBILE, "482913", false)
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/sms"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&gateway)
        .await;

    let config = config(&server, Some(&gateway));
    assert!(passcodes(&config).issue(MOBILE).await.is_ok());
}

#[tokio::test]
async fn test_invalid_mobile_is_rejected_before_any_write() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/passcodes"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let config = config(&server, None);
    assert_matches!(passcodes(&config).issue("call me").await, Err(AuthError::InvalidMobile(_)));
}

#[tokio::test]
async fn test_verify_consumes_matching_passcode() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/passcodes"))
        .and(query_param("mobile_number", format!("eq.{}", MOBILE)))
        .and(query_param("code", "eq.482913"))
        .and(query_param("verified", "is.false"))
        .and(body_partial_json(json!({ "verified": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::passcode_response(MOBILE, "482913", true)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server, None);
    assert_eq!(passcodes(&config).verify(MOBILE, "482913").await.unwrap(), MOBILE);
}

#[tokio::test]
async fn test_used_or_expired_passcode_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/passcodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let config = config(&server, None);
    assert_matches!(passcodes(&config).verify(MOBILE, "482913").await, Err(AuthError::InvalidPasscode));
}

#[tokio::test]
async fn test_malformed_code_skips_the_store() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/passcodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let config = config(&server, None);
    assert_matches!(passcodes(&config).verify(MOBILE, "12ab").await, Err(AuthError::InvalidPasscode));
}

#[tokio::test]
async fn test_login_issues_patient_token() {
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
        .and(query_param("mobile_number", format!("eq.{}", MOBILE)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_response("pabc123", MOBILE)
        ])))
        .mount(&server)
        .await;

    let config = config(&server, None);
    let service = PatientLoginService::with_client(Arc::new(SupabaseClient::new(&config)), &config);

    let response = service.login(MOBILE, "482913").await.unwrap();
    assert_eq!(response.token_type, "bearer");
    assert_eq!(response.expires_in, 3600);
    assert_eq!(response.patient.id, "pabc123");

    let user = validate_token(&response.access_token, &config.jwt_secret).unwrap();
    assert_eq!(user.id, "pabc123");
    assert_eq!(user.role, Role::Patient);
}

#[tokio::test]
async fn test_login_with_wrong_code_creates_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/passcodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let config = config(&server, None);
    let service = PatientLoginService::with_client(Arc::new(SupabaseClient::new(&config)), &config);

    assert_matches!(service.login(MOBILE, "000000").await, Err(AuthError::InvalidPasscode));
}
