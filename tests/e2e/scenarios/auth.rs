use crate::harness::{Scenario, ServiceStub, ISSUED_TOKEN};
use probe_core::{build_http_client, AuthServiceClient, Credentials, ServiceEnv, SuiteKind};
use std::time::Duration;

fn auth_client(base_url: &str) -> AuthServiceClient {
    let http = build_http_client(Duration::from_secs(5)).unwrap();
    AuthServiceClient::new(http, base_url, "v0.2.1")
}

#[tokio::test]
async fn test_invalid_credentials_are_unauthorized() {
    let stub = ServiceStub::spawn().unwrap();

    let envelope = auth_client(stub.base_url())
        .login(&Credentials::new("test", "test"))
        .await
        .unwrap();

    assert_eq!(envelope.status().as_u16(), 401);
    assert!(!envelope.is_success());
    assert!(!envelope.has_valid_token());
    assert!(envelope.raw_body().contains("invalid credentials"));
}

#[tokio::test]
async fn test_valid_credentials_yield_token() {
    let stub = ServiceStub::spawn().unwrap();

    let envelope = auth_client(stub.base_url())
        .login(&Credentials::new("admin", "admin"))
        .await
        .unwrap();

    assert!(envelope.is_success());
    let token = envelope.token().expect("token");
    assert_eq!(token.as_str(), ISSUED_TOKEN);
    assert_eq!(token.preview(), "eyJhbGciOiJIUzI1NiJ9... (48 chars)");
}

#[tokio::test]
async fn test_login_wire_format() {
    let stub = ServiceStub::spawn().unwrap();

    auth_client(stub.base_url())
        .login(&Credentials::new("admin", "s3cret"))
        .await
        .unwrap();

    let requests = stub.requests_to("/api/v0.2.1/auth/login");
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(body, serde_json::json!({ "username": "admin", "password": "s3cret" }));
    assert!(requests[0].bearer.is_none());
}

#[tokio::test]
async fn test_auth_suite_passes() {
    Scenario::new("auth_suite_passes")
        .only(&[SuiteKind::Auth])
        .assert_passed("Test 1")
        .assert_passed("Test 2")
        .assert_mentions("Test 2", "eyJhbGciOiJIUzI1NiJ9... (48 chars)")
        .assert_requests("/auth/login", 2)
        .assert_completed()
        .assert_exit_code(0)
        .assert_custom(|report, _| {
            let json = serde_json::to_string(report)?;
            anyhow::ensure!(!json.contains(ISSUED_TOKEN), "full token leaked into report");
            Ok(())
        })
        .run()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unreachable_auth_aborts_run() {
    Scenario::new("unreachable_auth_aborts_run")
        .service_down(ServiceEnv::AuthUrl)
        .assert_connection_error("Test 1")
        .assert_mentions("Test 1", "docker")
        .assert_not_run("Test 2")
        .assert_aborted()
        .assert_exit_code(1)
        .assert_executed(1)
        .assert_skipped(6)
        .assert_requests("/registry/register", 0)
        .run()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rejected_login_abandons_dependent_cases() {
    Scenario::new("rejected_login_abandons")
        .reject_all_logins()
        .include_protected()
        .assert_passed("Test 1")
        .assert_unexpected("Test 2")
        .assert_abandoned("Test 6")
        .assert_abandoned("Test 7")
        .assert_abandoned("Test 9")
        .assert_requests("/registry/allocate", 1)
        .assert_completed()
        .assert_exit_code(0)
        .run()
        .await
        .unwrap();
}
