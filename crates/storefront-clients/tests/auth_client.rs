//! Integration tests for `AuthClient` using wiremock HTTP mocks.

use storefront_clients::{AuthClient, ClientError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_ID: &str = "6f1c2a52-5a8e-4d7c-9f0e-1c1b8f0f3b11";

fn test_client(base_url: &str) -> AuthClient {
    AuthClient::new(base_url, "anon-key", 5).expect("client construction should not fail")
}

#[tokio::test]
async fn verify_returns_user_for_valid_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer good-token"))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": USER_ID,
            "email": "buyer@example.com",
            "aud": "authenticated"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let user = test_client(&server.uri())
        .verify("good-token")
        .await
        .expect("token should verify");

    assert_eq!(user.id.to_string(), USER_ID);
    assert_eq!(user.email.as_deref(), Some("buyer@example.com"));
}

#[tokio::test]
async fn verify_maps_401_to_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "msg": "invalid JWT"
        })))
        .mount(&server)
        .await;

    let result = test_client(&server.uri()).verify("expired").await;
    assert!(matches!(result, Err(ClientError::Unauthorized)));
}

#[tokio::test]
async fn verify_surfaces_upstream_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let result = test_client(&server.uri()).verify("token").await;
    match result {
        Err(ClientError::Upstream { status, body, .. }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected Upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn verify_rejects_payload_without_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "email": "x@y.z" })),
        )
        .mount(&server)
        .await;

    let result = test_client(&server.uri()).verify("token").await;
    assert!(matches!(result, Err(ClientError::Deserialize { .. })));
}
