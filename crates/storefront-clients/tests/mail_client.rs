//! Integration tests for `MailClient` using wiremock HTTP mocks.

use storefront_clients::{ClientError, MailClient};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> MailClient {
    MailClient::new(base_url, "mail-key", "shop@example.com", 5)
        .expect("client construction should not fail")
}

#[tokio::test]
async fn send_posts_single_recipient_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("authorization", "Bearer mail-key"))
        .and(body_json(serde_json::json!({
            "from": "shop@example.com",
            "to": ["buyer@example.com"],
            "subject": "Your order arrived",
            "html": "<p>Hello</p>"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "em_1" })))
        .expect(1)
        .mount(&server)
        .await;

    test_client(&server.uri())
        .send("buyer@example.com", "Your order arrived", "<p>Hello</p>")
        .await
        .expect("send should succeed");
}

#[tokio::test]
async fn send_reports_rejection_without_retrying() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(422).set_body_string("invalid from"))
        .expect(1)
        .mount(&server)
        .await;

    let result = test_client(&server.uri())
        .send("buyer@example.com", "Hi", "<p>Hi</p>")
        .await;

    assert!(matches!(
        result,
        Err(ClientError::Upstream { status: 422, .. })
    ));
}
