//! E2E tests for route authorization and the JSON API error contract

mod common;

use common::{TestServer, cookie_header, no_redirect_client};
use serde_json::json;

#[tokio::test]
async fn test_public_pages_render_without_session() {
    let server = TestServer::new().await;

    for path in ["/", "/login", "/error", "/health"] {
        let response = server
            .client
            .get(server.url(path))
            .send()
            .await
            .expect("request succeeds");
        assert_eq!(response.status(), 200, "expected 200 for {path}");
    }
}

#[tokio::test]
async fn test_protected_pages_redirect_to_login_without_session() {
    let server = TestServer::new().await;
    let client = no_redirect_client();

    for path in ["/home", "/profile"] {
        let response = client
            .get(server.url(path))
            .send()
            .await
            .expect("request succeeds");
        assert!(
            response.status().is_redirection(),
            "expected redirect for {path}"
        );
        assert_eq!(
            common::header(&response, "location").as_deref(),
            Some("/login"),
            "expected login redirect for {path}"
        );
    }
}

#[tokio::test]
async fn test_invalid_session_cookie_is_treated_as_unauthenticated() {
    let server = TestServer::new().await;
    let client = no_redirect_client();

    let response = client
        .get(server.url("/home"))
        .header("Cookie", cookie_header("not-a-real-session"))
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    assert_eq!(
        common::header(&response, "location").as_deref(),
        Some("/login")
    );
}

#[tokio::test]
async fn test_api_without_session_answers_error_body() {
    let server = TestServer::new().await;

    for path in ["/api/user", "/api/user/name", "/api/user/email"] {
        let response = server
            .client
            .get(server.url(path))
            .send()
            .await
            .expect("request succeeds");

        // Observed-behavior contract: HTTP 200 with an error body
        assert_eq!(response.status(), 200, "expected 200 for {path}");
        let body: serde_json::Value = response.json().await.expect("json body");
        assert_eq!(body, json!({ "error": "Not authenticated" }), "for {path}");
    }
}

#[tokio::test]
async fn test_landing_page_greets_signed_in_user() {
    let server = TestServer::new().await;
    let client = no_redirect_client();

    let session_id = server.login(&client).await;

    let body = client
        .get(server.url("/"))
        .header("Cookie", cookie_header(&session_id))
        .send()
        .await
        .expect("request succeeds")
        .text()
        .await
        .expect("response body");

    assert!(body.contains("Signed in as"));
    assert!(body.contains("ada@x.com"));
}

#[tokio::test]
async fn test_profile_page_dumps_attributes() {
    let server = TestServer::new().await;
    let client = no_redirect_client();

    let session_id = server.login(&client).await;

    let body = client
        .get(server.url("/profile"))
        .header("Cookie", cookie_header(&session_id))
        .send()
        .await
        .expect("request succeeds")
        .text()
        .await
        .expect("response body");

    assert!(body.contains("github"));
    assert!(body.contains("583231"));
    assert!(body.contains("login"));
}
