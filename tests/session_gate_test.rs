//! Session gate integration tests

use crate::common::{location, TestApp, SESSION_COOKIE};
use reqwest::StatusCode;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod common;

#[tokio::test]
async fn test_protected_page_without_session_redirects_to_login() {
    let app = TestApp::spawn().await;

    let response = app
        .http_client()
        .get(app.url("/dashboard/wills?tab=drafts"))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response),
        "/login?callbackUrl=%2Fdashboard%2Fwills%3Ftab%3Ddrafts"
    );
}

#[tokio::test]
async fn test_tampered_session_redirects_to_login() {
    let app = TestApp::spawn().await;
    let token = app.session_token("a@x.com");
    let tampered = format!("{}x", token);

    let response = app
        .http_client()
        .get(app.url("/dashboard"))
        .header("cookie", format!("{}={}", SESSION_COOKIE, tampered))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert!(location(&response).starts_with("/login?callbackUrl="));
}

#[tokio::test]
async fn test_valid_session_passes_gate() {
    let app = TestApp::spawn().await;

    let response = app
        .http_client()
        .get(app.url("/dashboard"))
        .header("cookie", app.session_cookie("a@x.com"))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Welcome back, Test User."));
    assert!(body.contains("a@x.com"));
}

#[tokio::test]
async fn test_bearer_session_passes_gate() {
    let app = TestApp::spawn().await;

    let response = app
        .http_client()
        .get(app.url("/dashboard"))
        .bearer_auth(app.session_token("a@x.com"))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_stale_cookie_does_not_shadow_bearer() {
    let app = TestApp::spawn().await;

    let response = app
        .http_client()
        .get(app.url("/api/auth/session"))
        .header("cookie", format!("{}=left-over-from-last-week", SESSION_COOKIE))
        .bearer_auth(app.session_token("a@x.com"))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["user"]["email"], "a@x.com");
}

#[tokio::test]
async fn test_unprotected_paths_are_not_gated() {
    let app = TestApp::spawn().await;
    let client = app.http_client();

    let login = client.get(app.url("/login")).send().await.unwrap();
    assert_eq!(login.status(), StatusCode::OK);
    assert!(login.text().await.unwrap().contains("/api/auth/signin"));

    let health = client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    // Prefix matching is segment-aware
    let lookalike = client.get(app.url("/dashboardx")).send().await.unwrap();
    assert_eq!(lookalike.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_gate_does_not_touch_cookies() {
    let app = TestApp::spawn().await;

    let response = app
        .http_client()
        .get(app.url("/dashboard"))
        .header("cookie", app.session_cookie("a@x.com"))
        .send()
        .await
        .unwrap();

    assert!(response.headers().get("set-cookie").is_none());
}

#[tokio::test]
async fn test_signed_in_login_visit_goes_to_callback() {
    let app = TestApp::spawn().await;

    let response = app
        .http_client()
        .get(app.url("/login?callbackUrl=%2Fdashboard%2Fheirs"))
        .header("cookie", app.session_cookie("a@x.com"))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/dashboard/heirs");
}

#[tokio::test]
async fn test_session_endpoint_reports_user() {
    let app = TestApp::spawn().await;
    let client = app.http_client();

    let anonymous: serde_json::Value = client
        .get(app.url("/api/auth/session"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(anonymous, serde_json::json!({}));

    let signed_in: serde_json::Value = client
        .get(app.url("/api/auth/session"))
        .header("cookie", app.session_cookie("a@x.com"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(signed_in["user"]["email"], "a@x.com");
    assert_eq!(signed_in["user"]["name"], "Test User");
    assert!(signed_in["expires"].as_str().is_some());
}

#[tokio::test]
async fn test_ready_reflects_upstream() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.upstream)
        .await;

    let ready = app
        .http_client()
        .get(app.url("/ready"))
        .send()
        .await
        .unwrap();
    assert_eq!(ready.status(), StatusCode::OK);

    let down = TestApp::spawn_upstream_down().await;
    let not_ready = down
        .http_client()
        .get(down.url("/ready"))
        .send()
        .await
        .unwrap();
    assert_eq!(not_ready.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = not_ready.json().await.unwrap();
    assert_eq!(body["status"], "not_ready");
}
