//! Proxy API integration tests

use crate::common::TestApp;
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{json, Value};
use wiremock::matchers::{any, body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

mod common;

/// No upstream traffic is allowed for this app
async fn expect_no_upstream_calls(app: &TestApp) {
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.upstream)
        .await;
}

#[tokio::test]
async fn test_missing_owner_param_is_bad_request() {
    let app = TestApp::spawn().await;
    expect_no_upstream_calls(&app).await;

    let response = app
        .http_client()
        .get(app.url("/api/wills"))
        .header("cookie", app.session_cookie("a@x.com"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Missing user_email");
}

#[tokio::test]
async fn test_missing_session_is_unauthorized() {
    let app = TestApp::spawn().await;
    expect_no_upstream_calls(&app).await;

    let response = app
        .http_client()
        .get(app.url("/api/wills?user_email=a%40x.com"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Unauthorized - please sign in");
}

#[tokio::test]
async fn test_other_users_email_is_forbidden() {
    let app = TestApp::spawn().await;
    expect_no_upstream_calls(&app).await;

    let response = app
        .http_client()
        .get(app.url("/api/wills?user_email=a%40x.com"))
        .header("cookie", app.session_cookie("b@x.com"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Forbidden - can only access your own data");
}

#[tokio::test]
async fn test_duplicate_owner_param_is_forbidden() {
    let app = TestApp::spawn().await;
    expect_no_upstream_calls(&app).await;

    let response = app
        .http_client()
        .get(app.url("/api/documents/list?email=a%40x.com&email=b%40x.com"))
        .header("cookie", app.session_cookie("a@x.com"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_body_email_must_match_session() {
    let app = TestApp::spawn().await;
    expect_no_upstream_calls(&app).await;

    let response = app
        .http_client()
        .post(app.url("/api/bot/help"))
        .header("cookie", app.session_cookie("a@x.com"))
        .json(&json!({ "email": "b@x.com", "message": "hello" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_owner_request_forwarded_with_identity() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/wills"))
        .and(query_param("user_email", "A@X.com"))
        .and(header("x-user-email", "a@x.com"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "id": "w1", "status": "draft" }])),
        )
        .expect(1)
        .mount(&app.upstream)
        .await;

    let response = app
        .http_client()
        .get(app.url("/api/wills?user_email=A%40X.com"))
        .header("cookie", app.session_cookie("a@x.com"))
        .send()
        .await
        .unwrap();

    // Email comparison ignores case; the query is forwarded as sent
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!([{ "id": "w1", "status": "draft" }]));
}

#[tokio::test]
async fn test_heirs_post_relayed_verbatim() {
    let app = TestApp::spawn().await;
    let created = json!({ "id": 7, "name": "Jane", "relation": "daughter" });
    Mock::given(method("POST"))
        .and(path("/heirs"))
        .and(header("x-user-email", "a@x.com"))
        .and(body_json(json!({ "name": "Jane", "relation": "daughter" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(created.clone()))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let response = app
        .http_client()
        .post(app.url("/api/heirs"))
        .header("cookie", app.session_cookie("a@x.com"))
        .json(&json!({ "name": "Jane", "relation": "daughter" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, created);
}

#[tokio::test]
async fn test_heirs_require_session() {
    let app = TestApp::spawn().await;
    expect_no_upstream_calls(&app).await;

    let response = app
        .http_client()
        .get(app.url("/api/heirs"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upstream_error_body_relayed() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/wills/w9"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Will not found" })))
        .mount(&app.upstream)
        .await;

    let response = app
        .http_client()
        .get(app.url("/api/wills/w9?user_email=a%40x.com"))
        .header("cookie", app.session_cookie("a@x.com"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "detail": "Will not found" }));
}

#[tokio::test]
async fn test_will_pdf_download_headers() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/wills/w1/pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.4 test".to_vec()),
        )
        .mount(&app.upstream)
        .await;

    let response = app
        .http_client()
        .get(app.url("/api/wills/w1/pdf?user_email=a%40x.com"))
        .header("cookie", app.session_cookie("a@x.com"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/pdf");
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"will-w1.pdf\""
    );
    assert_eq!(response.bytes().await.unwrap().as_ref(), b"%PDF-1.4 test");
}

#[tokio::test]
async fn test_get_retried_on_bad_gateway() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/notary/requests"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&app.upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/notary/requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let response = app
        .http_client()
        .get(app.url("/api/notary?email=a%40x.com"))
        .header("cookie", app.session_cookie("a@x.com"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_post_not_retried() {
    let app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/payments/create-checkout"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let response = app
        .http_client()
        .post(app.url("/api/payments/create-checkout"))
        .header("cookie", app.session_cookie("a@x.com"))
        .json(&json!({ "email": "a@x.com", "plan": "premium" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "upstream_error");
}

#[tokio::test]
async fn test_compliance_is_public() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/compliance/rules"))
        .and(query_param("state", "CA"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "state": "CA", "witnesses": 2 })))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let response = app
        .http_client()
        .get(app.url("/api/compliance/rules?state=CA"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["witnesses"], 2);
}

#[tokio::test]
async fn test_path_traversal_rejected() {
    let app = TestApp::spawn().await;
    expect_no_upstream_calls(&app).await;

    let response = app
        .http_client()
        .get(app.url("/api/wills/w1%2fadmin?user_email=a%40x.com"))
        .header("cookie", app.session_cookie("a@x.com"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_api_responses_carry_security_headers() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/compliance/summary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&app.upstream)
        .await;

    let response = app
        .http_client()
        .get(app.url("/api/compliance/summary"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["cache-control"], "no-store");
    assert!(response.headers().contains_key("x-request-id"));
}
