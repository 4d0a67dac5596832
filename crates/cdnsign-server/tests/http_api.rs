//! HTTP wire-contract tests, driving the router without a socket.
//!
//! Run with: cargo test --package cdnsign-server --test http_api

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use cdnsign_core::{EngineOptions, RsaSha1Signer, SigningEngine};
use cdnsign_server::AppState;
use cdnsign_server::middleware::auth::ApiKeys;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

const TEST_RSA_KEY: &str = include_str!("../../cdnsign-core/tests/fixtures/test_rsa_key.pem");

const API_KEY: &str = "test-api-key";

fn app_with(options: EngineOptions, cookie_domain: Option<&str>) -> Router {
    let signer = RsaSha1Signer::from_pem(TEST_RSA_KEY).unwrap();
    let engine = SigningEngine::new(signer, "APKAEXAMPLE", options).unwrap();
    let state = AppState::new(
        engine,
        ApiKeys::new(vec![API_KEY.to_string()]),
        cookie_domain.map(str::to_string),
    );
    cdnsign_server::create_router(state)
}

fn app() -> Router {
    app_with(EngineOptions::default(), None)
}

fn sign_request() -> axum::http::request::Builder {
    Request::builder()
        .method("POST")
        .uri("/sign")
        .header(header::CONTENT_TYPE, "application/json")
}

fn authorized(body: Value) -> Request<Body> {
    sign_request()
        .header("X-API-Key", API_KEY)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_healthz_needs_no_key() {
    let response = app()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "ok": true, "service": "cdnsign-server" })
    );
}

#[tokio::test]
async fn test_missing_api_key_is_unauthorized() {
    let response = app()
        .oneshot(
            sign_request()
                .body(Body::from(
                    json!({ "request_type": "url", "resource_url": "https://cdn.example.com/a" })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await, json!({ "error": "Unauthorized" }));
}

#[tokio::test]
async fn test_wrong_api_key_is_unauthorized() {
    let response = app()
        .oneshot(
            sign_request()
                .header("X-API-Key", "guess")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bearer_token_is_accepted() {
    let response = app()
        .oneshot(
            sign_request()
                .header(header::AUTHORIZATION, format!("Bearer {API_KEY}"))
                .body(Body::from(
                    json!({ "request_type": "url", "resource_url": "https://cdn.example.com/a.png" })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_signed_url_response() {
    let response = app()
        .oneshot(authorized(json!({
            "request_type": "url",
            "resource_url": "https://cdn.example.com/file.png",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let body = json_body(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["mode"], "url");

    let signed_url = body["data"]["signed_url"].as_str().unwrap();
    assert!(signed_url.starts_with("https://cdn.example.com/file.png?Expires="));
    assert!(signed_url.contains("&Signature="));
    assert!(signed_url.ends_with("&Key-Pair-Id=APKAEXAMPLE"));
    assert!(!signed_url.contains("Policy="));
}

#[tokio::test]
async fn test_signed_cookie_response() {
    let response = app()
        .oneshot(authorized(json!({
            "request_type": "cookie",
            "resource_url": "https://cdn.example.com/videos/*",
            "expiry_seconds": 3600,
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let cookies: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cookies.len(), 3);
    assert!(cookies[0].starts_with("CloudFront-Policy="));
    assert!(cookies[1].starts_with("CloudFront-Signature="));
    assert_eq!(
        cookies[2],
        "CloudFront-Key-Pair-Id=APKAEXAMPLE; Domain=cdn.example.com; Path=/; Secure; HttpOnly"
    );
    for cookie in &cookies {
        assert!(cookie.ends_with("; Domain=cdn.example.com; Path=/; Secure; HttpOnly"));
    }

    assert_eq!(
        json_body(response).await,
        json!({ "status": "success", "mode": "cookie", "message": "Cookies set successfully" })
    );
}

#[tokio::test]
async fn test_configured_cookie_domain() {
    let response = app_with(EngineOptions::default(), Some(".example.com"))
        .oneshot(authorized(json!({
            "request_type": "cookie",
            "resource_url": "https://cdn.example.com/file.png",
        })))
        .await
        .unwrap();

    let first = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(first.starts_with("CloudFront-Expires="));
    assert!(first.contains("; Domain=.example.com;"));
}

#[tokio::test]
async fn test_always_custom_cookie_names() {
    let response = app_with(
        EngineOptions {
            always_custom_policy: true,
            ..Default::default()
        },
        None,
    )
    .oneshot(authorized(json!({
        "request_type": "cookie",
        "resource_url": "https://cdn.example.com/file.png",
    })))
    .await
    .unwrap();

    let first = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(first.starts_with("CloudFront-Policy="));
}

#[tokio::test]
async fn test_validation_errors_are_bad_requests() {
    let cases = [
        (json!({ "request_type": "url" }), "missing required parameter: resource_url"),
        (
            json!({ "request_type": "stream", "resource_url": "https://cdn.example.com/a" }),
            "invalid request_type 'stream': expected 'url' or 'cookie'",
        ),
        (
            json!({ "request_type": "url", "resource_url": "https://cdn.example.com/a", "client_ip": "not-an-ip" }),
            "invalid client_ip 'not-an-ip': expected an IPv4 address or IPv4 CIDR block",
        ),
        (
            json!({ "request_type": "url", "resource_url": "https://cdn.example.com/a", "expiry_seconds": 0 }),
            "invalid expiry: expiry_seconds must be greater than zero, got 0",
        ),
    ];

    for (body, expected) in cases {
        let response = app().oneshot(authorized(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], expected);
    }
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let response = app()
        .oneshot(
            sign_request()
                .header("X-API-Key", API_KEY)
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}
