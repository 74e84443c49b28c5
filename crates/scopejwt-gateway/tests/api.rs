//! HTTP behaviour of the gateway routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use scopejwt_auth::options::{
    with_blacklist, with_error_handler, with_expiration, with_key, with_signing_method_name,
};
use scopejwt_auth::{
    AuthError, ErrorResponse, Key, MapBlacklist, Service, ServiceOption, REJECTED_MESSAGE,
};
use scopejwt_core::ScopeKey;
use scopejwt_gateway::{create_router, GatewayConfig, GatewayState, SCOPE_HEADER};

const DEFAULT_SECRET: &[u8] = b"default-secret-default-secret-default-secret";
// HS512 needs at least 64 bytes
const SITE_SECRET: &[u8] = b"website-secret-website-secret-website-secret-website-secret-0123";

fn base_options() -> Vec<ServiceOption> {
    vec![
        with_key(ScopeKey::DEFAULT, Key::hmac(DEFAULT_SECRET)),
        with_signing_method_name(ScopeKey::DEFAULT, "HS256"),
        with_key(ScopeKey::website(1), Key::hmac(SITE_SECRET)),
        with_signing_method_name(ScopeKey::website(1), "HS512"),
        with_expiration(ScopeKey::website(1), Duration::from_secs(600)),
        with_blacklist(Arc::new(MapBlacklist::new())),
    ]
}

fn server_with(options: Vec<ServiceOption>) -> TestServer {
    let service = Arc::new(Service::new(options).unwrap());
    let config = GatewayConfig {
        token_endpoint: true,
        ..GatewayConfig::default()
    };
    let state = GatewayState::new(service, config);
    TestServer::new(create_router(state)).unwrap()
}

fn server() -> TestServer {
    server_with(base_options())
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

fn scope_header() -> HeaderName {
    HeaderName::from_static(SCOPE_HEADER)
}

async fn issue(server: &TestServer, scope: Option<&'static str>, claims: Value) -> String {
    let mut request = server.post("/v1/tokens").json(&json!({ "claims": claims }));
    if let Some(scope) = scope {
        request = request.add_header(scope_header(), HeaderValue::from_static(scope));
    }
    let response = request.await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["token_type"], "Bearer");
    body["token"].as_str().unwrap().to_string()
}

fn teapot(_scope: ScopeKey, _error: &AuthError) -> ErrorResponse {
    ErrorResponse {
        status: 418,
        code: "teapot",
        message: "no tea for you".to_string(),
    }
}

#[tokio::test]
async fn health_reports_scopes() {
    let response = server().get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["scopes"], 2);
}

#[tokio::test]
async fn issued_token_passes_whoami() {
    let server = server();
    let token = issue(&server, None, json!({ "sub": "42" })).await;

    let response = server
        .get("/v1/whoami")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["scope"], "default:0");
    assert_eq!(body["claims"]["sub"], "42");
    assert!(body["claims"]["exp"].is_i64());
    assert!(body.get("store").is_none());
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let response = server().get("/v1/whoami").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "unauthorized");
    assert_eq!(body["error"]["message"], REJECTED_MESSAGE);
}

#[tokio::test]
async fn rejections_are_indistinguishable() {
    let server = server();
    let token = issue(&server, None, json!({})).await;
    let (signed, signature) = token.rsplit_once('.').unwrap();
    let flipped = if signature.starts_with('A') { 'B' } else { 'A' };
    let tampered = format!("{signed}.{flipped}{}", &signature[1..]);

    let missing = server.get("/v1/whoami").await.text();
    let garbage = server
        .get("/v1/whoami")
        .add_header(AUTHORIZATION, bearer("not.a.token"))
        .await
        .text();
    let forged = server
        .get("/v1/whoami")
        .add_header(AUTHORIZATION, bearer(&tampered))
        .await
        .text();
    assert_eq!(missing, garbage);
    assert_eq!(missing, forged);
}

#[tokio::test]
async fn logout_revokes_token() {
    let server = server();
    let token = issue(&server, None, json!({ "sub": "7" })).await;

    let response = server
        .post("/v1/logout")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let response = server
        .get("/v1/whoami")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["message"], REJECTED_MESSAGE);
}

#[tokio::test]
async fn store_claim_switches_store() {
    let server = server();
    let token = issue(&server, None, json!({ "store": "de" })).await;

    let body: Value = server
        .get("/v1/whoami")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(body["store"], "de");
}

#[tokio::test]
async fn scope_header_selects_website_config() {
    let server = server();
    let token = issue(&server, Some("website:1"), json!({ "sub": "site" })).await;

    let response = server
        .get("/v1/whoami")
        .add_header(scope_header(), HeaderValue::from_static("website:1"))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["scope"], "website:1");

    // signed with the website key, so the default scope rejects it
    let response = server
        .get("/v1/whoami")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unconfigured_website_uses_default() {
    let server = server();
    let token = issue(&server, Some("website:9"), json!({})).await;

    let response = server
        .get("/v1/whoami")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn query_token_is_accepted() {
    let server = server();
    let token = issue(&server, None, json!({})).await;

    let response = server
        .get("/v1/whoami")
        .add_query_param("access_token", &token)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn scope_error_handler_shapes_response() {
    let mut options = base_options();
    options.push(with_error_handler(ScopeKey::website(1), Arc::new(teapot)));
    let server = server_with(options);

    let response = server
        .get("/v1/whoami")
        .add_header(scope_header(), HeaderValue::from_static("website:1"))
        .await;
    assert_eq!(response.status_code(), StatusCode::IM_A_TEAPOT);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "teapot");
    assert_eq!(body["error"]["message"], "no tea for you");

    // other scopes keep the default handler
    let response = server.get("/v1/whoami").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}
