//! Mock backend fixtures for integration tests.
//!
//! Every helper mounts routes on a `wiremock::MockServer` that mirror what the
//! analytics backend returns: `{success, data, error, meta}` envelopes, a
//! token pair on login and refresh, and 401 for a stale bearer credential.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use pulse::core::models::{Category, Role};
use pulse::core::refresh_store::{MemoryRefreshStore, RefreshMode, RefreshStore};
use pulse::core::session::{SessionClient, SessionOptions};
use pulse::test_utils::{
    auth_envelope, failure_envelope, make_metrics, make_tokens, make_user, metrics_envelope,
    success_envelope,
};
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const PASSWORD: &str = "correct-horse";

/// Access credential handed out by login.
pub const LOGIN_ACCESS: &str = "login-access";
/// Access credential handed out by refresh.
pub const FRESH_ACCESS: &str = "fresh";
pub const REFRESH_TOKEN: &str = "refresh-1";

/// Session against `server` with a short timeout.
pub fn session_for(server: &MockServer, mode: RefreshMode) -> SessionClient {
    session_with_store(server, mode, Arc::new(MemoryRefreshStore::new()))
}

pub fn session_with_store(
    server: &MockServer,
    mode: RefreshMode,
    store: Arc<dyn RefreshStore>,
) -> SessionClient {
    SessionClient::new(
        SessionOptions::new(server.uri())
            .mode(mode)
            .timeout(Duration::from_secs(5))
            .refresh_store(store),
    )
    .expect("session client")
}

/// `{"success": true, "data": {...}}` for a traffic category.
pub fn traffic_body() -> Value {
    metrics_envelope(
        &make_metrics(Category::Traffic, &[("X", 10), ("Y", 32)]),
        false,
    )
}

pub fn unauthorized_body() -> Value {
    failure_envelope("UNAUTHORIZED", "Invalid or expired token")
}

/// Login succeeds for [`ADMIN_EMAIL`] with a body-mode token pair.
pub async fn mount_login(server: &MockServer) {
    let user = make_user(ADMIN_EMAIL, Role::Admin);
    let tokens = make_tokens(LOGIN_ACCESS, Some(REFRESH_TOKEN));
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_envelope(&user, &tokens)))
        .mount(server)
        .await;
}

/// Refresh succeeds after `delay`, issuing [`FRESH_ACCESS`]. Expects exactly
/// `times` calls.
pub async fn mount_refresh_ok(server: &MockServer, delay: Duration, times: u64) {
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success_envelope(json!({
                    "tokens": { "accessToken": FRESH_ACCESS, "refreshToken": "refresh-2" }
                })))
                .set_delay(delay),
        )
        .expect(times)
        .mount(server)
        .await;
}

/// Refresh is rejected with 401.
pub async fn mount_refresh_rejected(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(failure_envelope("INVALID_REFRESH", "Refresh token revoked"))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(times)
        .mount(server)
        .await;
}

/// `GET endpoint_path` returns `body` for `Bearer <token>` and 401 otherwise.
pub async fn mount_guarded(server: &MockServer, endpoint_path: &str, token: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(endpoint_path))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(endpoint_path))
        .respond_with(ResponseTemplate::new(401).set_body_json(unauthorized_body()))
        .with_priority(5)
        .mount(server)
        .await;
}
