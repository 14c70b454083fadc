//! Tests for the log capture infrastructure and the session's log output.

use std::time::Duration;

use tracing::{error, info, warn};

mod common;
use common::fixtures::{
    FRESH_ACCESS, mount_guarded, mount_refresh_ok, session_for, traffic_body,
};
use common::log_capture::TestLogCapture;
use common::logger::TestLogger;
use pulse::core::api::{self, MetricsQuery};
use pulse::core::models::{Category, TimeRange};
use pulse::core::refresh_store::RefreshMode;
use wiremock::MockServer;

#[test]
fn test_log_capture_basic() {
    let capture = TestLogCapture::start();

    info!("This is an info message");
    warn!("This is a warning");

    capture.assert_logged("This is an info message");
    capture.assert_logged("This is a warning");
    capture.assert_logged_at_level(tracing::Level::INFO, "info message");
    capture.assert_logged_at_level(tracing::Level::WARN, "warning");
}

#[test]
fn test_log_capture_structured() {
    let capture = TestLogCapture::start();

    info!(user = "test_user", id = 123, "User action logged");

    capture.assert_logged("User action logged");
    capture.assert_field_logged("user", "test_user");
    capture.assert_field_logged("id", "123");
}

#[test]
#[should_panic(expected = "Unexpected errors")]
fn test_log_capture_errors() {
    let capture = TestLogCapture::start();

    info!("Everything is fine");
    capture.assert_no_errors();

    error!("Something went wrong");

    // This should panic
    capture.assert_no_errors();
}

#[test]
fn test_logger_with_capture_integration() {
    let (_logger, capture) = TestLogger::with_capture("test_logger_with_capture_integration");

    info!("Integration test log");

    capture.assert_logged("Integration test log");
}

#[tokio::test]
async fn renewal_is_logged_without_credentials() {
    let (log, capture) = TestLogger::with_capture("renewal_is_logged_without_credentials");
    let server = MockServer::start().await;
    mount_guarded(&server, "/api/metrics/traffic", FRESH_ACCESS, traffic_body()).await;
    mount_refresh_ok(&server, Duration::ZERO, 1).await;

    let session = session_for(&server, RefreshMode::Cookie);
    session.set_credential(Some("stale-secret".to_string()));

    log.phase("execute");
    api::fetch_metrics(
        &session,
        MetricsQuery::new(Category::Traffic, TimeRange::Month),
    )
    .await
    .unwrap();

    log.phase("verify");
    capture.assert_logged_at_level(tracing::Level::INFO, "Access credential renewed");
    capture.assert_field_logged("released", "0");
    assert_eq!(capture.count("Access credential renewed"), 1);
    capture.assert_never_logged("stale-secret");
    capture.assert_no_errors();
    log.finish_ok();
}
