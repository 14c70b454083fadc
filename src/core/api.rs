//! Typed operations over the analytics backend.

use std::path::{Path, PathBuf};

use reqwest::Method;
use serde_json::json;

use crate::core::models::{
    AuthPayload, Category, CategoryWithMetrics, ExportFormat, ImportSummary, TimeRange, User,
};
use crate::core::poller::{PollOptions, Poller};
use crate::core::session::{SessionClient, SessionEvent};
use crate::error::{PulseError, Result};

pub const LOGIN_ENDPOINT: &str = "/api/auth/login";
pub const REGISTER_ENDPOINT: &str = "/api/auth/register";
pub const LOGOUT_ENDPOINT: &str = "/api/auth/logout";
pub const IMPORT_ENDPOINT: &str = "/api/import/csv";

/// Which metrics to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsQuery {
    pub category: Category,
    pub range: TimeRange,
}

impl MetricsQuery {
    #[must_use]
    pub const fn new(category: Category, range: TimeRange) -> Self {
        Self { category, range }
    }

    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "/api/metrics/{}?range={}",
            self.category.slug(),
            self.range.as_query()
        )
    }
}

/// Log in and store the returned credential.
///
/// # Errors
///
/// `LoginRejected` when the backend refuses the credentials, otherwise the
/// transport error.
pub async fn login(session: &SessionClient, email: &str, password: &str) -> Result<User> {
    let response = session
        .request::<AuthPayload>(
            LOGIN_ENDPOINT,
            Method::POST,
            Some(json!({ "email": email, "password": password })),
            false,
        )
        .await?;
    establish(session, response.into_result())
}

/// Create an account and store the returned credential.
///
/// # Errors
///
/// `LoginRejected` when the backend refuses the registration.
pub async fn register(
    session: &SessionClient,
    name: &str,
    email: &str,
    password: &str,
) -> Result<User> {
    let response = session
        .request::<AuthPayload>(
            REGISTER_ENDPOINT,
            Method::POST,
            Some(json!({ "name": name, "email": email, "password": password })),
            false,
        )
        .await?;
    establish(session, response.into_result())
}

fn establish(session: &SessionClient, payload: Result<AuthPayload>) -> Result<User> {
    let payload = payload.map_err(|e| match e {
        PulseError::Api { message, .. } => PulseError::LoginRejected { message },
        other => other,
    })?;
    session.adopt_tokens(&payload.tokens);
    session.emit(SessionEvent::LoggedIn);
    tracing::info!(user = %payload.user.email, role = ?payload.user.role, "Logged in");
    Ok(payload.user)
}

/// End the session. The server call is best effort; local state is always
/// cleared.
pub async fn logout(session: &SessionClient) {
    let url = session.url(LOGOUT_ENDPOINT);
    let outcome = session.send_once(|http| http.post(&url)).await;
    if let Err(e) = outcome {
        tracing::warn!(error = %e, "Logout request failed; clearing local session anyway");
    }

    session.set_credential(None);
    if let Err(e) = session.refresh_store().clear() {
        tracing::warn!(error = %e, "Could not clear stored refresh token");
    }
    session.emit(SessionEvent::LoggedOut);
}

/// One authenticated metrics fetch.
///
/// # Errors
///
/// `Api` for `success: false` envelopes, `SessionExpired` if the session
/// could not be renewed, transport errors otherwise.
pub async fn fetch_metrics(
    session: &SessionClient,
    query: MetricsQuery,
) -> Result<CategoryWithMetrics> {
    let (mut metrics, meta) = session
        .get::<CategoryWithMetrics>(&query.endpoint())
        .await?
        .into_parts()?;
    metrics.meta = meta;
    Ok(metrics)
}

/// Poll a metrics category.
#[must_use]
pub fn poll_metrics(
    session: &SessionClient,
    query: MetricsQuery,
    options: PollOptions,
) -> Poller<CategoryWithMetrics> {
    let session = session.clone();
    tracing::debug!(
        category = query.category.slug(),
        range = query.range.as_query(),
        interval_ms = options.interval.as_millis(),
        max_retries = options.max_retries,
        "Starting metrics subscription"
    );
    Poller::spawn(options, move || {
        let session = session.clone();
        async move { fetch_metrics(&session, query).await }
    })
}

/// Download an export into `out_dir` under its conventional file name.
///
/// # Errors
///
/// `DownloadFailed` or `SessionExpired`.
pub async fn export(
    session: &SessionClient,
    format: ExportFormat,
    query: MetricsQuery,
    out_dir: &Path,
) -> Result<PathBuf> {
    let endpoint = format!(
        "/api/export/{}?category={}&range={}",
        format.extension(),
        query.category.slug(),
        query.range.as_query()
    );
    let destination = out_dir.join(format.file_name(query.category, query.range));
    session.download(&endpoint, &destination).await
}

/// Upload a CSV file for import.
///
/// # Errors
///
/// `Io` if the file cannot be read, `Api` if the backend rejects it.
pub async fn import_csv(session: &SessionClient, path: &Path) -> Result<ImportSummary> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map_or_else(|| "import.csv".to_string(), |n| n.to_string_lossy().into_owned());

    let summary = session
        .upload::<ImportSummary>(IMPORT_ENDPOINT, &file_name, "text/csv", bytes)
        .await?
        .into_result()?;
    tracing::info!(
        imported = summary.imported,
        skipped = summary.skipped,
        "Import finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_endpoint_includes_range() {
        let query = MetricsQuery::new(Category::Traffic, TimeRange::Month);
        assert_eq!(query.endpoint(), "/api/metrics/traffic?range=30d");
    }

    #[test]
    fn default_query_is_overview_30d() {
        let query = MetricsQuery::default();
        assert_eq!(query.category, Category::Overview);
        assert_eq!(query.range, TimeRange::Month);
    }
}
