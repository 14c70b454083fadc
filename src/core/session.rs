//! Session client: authenticated requests with transparent credential renewal.
//!
//! A [`SessionClient`] owns the in-memory access credential for one backend.
//! Clones share the same session. Every authenticated request reads the
//! credential at send time; a 401 triggers the renewal protocol:
//!
//! 1. The first 401 becomes the renewal leader and calls `/api/auth/refresh`.
//! 2. Concurrent 401s queue behind it (see [`RenewalGate`]).
//! 3. On success every queued request is replayed once with the new
//!    credential. On failure the credential is cleared, every queued request
//!    fails with [`PulseError::SessionExpired`], and
//!    [`SessionEvent::Expired`] is broadcast so the UI can send the user back
//!    to login.
//!
//! Unauthenticated requests (`require_auth = false`) never renew.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::broadcast;

use crate::core::envelope::{ApiResponse, read_envelope};
use crate::core::http::{DEFAULT_TIMEOUT, build_client, join_url};
use crate::core::models::{AuthTokens, RefreshPayload};
use crate::core::refresh_store::{MemoryRefreshStore, RefreshMode, RefreshStore};
use crate::core::renewal::{RenewalFailure, RenewalGate, RenewalOutcome, Ticket};
use crate::error::{PulseError, Result};

/// Refresh endpoint.
pub const REFRESH_ENDPOINT: &str = "/api/auth/refresh";

const EVENT_CAPACITY: usize = 16;

/// Session lifecycle signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Login or registration stored a fresh credential.
    LoggedIn,
    /// A 401 was healed by a successful renewal.
    Renewed,
    /// Renewal failed; the user has to log in again.
    Expired { reason: String },
    /// The session was ended locally.
    LoggedOut,
}

/// Options for constructing a [`SessionClient`].
pub struct SessionOptions {
    pub base_url: String,
    pub mode: RefreshMode,
    pub timeout: Duration,
    pub refresh_store: Arc<dyn RefreshStore>,
}

impl SessionOptions {
    /// Cookie-mode options with an in-memory store and the default timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            mode: RefreshMode::Cookie,
            timeout: DEFAULT_TIMEOUT,
            refresh_store: Arc::new(MemoryRefreshStore::new()),
        }
    }

    #[must_use]
    pub const fn mode(mut self, mode: RefreshMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn refresh_store(mut self, store: Arc<dyn RefreshStore>) -> Self {
        self.refresh_store = store;
        self
    }
}

struct SessionInner {
    http: Client,
    base_url: String,
    mode: RefreshMode,
    timeout: Duration,
    refresh_store: Arc<dyn RefreshStore>,
    credential: Mutex<Option<String>>,
    renewal: RenewalGate,
    events: broadcast::Sender<SessionEvent>,
}

/// Authenticated HTTP access to the analytics backend.
#[derive(Clone)]
pub struct SessionClient {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("base_url", &self.inner.base_url)
            .field("mode", &self.inner.mode)
            .field("has_credential", &self.credential().is_some())
            .field("renewing", &self.is_renewing())
            .finish_non_exhaustive()
    }
}

impl SessionClient {
    /// Create a session with no credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(options: SessionOptions) -> Result<Self> {
        let http = build_client(options.timeout)?;
        Ok(Self::with_http_client(http, options))
    }

    /// Create a session over an existing HTTP client.
    #[must_use]
    pub fn with_http_client(http: Client, options: SessionOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(SessionInner {
                http,
                base_url: options.base_url.trim_end_matches('/').to_string(),
                mode: options.mode,
                timeout: options.timeout,
                refresh_store: options.refresh_store,
                credential: Mutex::new(None),
                renewal: RenewalGate::new(),
                events,
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Credential accessors
    // -------------------------------------------------------------------------

    /// Current access credential.
    #[must_use]
    pub fn credential(&self) -> Option<String> {
        self.inner
            .credential
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Replace the access credential. Never persisted.
    pub fn set_credential(&self, token: Option<String>) {
        if let Ok(mut guard) = self.inner.credential.lock() {
            *guard = token;
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    #[must_use]
    pub fn mode(&self) -> RefreshMode {
        self.inner.mode
    }

    /// Whether a renewal call is in flight.
    #[must_use]
    pub fn is_renewing(&self) -> bool {
        self.inner.renewal.is_in_flight()
    }

    /// Subscribe to session lifecycle signals.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn refresh_store(&self) -> &dyn RefreshStore {
        self.inner.refresh_store.as_ref()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No receivers is fine.
        let _ = self.inner.events.send(event);
    }

    /// Store the tokens returned by login, register or refresh.
    pub(crate) fn adopt_tokens(&self, tokens: &AuthTokens) {
        self.set_credential(Some(tokens.access_token.clone()));
        if self.inner.mode == RefreshMode::Body {
            if let Some(refresh) = &tokens.refresh_token {
                if let Err(e) = self.inner.refresh_store.save(refresh) {
                    tracing::warn!(error = %e, "Could not persist refresh token");
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Request primitives
    // -------------------------------------------------------------------------

    /// Send a JSON request and parse the response envelope.
    ///
    /// Statuses other than a renewable 401 pass through as the parsed
    /// envelope; a 401 on the retried request is returned as-is.
    ///
    /// # Errors
    ///
    /// `Network`/`Timeout` on transport failure, `SessionExpired` if the
    /// credential could not be renewed, `ParseResponse` for a 2xx body that
    /// is not an envelope.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<Value>,
        require_auth: bool,
    ) -> Result<ApiResponse<T>> {
        let url = self.url(endpoint);
        tracing::debug!(%method, %url, require_auth, "API request");

        let response = self
            .send_with_renewal(
                |http| {
                    let builder = http.request(method.clone(), &url);
                    match &body {
                        Some(body) => builder.json(body),
                        None => builder,
                    }
                },
                require_auth,
            )
            .await?;

        read_envelope(response).await
    }

    /// Authenticated GET.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<ApiResponse<T>> {
        self.request(endpoint, Method::GET, None, true).await
    }

    /// Authenticated POST with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Value,
    ) -> Result<ApiResponse<T>> {
        self.request(endpoint, Method::POST, Some(body), true).await
    }

    /// Authenticated GET of a binary payload, written to `destination`.
    ///
    /// # Errors
    ///
    /// `SessionExpired` if renewal failed; `DownloadFailed` for any other
    /// failure. Downloads are never retried beyond the renewal replay.
    pub async fn download(&self, endpoint: &str, destination: &Path) -> Result<PathBuf> {
        let url = self.url(endpoint);
        tracing::debug!(%url, destination = %destination.display(), "Download");

        let response = self
            .send_with_renewal(|http| http.get(&url), true)
            .await
            .map_err(|e| match e {
                PulseError::SessionExpired { .. } => e,
                other => PulseError::DownloadFailed {
                    status: None,
                    reason: other.to_string(),
                },
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PulseError::DownloadFailed {
                status: Some(status.as_u16()),
                reason: status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PulseError::DownloadFailed {
                status: Some(status.as_u16()),
                reason: e.to_string(),
            })?;

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PulseError::from_io_at(e, parent))?;
        }
        tokio::fs::write(destination, &bytes)
            .await
            .map_err(|e| PulseError::from_io_at(e, destination))?;
        tracing::info!(bytes = bytes.len(), path = %destination.display(), "Download saved");
        Ok(destination.to_path_buf())
    }

    /// Multipart upload of one file under the field name `file`.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn upload<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<ApiResponse<T>> {
        let url = self.url(endpoint);
        tracing::debug!(%url, file_name, size = bytes.len(), "Upload");

        let response = self
            .send_with_renewal(
                |http| {
                    let part = reqwest::multipart::Part::bytes(bytes.clone())
                        .file_name(file_name.to_string());
                    let part = part.mime_str(mime).unwrap_or_else(|_| {
                        reqwest::multipart::Part::bytes(bytes.clone())
                            .file_name(file_name.to_string())
                    });
                    http.post(&url)
                        .multipart(reqwest::multipart::Form::new().part("file", part))
                },
                true,
            )
            .await?;

        read_envelope(response).await
    }

    /// Send without any renewal handling, attaching the credential if held.
    pub(crate) async fn send_once(&self, build: impl Fn(&Client) -> RequestBuilder) -> Result<Response> {
        self.dispatch(&build, self.credential()).await
    }

    // -------------------------------------------------------------------------
    // Renewal protocol
    // -------------------------------------------------------------------------

    async fn send_with_renewal<F>(&self, build: F, require_auth: bool) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let token = if require_auth { self.credential() } else { None };
        let response = self.dispatch(&build, token).await?;

        if !require_auth || response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!(url = %response.url(), "Access credential rejected; renewing");
        let renewed = self.renew().await?;
        self.dispatch(&build, Some(renewed)).await
    }

    async fn dispatch<F>(&self, build: &F, token: Option<String>) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut builder = build(&self.inner.http);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder
            .send()
            .await
            .map_err(|e| PulseError::from_transport(&e, self.inner.timeout.as_secs()))
    }

    /// Obtain a renewed credential, leading or joining the single renewal.
    async fn renew(&self) -> Result<String> {
        match self.inner.renewal.enter() {
            Ticket::Waiter(rx) => match rx.await {
                Ok(Ok(token)) => Ok(token),
                Ok(Err(failure)) => Err(PulseError::SessionExpired {
                    reason: failure.reason,
                }),
                Err(_) => Err(PulseError::SessionExpired {
                    reason: "renewal was abandoned".to_string(),
                }),
            },
            Ticket::Leader(guard) => {
                let outcome: RenewalOutcome = self.exchange_refresh_credential().await;
                match &outcome {
                    Ok(_) => {
                        let released = guard.complete(&outcome);
                        tracing::info!(released, "Access credential renewed");
                        self.emit(SessionEvent::Renewed);
                    }
                    Err(failure) => {
                        self.set_credential(None);
                        let released = guard.complete(&outcome);
                        tracing::warn!(reason = %failure, released, "Credential renewal failed; session expired");
                        self.emit(SessionEvent::Expired {
                            reason: failure.reason.clone(),
                        });
                    }
                }
                outcome.map_err(|failure| PulseError::SessionExpired {
                    reason: failure.reason,
                })
            }
        }
    }

    /// Call the refresh endpoint and store the resulting tokens.
    async fn exchange_refresh_credential(&self) -> RenewalOutcome {
        let body = match self.inner.mode {
            RefreshMode::Cookie => None,
            RefreshMode::Body => match self.inner.refresh_store.load() {
                Ok(Some(token)) => Some(json!({ "refreshToken": token })),
                Ok(None) => return Err(RenewalFailure::new("no refresh credential stored")),
                Err(e) => return Err(RenewalFailure::new(e.to_string())),
            },
        };

        let url = self.url(REFRESH_ENDPOINT);
        let build = |http: &Client| {
            let builder = http.post(&url);
            match &body {
                Some(body) => builder.json(body),
                None => builder,
            }
        };

        let response = self
            .dispatch(&build, None)
            .await
            .map_err(|e| RenewalFailure::new(e.to_string()))?;
        let envelope: ApiResponse<RefreshPayload> = read_envelope(response)
            .await
            .map_err(|e| RenewalFailure::new(e.to_string()))?;

        let status = envelope.status;
        let tokens = envelope
            .into_result()
            .map_err(|e| RenewalFailure::new(format!("refresh rejected (HTTP {status}): {e}")))?
            .into_tokens();

        self.adopt_tokens(&tokens);
        Ok(tokens.access_token)
    }

    pub(crate) fn url(&self, endpoint: &str) -> String {
        join_url(&self.inner.base_url, endpoint)
    }
}
