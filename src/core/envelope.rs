//! The `{success, data, error, meta}` response envelope.
//!
//! Every JSON endpoint of the backend wraps its payload in this envelope.
//! The session client hands envelopes back untouched; callers decide how
//! to treat `success: false` (usually via [`ApiResponse::into_result`]).

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{PulseError, Result};

/// Error object carried by a failed envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

/// Cache metadata attached by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<String>,
}

impl ResponseMeta {
    /// Whether the backend served this payload from its cache.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.cached.unwrap_or(false)
    }
}

/// Parsed response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
    /// HTTP status the envelope arrived with. Not part of the wire format.
    #[serde(skip)]
    pub status: u16,
}

impl<T> ApiResponse<T> {
    /// Build a failed envelope for a response that did not carry one.
    #[must_use]
    pub fn synthesized_failure(status: StatusCode, body: &str) -> Self {
        let message = if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body.trim().chars().take(200).collect()
        };
        Self {
            success: false,
            data: None,
            error: Some(ApiErrorBody {
                code: format!("HTTP_{}", status.as_u16()),
                message,
            }),
            meta: None,
            status: status.as_u16(),
        }
    }

    /// Whether the response arrived with HTTP 401.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Convert into the payload, turning `success: false` into [`PulseError::Api`].
    ///
    /// # Errors
    ///
    /// Returns `Api` for failed envelopes and `ParseResponse` for a
    /// successful envelope without data.
    pub fn into_result(self) -> Result<T> {
        if !self.success {
            let status = Some(self.status).filter(|s| *s != 0);
            let error = self.error.unwrap_or_else(|| ApiErrorBody {
                code: "UNKNOWN".to_string(),
                message: "request failed".to_string(),
            });
            return Err(PulseError::Api {
                code: error.code,
                message: error.message,
                status,
            });
        }
        self.data
            .ok_or_else(|| PulseError::ParseResponse("envelope has no data".to_string()))
    }

    /// Like [`into_result`](Self::into_result) but keeps the cache metadata.
    ///
    /// # Errors
    ///
    /// Same as `into_result`.
    pub fn into_parts(self) -> Result<(T, Option<ResponseMeta>)> {
        let meta = self.meta.clone();
        self.into_result().map(|data| (data, meta))
    }
}

/// Read an envelope out of an HTTP response.
///
/// Non-2xx bodies that are not envelopes are synthesized into a failed
/// envelope so callers see a single shape for every status.
///
/// # Errors
///
/// Returns `Network` if the body cannot be read, or `ParseResponse` if a
/// 2xx body is not an envelope.
pub async fn read_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<ApiResponse<T>> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| PulseError::Network(e.to_string()))?;

    match serde_json::from_slice::<ApiResponse<T>>(&bytes) {
        Ok(mut envelope) => {
            envelope.status = status.as_u16();
            Ok(envelope)
        }
        Err(e) if status.is_success() => Err(PulseError::ParseResponse(e.to_string())),
        Err(_) => Ok(ApiResponse::synthesized_failure(
            status,
            &String::from_utf8_lossy(&bytes),
        )),
    }
}
