use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::provider::truncate_body;

/// Failures talking to the caddie backend.
///
/// Kept separate from the `anyhow` errors used elsewhere because callers
/// react to [`BackendError::Unauthorized`] by dropping the stored session.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Not signed in, or the session has expired.\nHint: run `caddie login`.")]
    Unauthorized,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Backend request failed with status {status}: {detail}")]
    Status { status: StatusCode, detail: String },

    #[error("Failed to reach the backend: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response from the backend: {0}")]
    Decode(#[from] serde_json::Error),
}

impl BackendError {
    pub(crate) fn from_status(status: StatusCode, body: &str) -> Self {
        BackendError::Status { status, detail: detail_from_body(body) }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BackendError::Unauthorized)
    }
}

/// The backend reports errors as `{"detail": ...}`, where `detail` is a
/// message string or a list of validation errors carrying `msg`.
fn detail_from_body(body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body).ok().and_then(|v| match v.get("detail")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let msgs: Vec<&str> =
                items.iter().filter_map(|item| item.get("msg").and_then(Value::as_str)).collect();
            (!msgs.is_empty()).then(|| msgs.join("; "))
        }
        _ => None,
    });

    detail.unwrap_or_else(|| truncate_body(body))
}
