use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Server-assigned session identifier
pub type SessionId = i64;

/// Result type for session API calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for pipeline operations
pub type UploadResult<T> = Result<T, UploadError>;

/// Errors from the remote session API
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced by the upload pipeline
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Upload pipeline is not configured")]
    NotConfigured,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cannot begin a session while {0:?}")]
    InvalidState(PipelineState),

    #[error("Session is closed")]
    SessionClosed,

    #[error("Start request failed: {0}")]
    Start(#[source] ApiError),

    #[error("Start response carried no usable session id: {body}")]
    MissingSessionId { body: String },

    #[error("End request failed: {0}")]
    End(#[source] ApiError),
}

/// Lifecycle of one upload session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Idle,
    Starting,
    Uploading,
    Ending,
    Ended,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Per-session configuration supplied by the embedding app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadConfig {
    #[serde(rename = "bearerToken", default)]
    pub auth_token: Option<String>,
    pub game_id: i64,
    pub prescription_id: i64,
}

impl UploadConfig {
    /// Bearer token, if a non-empty one was supplied
    pub fn bearer(&self) -> Option<&str> {
        self.auth_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Operator settings for the upload loop
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub post_interval: Duration,
    /// Used only when the start response has no usable id. Readings may end
    /// up attached to the wrong remote session, so leave unset outside of
    /// testing.
    pub session_id_override: Option<SessionId>,
    pub log_requests: bool,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            post_interval: Duration::from_secs(1),
            session_id_override: None,
            log_requests: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub game_id: i64,
    pub prescription_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartSessionResponse {
    pub id: SessionId,
}

/// One periodic reading, attention/meditation in 0..1 and band powers as
/// proportions of their sum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EegReading {
    pub session: SessionId,
    pub timestamp: DateTime<Utc>,
    pub attention: f32,
    pub meditation: f32,
    pub delta: f32,
    pub theta: f32,
    pub low_alpha: f32,
    pub high_alpha: f32,
    pub low_beta: f32,
    pub high_beta: f32,
    pub low_gamma: f32,
    pub mid_gamma: f32,
}
