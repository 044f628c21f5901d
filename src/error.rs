use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum RelayError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Missing 'contents' parameter")]
    MissingContents,

    #[error("Invalid history format: {0}")]
    InvalidHistory(#[from] HistoryError),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Unsupported path")]
    UnsupportedPath,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Gemini model error: {0}")]
    Upstream(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Reasons a `history` payload is rejected.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum HistoryError {
    #[error("{0}")]
    InvalidShape(&'static str),

    #[error("Role must be 'user' or 'model'")]
    InvalidRole,

    #[error("Parts must be a non-empty list")]
    EmptyParts,
}

/// Failures raised by a [`ModelClient`](crate::api::model_client::ModelClient).
#[derive(Debug, ThisError)]
pub enum ClientError {
    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to obtain access token: {0}")]
    Token(String),

    #[error("prompt blocked: {0}")]
    Blocked(String),

    #[error("invalid generation parameters: {0}")]
    InvalidParameters(String),

    #[error("invalid model name: {0:?}")]
    InvalidModel(String),
}

impl ClientError {
    /// Server-side failures are worth another attempt; everything else is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Status { status, .. } => *status >= 500,
            ClientError::Reqwest(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

impl From<ClientError> for RelayError {
    fn from(e: ClientError) -> Self {
        RelayError::Upstream(e.to_string())
    }
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidSignature => StatusCode::FORBIDDEN,
            RelayError::MissingContents
            | RelayError::InvalidHistory(_)
            | RelayError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            RelayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::UnsupportedPath => StatusCode::NOT_FOUND,
            RelayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::Upstream(_) | RelayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = ApiErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: String,
}
