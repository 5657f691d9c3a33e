//! Service-wide error type and its mapping onto HTTP responses.
//!
//! Every handler returns `Result<_, AppError>`. The response body is always
//! `{ "error": "<message>" }`, with unauthenticated calls also carrying the
//! auth entry point under `redirect`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::gateway::GatewayError;

pub type Result<T> = std::result::Result<T, AppError>;

/// Where clients are sent when they need a session.
pub const AUTH_ENTRY_POINT: &str = "/auth";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing image data")]
    MissingImage,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("AI credits exhausted. Please add credits.")]
    CreditsExhausted,

    #[error("AI gateway error: {0}")]
    Upstream(u16),

    #[error("AI gateway request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("No analysis returned from AI")]
    EmptyAnalysis,

    #[error("AI returned malformed analysis: {0}")]
    MalformedAnalysis(String),

    #[error("Please log in to save analyses.")]
    Unauthenticated,

    #[error("Signed URL is invalid or expired")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Failed to serialize analysis: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingImage | AppError::InvalidBody(_) | AppError::InvalidImage(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::CreditsExhausted => StatusCode::PAYMENT_REQUIRED,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NotConfigured(_)
            | AppError::Upstream(_)
            | AppError::Transport(_)
            | AppError::EmptyAnalysis
            | AppError::MalformedAnalysis(_)
            | AppError::Database(_)
            | AppError::Storage(_)
            | AppError::Serialization(_)
            | AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Http(e) => AppError::Transport(e),
            GatewayError::Api { status: 429, .. } => AppError::RateLimited,
            GatewayError::Api { status: 402, .. } => AppError::CreditsExhausted,
            GatewayError::Api { status, .. } => AppError::Upstream(status),
            GatewayError::EmptyContent => AppError::EmptyAnalysis,
            GatewayError::Parse(msg) => AppError::MalformedAnalysis(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        let body = match self {
            AppError::Unauthenticated => json!({
                "error": self.to_string(),
                "redirect": AUTH_ENTRY_POINT,
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
