//! Error handling for the HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

/// Standard error response format for all HTTP errors
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub details: Vec<serde_json::Value>,
    pub message: String,
    pub code: String,
    pub trace_id: String,
    pub timestamp: String,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("not found: {message}")]
    NotFound { message: String, code: String },

    #[error("bad gateway: {message}")]
    BadGateway { message: String, code: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            code: "not_found".to_string(),
        }
    }

    /// Create an error for a failed upstream call
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::BadGateway {
            message: message.into(),
            code: "bad_gateway".to_string(),
        }
    }

    /// Wrap any error as an internal server error
    pub fn internal<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal(anyhow::Error::new(error))
    }

    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_body(self, trace_id: Uuid, timestamp: String) -> ErrorBody {
        let (code, message) = match self {
            AppError::NotFound { message, code } | AppError::BadGateway { message, code } => {
                (code, message)
            }
            AppError::Internal(e) => ("internal_error".to_string(), format!("{e:#}")),
        };

        ErrorBody {
            details: Vec::new(),
            message,
            code,
            trace_id: trace_id.to_string(),
            timestamp,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4();
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| OffsetDateTime::now_utc().to_string());
        let status = self.status();

        let mut body = self.into_body(error_id, timestamp);

        tracing::error!(
            error_id = %error_id,
            error_code = %body.code,
            status_code = %status.as_u16(),
            message = %body.message,
            "Request error"
        );

        // Internal details stay in the logs for release builds
        if cfg!(not(debug_assertions)) && status == StatusCode::INTERNAL_SERVER_ERROR {
            body.message = "An internal server error occurred".to_string();
        }

        (status, Json(json!({ "error": body }))).into_response()
    }
}
