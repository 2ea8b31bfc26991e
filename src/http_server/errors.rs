//! # HTTP API Errors
//!
//! Error-to-response mapping for the HTTP surface. Interpreter envelopes
//! are NOT errors: `/execute-query` always answers 200 with an envelope;
//! this type covers the surrounding auth and notebook plumbing.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;
use crate::notebook::NotebookError;
use crate::observability::Logger;

/// Result type for HTTP handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// HTTP API errors
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Request body failed validation
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Bearer token required
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Authentication error
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Notebook error
    #[error("{0}")]
    Notebook(#[from] NotebookError),
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            ApiError::Auth(err) => {
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::UNAUTHORIZED)
            }
            ApiError::Notebook(err) => StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            Logger::error("API_ERROR", &[("error", &self.to_string())]);
        }
        let body = Json(ErrorResponse {
            code: status.as_u16(),
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::AuthenticationRequired.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Auth(AuthError::UsernameTaken("a".to_string())).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Notebook(NotebookError::NotOwner).status_code(),
            StatusCode::FORBIDDEN
        );
    }
}
