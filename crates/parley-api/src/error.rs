use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error, warn};

use parley_types::api::ErrorResponse;

/// Every failure a handler can report. Storage failures arrive as
/// `anyhow::Error` and become `Server`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Auth(String),

    #[error("internal server error: {0}")]
    Server(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to the client. Server errors stay generic; the detail
    /// only goes to the log.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Server(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }

    fn log(&self) {
        match self {
            ApiError::Server(e) => error!(error = %e, "Request failed"),
            ApiError::Auth(msg) => warn!(reason = %msg, "Authentication failed"),
            ApiError::Validation(msg) | ApiError::Conflict(msg) => {
                debug!(reason = %msg, "Rejected request")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();

        let body = ErrorResponse {
            error: self.user_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(ApiError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Conflict("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Auth("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Server(anyhow::anyhow!("disk on fire")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn server_errors_hide_their_detail() {
        let err = ApiError::Server(anyhow::anyhow!("UNIQUE constraint failed: users.username"));
        assert_eq!(err.user_message(), "internal server error");

        let err = ApiError::Auth("unauthorized".into());
        assert_eq!(err.user_message(), "unauthorized");
    }
}
