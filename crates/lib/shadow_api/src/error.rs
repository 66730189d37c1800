//! Application error types.
//!
//! `From<AuthError>` is where specific auth failures are collapsed into
//! low-information client responses. The specific kind is logged here.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use shadow_core::auth::AuthError;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::TooManyRequests(m) => {
                (StatusCode::TOO_MANY_REQUESTS, "too_many_attempts", m.as_str())
            }
            AppError::ServiceUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                "Service temporarily unavailable",
            ),
            AppError::Internal(m) => {
                error!(error = %m, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        let kind = e.kind();
        match e {
            AuthError::InvalidCredentials => {
                debug!(kind, "credential check failed");
                AppError::Unauthorized("Invalid credentials".into())
            }
            AuthError::TokenInvalid | AuthError::TokenExpired => {
                debug!(kind, "session rejected");
                AppError::Unauthorized("Authentication required".into())
            }
            AuthError::AdminInvalid | AuthError::AdminAccessDenied => {
                debug!(kind, "admin access rejected");
                AppError::Forbidden("Admin access denied".into())
            }
            AuthError::TooManyAttempts => {
                AppError::TooManyRequests("Too many attempts, retry later".into())
            }
            AuthError::Validation(msg) => AppError::Validation(msg),
            AuthError::StoreUnavailable(msg)
            | AuthError::ExternalServiceUnavailable(msg)
            | AuthError::Provider(msg) => {
                warn!(kind, error = %msg, "dependency unavailable");
                AppError::ServiceUnavailable(msg)
            }
            AuthError::ProvisioningConflict => AppError::Internal("provisioning conflict".into()),
            AuthError::Config(msg) | AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(e: AuthError) -> StatusCode {
        AppError::from(e).into_response().status()
    }

    #[test]
    fn auth_failures_collapse_to_uniform_statuses() {
        assert_eq!(status_of(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::TokenInvalid), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::TokenExpired), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::AdminInvalid), StatusCode::FORBIDDEN);
        assert_eq!(status_of(AuthError::AdminAccessDenied), StatusCode::FORBIDDEN);
        assert_eq!(status_of(AuthError::TooManyAttempts), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            status_of(AuthError::StoreUnavailable("timeout".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn token_failures_share_one_message() {
        let invalid = AppError::from(AuthError::TokenInvalid).to_string();
        let expired = AppError::from(AuthError::TokenExpired).to_string();
        assert_eq!(invalid, expired);
    }
}
