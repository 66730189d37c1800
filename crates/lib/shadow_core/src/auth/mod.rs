//! Authentication and authorization logic.
//!
//! Provides password hashing, session/admin token management, local
//! credential checks, federated reconciliation, the admin login rate
//! limiter and the admin access controller.

pub mod admin;
pub mod credentials;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod reconcile;
pub mod signup;

use thiserror::Error;

use crate::store::StoreError;

/// Authentication errors.
///
/// Variants are specific so logs can say exactly which check failed; the
/// HTTP layer collapses them into low-information responses.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token invalid")]
    TokenInvalid,

    #[error("Token expired")]
    TokenExpired,

    #[error("Admin token invalid")]
    AdminInvalid,

    #[error("Admin access denied")]
    AdminAccessDenied,

    #[error("Too many attempts")]
    TooManyAttempts,

    #[error("Provisioning conflict")]
    ProvisioningConflict,

    #[error("External service unavailable: {0}")]
    ExternalServiceUnavailable(String),

    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Short machine-readable kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::TokenInvalid => "token_invalid",
            AuthError::TokenExpired => "token_expired",
            AuthError::AdminInvalid => "admin_invalid",
            AuthError::AdminAccessDenied => "admin_access_denied",
            AuthError::TooManyAttempts => "too_many_attempts",
            AuthError::ProvisioningConflict => "provisioning_conflict",
            AuthError::ExternalServiceUnavailable(_) => "external_service_unavailable",
            AuthError::Provider(_) => "provider",
            AuthError::Validation(_) => "validation",
            AuthError::StoreUnavailable(_) => "store_unavailable",
            AuthError::Config(_) => "config",
            AuthError::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation(_) => AuthError::ProvisioningConflict,
            StoreError::Unavailable(msg) => AuthError::StoreUnavailable(msg),
            StoreError::Backend(msg) => AuthError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::UniqueField;

    #[test]
    fn store_timeout_is_not_a_credential_failure() {
        let err = AuthError::from(StoreError::Unavailable("pool timed out".into()));
        assert!(matches!(err, AuthError::StoreUnavailable(_)));
        assert_eq!(err.kind(), "store_unavailable");
    }

    #[test]
    fn unique_violation_maps_to_provisioning_conflict() {
        let err = AuthError::from(StoreError::UniqueViolation(UniqueField::Email));
        assert!(matches!(err, AuthError::ProvisioningConflict));
    }
}
