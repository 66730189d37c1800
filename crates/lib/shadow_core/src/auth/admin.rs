//! Admin access controller.
//!
//! Admin credentials live in their own namespace (`AdminStore`) and admin
//! tokens are signed with their own secret. Login is guarded per source
//! address by `LoginRateLimiter`.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::AuthError;
use super::jwt::{issue_admin_token, verify_admin_token};
use super::password::{verify_against_dummy, verify_password};
use super::rate_limit::{LoginRateLimiter, RateLimitDecision};
use crate::models::auth::AdminClaims;
use crate::store::AdminStore;

/// Result of a successful admin login.
#[derive(Debug, Clone)]
pub struct AdminLogin {
    pub token: String,
    pub claims: AdminClaims,
}

/// Gates the privileged surface.
pub struct AdminAccessController {
    store: Arc<dyn AdminStore>,
    limiter: Arc<LoginRateLimiter>,
    secret: Vec<u8>,
}

impl AdminAccessController {
    pub fn new(store: Arc<dyn AdminStore>, limiter: Arc<LoginRateLimiter>, secret: &[u8]) -> Self {
        Self {
            store,
            limiter,
            secret: secret.to_vec(),
        }
    }

    /// The limiter guarding `login`.
    pub fn limiter(&self) -> &Arc<LoginRateLimiter> {
        &self.limiter
    }

    /// Authenticate an admin from `source_addr`.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        source_addr: &str,
    ) -> Result<AdminLogin, AuthError> {
        self.login_at(username, password, source_addr, Instant::now())
            .await
    }

    /// `login` with the limiter evaluated at `now`.
    pub async fn login_at(
        &self,
        username: &str,
        password: &str,
        source_addr: &str,
        now: Instant,
    ) -> Result<AdminLogin, AuthError> {
        let reservation = match self.limiter.check_and_increment_at(source_addr, now) {
            RateLimitDecision::Allowed(reservation) => reservation,
            RateLimitDecision::Blocked { retry_after } => {
                warn!(source_addr, retry_after_secs = retry_after.as_secs(), "admin login blocked");
                return Err(AuthError::TooManyAttempts);
            }
        };

        // Only a credential failure keeps the reserved slot.
        let valid = match self.check_credentials(username, password).await {
            Ok(valid) => valid,
            Err(e) => {
                self.limiter.release(source_addr, reservation);
                return Err(e);
            }
        };

        if !valid {
            warn!(
                source_addr,
                attempts = self.limiter.attempts_at(source_addr, now),
                "admin login failed"
            );
            return Err(AuthError::InvalidCredentials);
        }

        self.limiter.release(source_addr, reservation);
        let token = issue_admin_token(username, &self.secret)?;
        let claims = verify_admin_token(&token, &self.secret)?;
        info!(username, source_addr, "admin logged in");
        Ok(AdminLogin { token, claims })
    }

    async fn check_credentials(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        match self.store.find_admin(username).await? {
            Some(record) => verify_password(password, &record.password_hash),
            None => {
                verify_against_dummy(password);
                Ok(false)
            }
        }
    }

    /// Guard for admin routes. Missing token, bad signature, expiry and a
    /// missing admin flag all yield `AdminAccessDenied`.
    pub fn authenticate(&self, token: Option<&str>) -> Result<AdminClaims, AuthError> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            debug!(reason = "missing_token", "admin access denied");
            return Err(AuthError::AdminAccessDenied);
        };
        verify_admin_token(token, &self.secret).map_err(|e| {
            debug!(reason = e.kind(), "admin access denied");
            AuthError::AdminAccessDenied
        })
    }
}
