//! Local signup and email verification.
//!
//! `Unverified --(valid, unexpired token)--> Verified` is the only
//! transition; Verified is terminal.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::info;

use super::AuthError;
use super::password::{generate_secret, hash_password};
use super::reconcile::{VERIFICATION_TOKEN_LEN, VERIFICATION_TOKEN_TTL_HOURS};
use crate::models::auth::{Identity, NewIdentity, Verification};
use crate::notify::{NotificationKind, Notifier, dispatch};
use crate::store::{IdentityStore, StoreError, UniqueField};

/// Minimum password length for local accounts.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Signup request fields.
#[derive(Debug, Clone)]
pub struct Signup {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
}

fn validate(signup: &Signup) -> Result<(), AuthError> {
    let username = signup.username.trim();
    if !(3..=32).contains(&username.len())
        || !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AuthError::Validation(
            "Username must be 3-32 letters, digits or underscores".into(),
        ));
    }
    if signup.full_name.trim().is_empty() {
        return Err(AuthError::Validation("Full name is required".into()));
    }
    let email = signup.email.trim();
    if email.len() < 3 || !email.contains('@') {
        return Err(AuthError::Validation("Invalid email address".into()));
    }
    if signup.password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Create an unverified local identity and send its verification token.
pub async fn register(
    store: &dyn IdentityStore,
    notifier: &Arc<dyn Notifier>,
    signup: &Signup,
) -> Result<Identity, AuthError> {
    validate(signup)?;

    let token = generate_secret(VERIFICATION_TOKEN_LEN);
    let new = NewIdentity {
        username: signup.username.trim().to_string(),
        full_name: signup.full_name.trim().to_string(),
        email: signup.email.trim().to_lowercase(),
        password_hash: hash_password(&signup.password)?,
        federated_id: None,
        verification: Verification {
            is_verified: false,
            token: Some(token.clone()),
            expires_at: Some(Utc::now() + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS)),
        },
    };

    let identity = store.insert(new).await.map_err(|e| match e {
        StoreError::UniqueViolation(UniqueField::Username) => {
            AuthError::Validation("Username already taken".into())
        }
        StoreError::UniqueViolation(_) => AuthError::Validation("Email already registered".into()),
        other => other.into(),
    })?;

    info!(username = %identity.username, "local identity registered");
    dispatch(
        notifier,
        NotificationKind::Verification,
        &identity.email,
        json!({ "username": identity.username, "token": token }),
    );
    Ok(identity)
}

/// Consume a verification token.
pub async fn verify_email(store: &dyn IdentityStore, token: &str) -> Result<Identity, AuthError> {
    verify_email_at(store, token, Utc::now()).await
}

/// Consume a verification token against the clock value `now`.
pub async fn verify_email_at(
    store: &dyn IdentityStore,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Identity, AuthError> {
    if token.is_empty() {
        return Err(AuthError::TokenInvalid);
    }
    let identity = store
        .find_by_verification_token(token)
        .await?
        .ok_or(AuthError::TokenInvalid)?;

    if identity.verification.is_verified {
        return Ok(identity);
    }
    match identity.verification.expires_at {
        Some(expires_at) if now > expires_at => return Err(AuthError::TokenExpired),
        None => return Err(AuthError::TokenInvalid),
        Some(_) => {}
    }

    let updated = store
        .mark_verified(&identity.id)
        .await?
        .ok_or(AuthError::TokenInvalid)?;
    info!(username = %updated.username, "email verified");
    Ok(updated)
}
