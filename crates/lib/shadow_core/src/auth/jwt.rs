//! Session and admin token generation and verification.
//!
//! Both token kinds are HS256 JWTs, but they are signed with two
//! independent secrets. A session secret can never verify an admin token
//! and vice versa.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use super::AuthError;
use super::password::generate_secret;
use crate::models::auth::{AdminClaims, Identity, SessionClaims};

/// Session token lifetime: 7 days.
pub const SESSION_TOKEN_EXPIRY_SECS: i64 = 7 * 24 * 60 * 60;

/// Admin token lifetime: 2 hours.
pub const ADMIN_TOKEN_EXPIRY_SECS: i64 = 2 * 60 * 60;

/// The two signing secrets. Construction fails if they are equal.
#[derive(Clone)]
pub struct SigningKeys {
    session: Vec<u8>,
    admin: Vec<u8>,
}

impl SigningKeys {
    pub fn new(session_secret: &str, admin_secret: &str) -> Result<Self, AuthError> {
        if session_secret.is_empty() || admin_secret.is_empty() {
            return Err(AuthError::Config("signing secrets must not be empty".into()));
        }
        if session_secret == admin_secret {
            return Err(AuthError::Config(
                "session and admin signing secrets must differ".into(),
            ));
        }
        Ok(Self {
            session: session_secret.as_bytes().to_vec(),
            admin: admin_secret.as_bytes().to_vec(),
        })
    }

    /// Secret for session tokens.
    pub fn session(&self) -> &[u8] {
        &self.session
    }

    /// Secret for admin tokens.
    pub fn admin(&self) -> &[u8] {
        &self.admin
    }
}

impl fmt::Debug for SigningKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeys")
            .field("session", &"<redacted>")
            .field("admin", &"<redacted>")
            .finish()
    }
}

fn sign<T: Serialize>(claims: &T, secret: &[u8]) -> Result<String, AuthError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
}

/// Decode and check the signature only. Expiry is checked by the caller so
/// an expired token is reported as such rather than as a bad signature.
fn decode_signed<T: DeserializeOwned>(token: &str, secret: &[u8]) -> Result<T, ErrorKind> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.set_required_spec_claims(&["exp"]);
    decode::<T>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
        .map_err(|e| e.into_kind())
}

/// Issue a session token for `identity`, expiring 7 days from now.
pub fn issue_session_token(identity: &Identity, secret: &[u8]) -> Result<String, AuthError> {
    issue_session_token_at(identity, secret, Utc::now())
}

/// Issue a session token as if at `now`.
pub fn issue_session_token_at(
    identity: &Identity,
    secret: &[u8],
    now: DateTime<Utc>,
) -> Result<String, AuthError> {
    let claims = SessionClaims {
        id: identity.id.clone(),
        username: identity.username.clone(),
        email: identity.email.clone(),
        full_name: identity.full_name.clone(),
        is_verified: identity.verification.is_verified,
        iat: now.timestamp(),
        exp: (now + Duration::seconds(SESSION_TOKEN_EXPIRY_SECS)).timestamp(),
    };
    sign(&claims, secret)
}

/// Verify a session token, returning the claims on success.
pub fn verify_session_token(token: &str, secret: &[u8]) -> Result<SessionClaims, AuthError> {
    verify_session_token_at(token, secret, Utc::now())
}

/// Verify a session token against the clock value `now`.
///
/// A token is valid up to and including its `exp` second.
pub fn verify_session_token_at(
    token: &str,
    secret: &[u8],
    now: DateTime<Utc>,
) -> Result<SessionClaims, AuthError> {
    let claims: SessionClaims = decode_signed(token, secret).map_err(|kind| {
        if !matches!(kind, ErrorKind::InvalidSignature) {
            warn!(?kind, "malformed session token");
        }
        AuthError::TokenInvalid
    })?;
    if now.timestamp() > claims.exp {
        return Err(AuthError::TokenExpired);
    }
    Ok(claims)
}

/// Issue an admin token for `username`, expiring 2 hours from now.
pub fn issue_admin_token(username: &str, secret: &[u8]) -> Result<String, AuthError> {
    issue_admin_token_at(username, secret, Utc::now())
}

/// Issue an admin token as if at `now`.
pub fn issue_admin_token_at(
    username: &str,
    secret: &[u8],
    now: DateTime<Utc>,
) -> Result<String, AuthError> {
    let claims = AdminClaims {
        username: username.to_string(),
        is_admin: true,
        login_time: now.timestamp(),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(ADMIN_TOKEN_EXPIRY_SECS)).timestamp(),
    };
    sign(&claims, secret)
}

/// Verify an admin token. Bad signature, wrong shape, expiry and a missing
/// admin flag all yield the same `AdminInvalid`.
pub fn verify_admin_token(token: &str, secret: &[u8]) -> Result<AdminClaims, AuthError> {
    verify_admin_token_at(token, secret, Utc::now())
}

/// Verify an admin token against the clock value `now`.
pub fn verify_admin_token_at(
    token: &str,
    secret: &[u8],
    now: DateTime<Utc>,
) -> Result<AdminClaims, AuthError> {
    let claims: AdminClaims =
        decode_signed(token, secret).map_err(|_| AuthError::AdminInvalid)?;
    if !claims.is_admin || now.timestamp() > claims.exp {
        return Err(AuthError::AdminInvalid);
    }
    Ok(claims)
}

/// Resolve the session signing secret: `JWT_SECRET` → `AUTH_SECRET` → persisted file.
pub fn resolve_session_secret() -> String {
    resolve_secret(&["JWT_SECRET", "AUTH_SECRET"], "session-secret")
}

/// Resolve the admin signing secret: `ADMIN_JWT_SECRET` → persisted file.
pub fn resolve_admin_secret() -> String {
    resolve_secret(&["ADMIN_JWT_SECRET"], "admin-secret")
}

/// First non-empty env var in `vars`, else the secret persisted under the
/// data dir as `file_name`, generating and persisting one if absent.
fn resolve_secret(vars: &[&str], file_name: &str) -> String {
    for var in vars {
        if let Ok(secret) = std::env::var(var)
            && !secret.is_empty()
        {
            return secret;
        }
    }
    let secret_path = secret_path(file_name);
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret = generate_secret(64);
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new signing secret");
    secret
}

/// Path to a persisted secret file.
fn secret_path(file_name: &str) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shadowhacker")
        .join(file_name)
}
