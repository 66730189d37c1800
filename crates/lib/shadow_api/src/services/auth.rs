//! Authentication service: session, signup and federated flows delegating
//! to `shadow_core::auth`.

use shadow_core::auth::AuthError;
use shadow_core::auth::admin::AdminLogin;
use shadow_core::auth::credentials::verify_local_credentials;
use shadow_core::auth::jwt::{issue_session_token, verify_session_token};
use shadow_core::auth::reconcile::reconcile;
use shadow_core::auth::signup::{self, Signup};
use shadow_core::models::auth::{IdentitySummary, SessionClaims};
use shadow_core::oauth::{exchange_authorization_code, fetch_profile};
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::SignupRequest;

/// Authenticate with username/email + password. Returns (session token, summary).
pub async fn login(
    state: &AppState,
    identifier: &str,
    password: &str,
) -> AppResult<(String, IdentitySummary)> {
    let identity = verify_local_credentials(state.identities.as_ref(), identifier, password).await?;
    let token = issue_session_token(&identity, state.keys.session())?;
    info!(username = %identity.username, "local login");
    Ok((token, IdentitySummary::from(&identity)))
}

/// Register a new, unverified local account.
pub async fn signup(state: &AppState, body: SignupRequest) -> AppResult<IdentitySummary> {
    let request = Signup {
        username: body.username,
        full_name: body.full_name,
        email: body.email,
        password: body.password,
    };
    let identity = signup::register(state.identities.as_ref(), &state.notifier, &request).await?;
    Ok(IdentitySummary::from(&identity))
}

/// Consume an email verification token.
pub async fn verify_email(state: &AppState, token: &str) -> AppResult<IdentitySummary> {
    match signup::verify_email(state.identities.as_ref(), token).await {
        Ok(identity) => Ok(IdentitySummary::from(&identity)),
        Err(AuthError::TokenInvalid | AuthError::TokenExpired) => Err(AppError::Validation(
            "Invalid or expired verification token".into(),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Validate a session token from the request, if any.
pub fn session_claims(state: &AppState, token: Option<&str>) -> AppResult<SessionClaims> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::TokenInvalid)?;
    Ok(verify_session_token(token, state.keys.session())?)
}

/// Finish a Google sign-in: exchange the code, fetch the profile, reconcile
/// it and issue a session token.
pub async fn federated_login(
    state: &AppState,
    code: &str,
    pkce_verifier: &str,
) -> Result<String, AuthError> {
    let google = state
        .config
        .google
        .as_ref()
        .ok_or_else(|| AuthError::Config("Google sign-in is not configured".into()))?;
    let tokens = exchange_authorization_code(&state.http, google, code, pkce_verifier).await?;
    let profile = fetch_profile(&state.http, google, &tokens.access_token).await?;
    let identity = reconcile(state.identities.as_ref(), &state.notifier, &profile).await?;
    info!(username = %identity.username, "federated login");
    issue_session_token(&identity, state.keys.session())
}

/// Admin login from `source_addr`.
pub async fn admin_login(
    state: &AppState,
    username: &str,
    password: &str,
    source_addr: &str,
) -> AppResult<AdminLogin> {
    Ok(state.admin.login(username, password, source_addr).await?)
}
