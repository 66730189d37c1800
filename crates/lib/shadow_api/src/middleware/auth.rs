//! Authentication middleware: cookie extraction and token verification.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use shadow_core::models::auth::{AdminClaims, SessionClaims};

use crate::AppState;
use crate::error::AppError;
use crate::services::auth::session_claims;
use crate::services::cookies::{ADMIN_COOKIE, SESSION_COOKIE};

/// Session claims stored in request extensions by `require_session`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub SessionClaims);

/// Admin claims stored in request extensions by `require_admin`.
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin(pub AdminClaims);

/// Axum middleware: verifies the session cookie and injects
/// `AuthenticatedUser` into request extensions.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let claims = session_claims(&state, token.as_deref())?;
    request.extensions_mut().insert(AuthenticatedUser(claims));
    Ok(next.run(request).await)
}

/// Axum middleware: verifies the admin cookie and injects
/// `AuthenticatedAdmin`. Every failure is the same 403.
pub async fn require_admin(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar.get(ADMIN_COOKIE).map(|c| c.value().to_string());
    let claims = state.admin.authenticate(token.as_deref())?;
    request.extensions_mut().insert(AuthenticatedAdmin(claims));
    Ok(next.run(request).await)
}
