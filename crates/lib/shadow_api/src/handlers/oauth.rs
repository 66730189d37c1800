//! Google sign-in handlers.
//!
//! Failures on the callback never surface as JSON: the browser is sent back
//! to the front end's login page with a short error code.

use std::time::Instant;

use axum::extract::{Query, State};
use axum::response::Redirect;
use axum_extra::extract::CookieJar;
use shadow_core::oauth::{
    PendingLogin, authorization_url, compute_code_challenge, generate_code_verifier,
    generate_state,
};
use tracing::warn;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{GoogleCallbackQuery, GoogleRedirectQuery};
use crate::services::auth;
use crate::services::cookies::session_cookie;

fn login_error(state: &AppState, code: &str) -> Redirect {
    Redirect::to(&format!("{}/login?error={code}", state.config.frontend_url))
}

/// `GET /api/auth/google`: start the authorization code flow.
pub async fn google_redirect_handler(
    State(state): State<AppState>,
    Query(query): Query<GoogleRedirectQuery>,
) -> AppResult<Redirect> {
    let google = state
        .config
        .google
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Google sign-in is not configured".into()))?;

    let verifier = generate_code_verifier();
    let challenge = compute_code_challenge(&verifier);
    let csrf = generate_state();
    let url = authorization_url(google, &csrf, &challenge, query.prompt.as_deref())?;
    state.oauth_state.insert(
        csrf,
        PendingLogin {
            pkce_verifier: verifier,
            created_at: Instant::now(),
        },
    );
    Ok(Redirect::to(&url))
}

/// `GET /api/auth/google/callback`: finish sign-in, set the session
/// cookie and land on the dashboard.
pub async fn google_callback_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<GoogleCallbackQuery>,
) -> AppResult<(CookieJar, Redirect)> {
    if state.config.google.is_none() {
        return Err(AppError::NotFound("Google sign-in is not configured".into()));
    }
    if let Some(error) = query.error.as_deref() {
        warn!(error, "provider returned an error");
        return Ok((jar, login_error(&state, "oauth_failed")));
    }

    let pending = query
        .state
        .as_deref()
        .and_then(|key| state.oauth_state.take(key));
    let Some(pending) = pending else {
        warn!("unknown or expired sign-in state");
        return Ok((jar, login_error(&state, "oauth_state")));
    };
    let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) else {
        return Ok((jar, login_error(&state, "oauth_failed")));
    };

    match auth::federated_login(&state, code, &pending.pkce_verifier).await {
        Ok(token) => {
            let jar = jar.add(session_cookie(&token, state.config.cookie_secure));
            let target = format!("{}/dashboard", state.config.frontend_url);
            Ok((jar, Redirect::to(&target)))
        }
        Err(e) => {
            warn!(error = %e, kind = e.kind(), "federated login failed");
            Ok((jar, login_error(&state, "oauth_failed")))
        }
    }
}
