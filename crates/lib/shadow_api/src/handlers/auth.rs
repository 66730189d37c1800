//! Local account request handlers.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use axum_extra::extract::CookieJar;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{AuthResponse, LoginRequest, LogoutResponse, SignupRequest, VerifyEmailQuery};
use crate::services::auth;
use crate::services::cookies::{clear_session_cookie, session_cookie};

/// `POST /api/auth/signup`: create an unverified local account.
pub async fn signup_handler(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let user = auth::signup(&state, body).await?;
    Ok((StatusCode::CREATED, Json(AuthResponse { user })))
}

/// `POST /api/auth/login`: authenticate with username/email + password
/// and set the session cookie.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    let (token, user) = auth::login(&state, &body.identifier, &body.password).await?;
    let jar = jar.add(session_cookie(&token, state.config.cookie_secure));
    Ok((jar, Json(AuthResponse { user })))
}

/// `POST /api/auth/logout`: clear the session cookie.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<LogoutResponse>) {
    let jar = jar.add(clear_session_cookie(state.config.cookie_secure));
    (jar, Json(LogoutResponse { success: true }))
}

/// `GET /api/auth/me`: identity behind the current session.
pub async fn me_handler(Extension(user): Extension<AuthenticatedUser>) -> Json<AuthResponse> {
    Json(AuthResponse {
        user: user.0.summary(),
    })
}

/// `GET /api/auth/verify-email?token=...`
pub async fn verify_email_handler(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> AppResult<Json<AuthResponse>> {
    let user = auth::verify_email(&state, &query.token).await?;
    Ok(Json(AuthResponse { user }))
}
