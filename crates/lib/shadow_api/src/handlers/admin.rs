//! Admin request handlers.

use axum::extract::State;
use axum::{Extension, Json};
use axum_extra::extract::CookieJar;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::ClientAddr;
use crate::middleware::auth::AuthenticatedAdmin;
use crate::models::{AdminLoginRequest, AdminSessionResponse, LogoutResponse};
use crate::services::auth;
use crate::services::cookies::{admin_cookie, clear_admin_cookie};

/// `POST /api/admin/login`: rate-limited per client address.
pub async fn admin_login_handler(
    State(state): State<AppState>,
    ClientAddr(addr): ClientAddr,
    jar: CookieJar,
    Json(body): Json<AdminLoginRequest>,
) -> AppResult<(CookieJar, Json<AdminSessionResponse>)> {
    let login = auth::admin_login(&state, &body.username, &body.password, &addr).await?;
    let jar = jar.add(admin_cookie(&login.token, state.config.cookie_secure));
    Ok((
        jar,
        Json(AdminSessionResponse {
            valid: true,
            username: login.claims.username,
        }),
    ))
}

/// `GET /api/admin/verify`: reached only through `require_admin`.
pub async fn admin_verify_handler(
    Extension(admin): Extension<AuthenticatedAdmin>,
) -> Json<AdminSessionResponse> {
    Json(AdminSessionResponse {
        valid: true,
        username: admin.0.username,
    })
}

/// `POST /api/admin/logout`
pub async fn admin_logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<LogoutResponse>) {
    let jar = jar.add(clear_admin_cookie(state.config.cookie_secure));
    (jar, Json(LogoutResponse { success: true }))
}
