//! Cookie service: set/clear httpOnly auth cookies.
//!
//! Session and admin cookies have separate names and carry tokens signed
//! with separate secrets.

use axum_extra::extract::cookie::{Cookie, SameSite};
use shadow_core::auth::jwt::{ADMIN_TOKEN_EXPIRY_SECS, SESSION_TOKEN_EXPIRY_SECS};
use time::Duration;

/// Cookie name for the session token.
pub const SESSION_COOKIE: &str = "shadow_session";
/// Cookie name for the admin token.
pub const ADMIN_COOKIE: &str = "shadow_admin";

fn build(
    name: &'static str,
    value: String,
    secure: bool,
    same_site: SameSite,
    max_age: Duration,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(same_site)
        .path("/")
        .max_age(max_age)
        .build()
}

/// Session cookie (7 days).
pub fn session_cookie(token: &str, secure: bool) -> Cookie<'static> {
    build(
        SESSION_COOKIE,
        token.to_string(),
        secure,
        SameSite::Lax,
        Duration::seconds(SESSION_TOKEN_EXPIRY_SECS),
    )
}

/// Expired session cookie.
pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    build(SESSION_COOKIE, String::new(), secure, SameSite::Lax, Duration::ZERO)
}

/// Admin cookie, living as long as the admin token.
pub fn admin_cookie(token: &str, secure: bool) -> Cookie<'static> {
    build(
        ADMIN_COOKIE,
        token.to_string(),
        secure,
        SameSite::Strict,
        Duration::seconds(ADMIN_TOKEN_EXPIRY_SECS),
    )
}

/// Expired admin cookie.
pub fn clear_admin_cookie(secure: bool) -> Cookie<'static> {
    build(ADMIN_COOKIE, String::new(), secure, SameSite::Strict, Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_attributes() {
        let c = session_cookie("tok", true);
        assert_eq!(c.name(), SESSION_COOKIE);
        assert_eq!(c.http_only(), Some(true));
        assert_eq!(c.secure(), Some(true));
        assert_eq!(c.same_site(), Some(SameSite::Lax));
        assert_eq!(c.max_age(), Some(Duration::days(7)));
    }

    #[test]
    fn admin_cookie_is_separate_and_short_lived() {
        let c = admin_cookie("tok", false);
        assert_eq!(c.name(), ADMIN_COOKIE);
        assert_eq!(c.http_only(), Some(true));
        assert_eq!(c.secure(), Some(false));
        assert_eq!(c.max_age(), Some(Duration::hours(2)));
    }

    #[test]
    fn cleared_cookies_expire_immediately() {
        assert_eq!(clear_session_cookie(false).max_age(), Some(Duration::ZERO));
        assert_eq!(clear_admin_cookie(false).value(), "");
    }
}
