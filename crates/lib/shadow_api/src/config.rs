//! API server configuration.

use shadow_core::auth::jwt::{resolve_admin_secret, resolve_session_secret};
use shadow_core::oauth::GoogleOAuthConfig;

/// Configuration for the API server.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// Session token signing secret.
    pub session_secret: String,
    /// Admin token signing secret. Must differ from `session_secret`.
    pub admin_secret: String,
    /// Set the `Secure` attribute on auth cookies (true in production).
    pub cookie_secure: bool,
    /// Take the client address from the first `X-Forwarded-For` hop.
    pub trust_proxy: bool,
    /// Base URL of the front end, used for redirects and CORS.
    pub frontend_url: String,
    /// Google sign-in settings; `None` disables the federated endpoints.
    pub google: Option<GoogleOAuthConfig>,
    /// Webhook receiving notification events; `None` logs them instead.
    pub notify_webhook_url: Option<String>,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable               | Default                                  |
    /// |------------------------|------------------------------------------|
    /// | `BIND_ADDR`            | `127.0.0.1:3100`                         |
    /// | `DATABASE_URL`         | `postgres://localhost:5432/shadowhacker` |
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated & persisted to file      |
    /// | `ADMIN_JWT_SECRET`     | generated & persisted to a second file   |
    /// | `COOKIE_SECURE`        | `false`                                  |
    /// | `TRUST_PROXY`          | `false`                                  |
    /// | `FRONTEND_URL`         | `http://localhost:5173`                  |
    /// | `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET` / `GOOGLE_REDIRECT_URI` | unset |
    /// | `NOTIFY_WEBHOOK_URL`   | unset                                    |
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3100".into()),
            pg_connection_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/shadowhacker".into()),
            session_secret: resolve_session_secret(),
            admin_secret: resolve_admin_secret(),
            cookie_secure: env_flag("COOKIE_SECURE"),
            trust_proxy: env_flag("TRUST_PROXY"),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into())
                .trim_end_matches('/')
                .to_string(),
            google: google_from_env(),
            notify_webhook_url: non_empty_var("NOTIFY_WEBHOOK_URL"),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(name: &str) -> bool {
    non_empty_var(name)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

fn google_from_env() -> Option<GoogleOAuthConfig> {
    Some(GoogleOAuthConfig::new(
        non_empty_var("GOOGLE_CLIENT_ID")?,
        non_empty_var("GOOGLE_CLIENT_SECRET")?,
        non_empty_var("GOOGLE_REDIRECT_URI")?,
    ))
}
