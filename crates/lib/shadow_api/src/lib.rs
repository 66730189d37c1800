//! # shadow_api
//!
//! HTTP API library for the ShadowHacker identity authority.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use shadow_core::auth::AuthError;
use shadow_core::auth::admin::AdminAccessController;
use shadow_core::auth::jwt::SigningKeys;
use shadow_core::auth::rate_limit::LoginRateLimiter;
use shadow_core::notify::Notifier;
use shadow_core::oauth::OAuthStateStore;
use shadow_core::store::{AdminStore, IdentityStore};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::ApiConfig;
use crate::handlers::{admin, auth, health, oauth};

/// Timeout for outbound provider calls.
const HTTP_CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: ApiConfig,
    /// Session and admin signing secrets.
    pub keys: SigningKeys,
    pub identities: Arc<dyn IdentityStore>,
    pub admin: Arc<AdminAccessController>,
    pub notifier: Arc<dyn Notifier>,
    /// Pending Google sign-ins.
    pub oauth_state: Arc<OAuthStateStore>,
    /// Client for provider calls.
    pub http: reqwest::Client,
}

impl AppState {
    /// Wire the stores and notifier together. Fails if the signing secrets
    /// are empty or equal.
    pub fn new(
        config: ApiConfig,
        identities: Arc<dyn IdentityStore>,
        admins: Arc<dyn AdminStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, AuthError> {
        let keys = SigningKeys::new(&config.session_secret, &config.admin_secret)?;
        let limiter = Arc::new(LoginRateLimiter::new());
        let admin = Arc::new(AdminAccessController::new(admins, limiter, keys.admin()));
        let http = reqwest::Client::builder()
            .timeout(HTTP_CLIENT_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Config(format!("http client: {e}")))?;
        Ok(Self {
            config,
            keys,
            identities,
            admin,
            notifier,
            oauth_state: Arc::new(OAuthStateStore::new()),
            http,
        })
    }
}

/// Run embedded database migrations.
///
/// Delegates to `shadow_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    shadow_core::migrate::migrate(pool).await
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);
    match HeaderValue::from_str(frontend_url) {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            warn!(frontend_url, "invalid FRONTEND_URL, cross-origin requests disabled");
            cors
        }
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route(routes::GET_API_HEALTH, get(health::health_handler))
        .route(routes::POST_AUTH_SIGNUP, post(auth::signup_handler))
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler))
        .route(routes::GET_AUTH_VERIFY_EMAIL, get(auth::verify_email_handler))
        .route(routes::GET_AUTH_GOOGLE, get(oauth::google_redirect_handler))
        .route(
            routes::GET_AUTH_GOOGLE_CALLBACK,
            get(oauth::google_callback_handler),
        )
        .route(routes::POST_ADMIN_LOGIN, post(admin::admin_login_handler))
        .route(routes::POST_ADMIN_LOGOUT, post(admin::admin_logout_handler));

    let session = Router::new()
        .route(routes::GET_AUTH_ME, get(auth::me_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_session,
        ));

    let privileged = Router::new()
        .route(routes::GET_ADMIN_VERIFY, get(admin::admin_verify_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_admin,
        ));

    Router::new()
        .merge(public)
        .merge(session)
        .merge(privileged)
        .layer(cors_layer(&state.config.frontend_url))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
