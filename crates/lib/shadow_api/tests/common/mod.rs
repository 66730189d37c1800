//! Shared helpers for router-level tests. Everything runs against
//! `MemoryStore`, so no database is needed.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use shadow_api::{AppState, config::ApiConfig};
use shadow_core::auth::password::hash_password;
use shadow_core::notify::{LogNotifier, Notifier};
use shadow_core::oauth::GoogleOAuthConfig;
use shadow_core::store::{AdminStore, MemoryStore};

pub const FRONTEND: &str = "http://localhost:5173";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";

pub fn config() -> ApiConfig {
    ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        pg_connection_url: String::new(),
        session_secret: "test-session-secret".into(),
        admin_secret: "test-admin-secret".into(),
        cookie_secure: false,
        trust_proxy: true,
        frontend_url: FRONTEND.into(),
        google: Some(GoogleOAuthConfig::new(
            "client-123".into(),
            "shh".into(),
            "http://localhost:3100/api/auth/google/callback".into(),
        )),
        notify_webhook_url: None,
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

pub async fn app_with(config: ApiConfig) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_admin("root", &hash_password(ADMIN_PASSWORD).unwrap())
        .await
        .unwrap();
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
    let state = AppState::new(config, store.clone(), store.clone(), notifier).unwrap();
    TestApp {
        router: shadow_api::router(state.clone()),
        store,
        state,
    }
}

pub async fn app() -> TestApp {
    app_with(config()).await
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// `name=value` pair of the first `Set-Cookie` header for `name`.
pub fn set_cookie(resp: &Response<Body>, name: &str) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{name}=")))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse JSON")
}
