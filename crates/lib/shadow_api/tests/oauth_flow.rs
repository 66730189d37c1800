//! Google sign-in redirects. Provider calls are not exercised here.

mod common;

use axum::http::{StatusCode, header};
use tower::ServiceExt;
use url::Url;

use common::*;

fn location(resp: &axum::http::Response<axum::body::Body>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

#[tokio::test]
async fn redirect_carries_pkce_state_and_prompt() {
    let app = app().await;
    let resp = app
        .router
        .oneshot(get("/api/auth/google?prompt=select_account", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let url = Url::parse(&location(&resp)).unwrap();
    assert_eq!(url.host_str(), Some("accounts.google.com"));
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let param = |k: &str| pairs.iter().find(|(n, _)| n == k).map(|(_, v)| v.clone());
    assert_eq!(param("prompt").as_deref(), Some("select_account"));
    assert_eq!(param("code_challenge_method").as_deref(), Some("S256"));
    assert!(param("state").is_some());

    let state = param("state").unwrap();
    assert!(app.state.oauth_state.take(&state).is_some());
}

#[tokio::test]
async fn redirect_without_prompt_omits_it() {
    let app = app().await;
    let resp = app
        .router
        .oneshot(get("/api/auth/google", None))
        .await
        .unwrap();
    assert!(!location(&resp).contains("prompt="));
}

#[tokio::test]
async fn callback_with_unknown_state_returns_to_login() {
    let app = app().await;
    let resp = app
        .router
        .oneshot(get("/api/auth/google/callback?code=abc&state=forged", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), format!("{FRONTEND}/login?error=oauth_state"));
    assert!(set_cookie(&resp, "shadow_session").is_none());
}

#[tokio::test]
async fn callback_with_provider_error_returns_to_login() {
    let app = app().await;
    let resp = app
        .router
        .oneshot(get("/api/auth/google/callback?error=access_denied", None))
        .await
        .unwrap();
    assert_eq!(location(&resp), format!("{FRONTEND}/login?error=oauth_failed"));
}

#[tokio::test]
async fn google_endpoints_404_when_unconfigured() {
    let mut config = config();
    config.google = None;
    let app = app_with(config).await;
    let resp = app
        .router
        .oneshot(get("/api/auth/google", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
