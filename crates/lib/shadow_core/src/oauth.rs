//! Google sign-in support.
//!
//! PKCE/state management between the redirect and the callback, the
//! authorization URL, the code exchange and the userinfo lookup that
//! produces a `FederatedProfile`.

use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use dashmap::DashMap;
use rand::RngCore;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use crate::auth::AuthError;
use crate::models::auth::FederatedProfile;

/// TTL for pending login state (10 minutes).
const STATE_TTL: Duration = Duration::from_secs(600);

/// Cleanup sweep interval.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Default Google endpoints.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Scopes requested from Google.
const SCOPES: &str = "openid email profile";

// =============================================================================
// PKCE helpers
// =============================================================================

fn random_urlsafe(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a PKCE code verifier (43 chars, URL-safe).
pub fn generate_code_verifier() -> String {
    random_urlsafe(32)
}

/// Compute the S256 code challenge for a verifier.
pub fn compute_code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Generate a CSRF state parameter.
pub fn generate_state() -> String {
    random_urlsafe(24)
}

// =============================================================================
// Pending state store
// =============================================================================

/// Login state kept between redirect and callback.
#[derive(Debug, Clone)]
pub struct PendingLogin {
    pub pkce_verifier: String,
    pub created_at: Instant,
}

/// In-memory store for pending logins, keyed by the state parameter.
#[derive(Debug, Default)]
pub struct OAuthStateStore {
    states: DashMap<String, PendingLogin>,
}

impl OAuthStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, state_key: String, pending: PendingLogin) {
        self.states.insert(state_key, pending);
    }

    /// Remove and return a pending entry. `None` if unknown or expired.
    pub fn take(&self, state_key: &str) -> Option<PendingLogin> {
        let (_, pending) = self.states.remove(state_key)?;
        if pending.created_at.elapsed() > STATE_TTL {
            return None;
        }
        Some(pending)
    }

    /// Evict expired entries.
    pub fn cleanup(&self) {
        self.states.retain(|_, v| v.created_at.elapsed() <= STATE_TTL);
    }

    /// Spawn a periodic cleanup task.
    pub fn spawn_cleanup_task(self: &std::sync::Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = std::sync::Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                store.cleanup();
            }
        })
    }
}

// =============================================================================
// Google client
// =============================================================================

/// Google OAuth client settings.
#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl GoogleOAuthConfig {
    /// Config pointing at Google's production endpoints.
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            auth_url: GOOGLE_AUTH_URL.into(),
            token_url: GOOGLE_TOKEN_URL.into(),
            userinfo_url: GOOGLE_USERINFO_URL.into(),
        }
    }
}

/// Build the authorization URL. `prompt` is forwarded as-is when present
/// (e.g. `select_account` to force account re-selection).
pub fn authorization_url(
    config: &GoogleOAuthConfig,
    state: &str,
    code_challenge: &str,
    prompt: Option<&str>,
) -> Result<String, AuthError> {
    let mut url = Url::parse(&config.auth_url)
        .map_err(|e| AuthError::Config(format!("invalid auth url: {e}")))?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("client_id", &config.client_id)
            .append_pair("redirect_uri", &config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", SCOPES)
            .append_pair("state", state)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256");
        if let Some(prompt) = prompt.filter(|p| !p.is_empty()) {
            query.append_pair("prompt", prompt);
        }
    }
    Ok(url.into())
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
pub struct GoogleTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub id_token: Option<String>,
    pub scope: Option<String>,
}

/// Google userinfo payload.
#[derive(Debug, Deserialize)]
pub struct GoogleUserInfo {
    pub sub: String,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub name: Option<String>,
}

impl GoogleUserInfo {
    /// Map to a provider-neutral profile. Requires a verified email.
    pub fn into_profile(self) -> Result<FederatedProfile, AuthError> {
        if self.email_verified == Some(false) {
            return Err(AuthError::Provider("email not verified by provider".into()));
        }
        let email = self
            .email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AuthError::Provider("profile has no email".into()))?;
        Ok(FederatedProfile {
            external_id: self.sub,
            email,
            display_name: self.name,
        })
    }
}

/// Exchange an authorization code for tokens.
pub async fn exchange_authorization_code(
    client: &reqwest::Client,
    config: &GoogleOAuthConfig,
    code: &str,
    code_verifier: &str,
) -> Result<GoogleTokenResponse, AuthError> {
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("code_verifier", code_verifier),
    ];

    let resp = client
        .post(&config.token_url)
        .form(&params)
        .send()
        .await
        .map_err(|e| AuthError::Provider(format!("token exchange failed: {e}")))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(AuthError::Provider(format!(
            "token exchange HTTP {status}: {body}"
        )));
    }

    resp.json::<GoogleTokenResponse>()
        .await
        .map_err(|e| AuthError::Provider(format!("token response parse error: {e}")))
}

/// Fetch the signed-in user's profile.
pub async fn fetch_profile(
    client: &reqwest::Client,
    config: &GoogleOAuthConfig,
    access_token: &str,
) -> Result<FederatedProfile, AuthError> {
    let resp = client
        .get(&config.userinfo_url)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|e| AuthError::Provider(format!("userinfo request failed: {e}")))?;

    if !resp.status().is_success() {
        return Err(AuthError::Provider(format!(
            "userinfo HTTP {}",
            resp.status()
        )));
    }

    let info = resp
        .json::<GoogleUserInfo>()
        .await
        .map_err(|e| AuthError::Provider(format!("userinfo parse error: {e}")))?;
    debug!(sub = %info.sub, "fetched provider profile");
    info.into_profile()
}
