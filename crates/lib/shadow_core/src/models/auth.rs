//! Authentication domain models.
//!
//! Persisted identity records plus the two claim sets embedded in signed
//! tokens. Claim structs reject unknown fields so a token minted for one
//! purpose never decodes as the other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Email verification state attached to every identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub is_verified: bool,
    pub token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Verification {
    /// Already-verified state, as produced by a successful token consumption.
    pub fn verified() -> Self {
        Self {
            is_verified: true,
            token: None,
            expires_at: None,
        }
    }
}

/// Persisted identity record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub email: String,
    /// bcrypt hash. Federated accounts carry the hash of a throwaway secret.
    pub password_hash: String,
    /// External-provider subject identifier (`None` for local-only accounts).
    pub federated_id: Option<String>,
    pub verification: Verification,
    pub created_at: DateTime<Utc>,
}

/// Fields required to insert a new identity. The store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub federated_id: Option<String>,
    pub verification: Verification,
}

/// Public view of an identity, safe to return to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySummary {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub is_verified: bool,
}

impl From<&Identity> for IdentitySummary {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            username: identity.username.clone(),
            email: identity.email.clone(),
            full_name: identity.full_name.clone(),
            is_verified: identity.verification.is_verified,
        }
    }
}

/// Profile returned by a federated identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedProfile {
    pub external_id: String,
    pub email: String,
    pub display_name: Option<String>,
}

/// Claims embedded in session tokens (signed with the session secret).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SessionClaims {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub is_verified: bool,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

impl SessionClaims {
    /// The identity fields carried by the token, without timing claims.
    pub fn summary(&self) -> IdentitySummary {
        IdentitySummary {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            is_verified: self.is_verified,
        }
    }
}

/// Claims embedded in admin tokens (signed with the admin secret).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AdminClaims {
    pub username: String,
    pub is_admin: bool,
    /// Login time (unix timestamp).
    pub login_time: i64,
    pub iat: i64,
    pub exp: i64,
}

/// Admin credential record, stored apart from identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminRecord {
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}
