//! Credential store seam.
//!
//! The authority never talks to a database directly; it goes through these
//! traits. `PgStore` backs production, `MemoryStore` backs tests and the
//! server's in-memory dev mode. Both enforce uniqueness of username, email
//! and federated id atomically on insert.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::auth::{AdminRecord, Identity, NewIdentity};

pub use memory::MemoryStore;
pub use pg::PgStore;

/// Column whose uniqueness constraint rejected an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
    FederatedId,
}

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unique constraint violated on {0:?}")]
    UniqueViolation(UniqueField),

    /// Timeout, closed pool or I/O failure. Never a credential problem.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store error: {0}")]
    Backend(String),
}

/// Persisted identity records.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Find an identity whose username or email equals `identifier`.
    async fn find_by_login(&self, identifier: &str) -> Result<Option<Identity>, StoreError>;

    /// Find an identity by federated id or, failing that, by email.
    async fn find_by_federated_or_email(
        &self,
        federated_id: &str,
        email: &str,
    ) -> Result<Option<Identity>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Identity>, StoreError>;

    async fn find_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<Identity>, StoreError>;

    /// Insert a new identity, failing with `UniqueViolation` on any collision.
    async fn insert(&self, identity: NewIdentity) -> Result<Identity, StoreError>;

    /// Flip the verification flag and clear the pending token. Returns the
    /// updated record, or `None` if the id is unknown.
    async fn mark_verified(&self, id: &str) -> Result<Option<Identity>, StoreError>;

    /// Next value of the generated-username sequence.
    async fn next_username_sequence(&self) -> Result<i64, StoreError>;
}

/// Admin credential namespace, kept apart from identities.
#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn find_admin(&self, username: &str) -> Result<Option<AdminRecord>, StoreError>;

    /// Insert an admin account; `UniqueViolation(Username)` if it exists.
    async fn insert_admin(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<AdminRecord, StoreError>;

    /// Replace an admin's password hash. Returns `false` if no such admin.
    async fn update_admin_password(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<bool, StoreError>;
}
