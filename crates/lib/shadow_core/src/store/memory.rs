//! Process-local credential store.
//!
//! Every mutation runs under a single write lock, so the uniqueness checks
//! in `insert` are atomic with the insert itself.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AdminStore, IdentityStore, StoreError, UniqueField};
use crate::models::auth::{AdminRecord, Identity, NewIdentity, Verification};

#[derive(Debug)]
struct State {
    identities: Vec<Identity>,
    admins: HashMap<String, AdminRecord>,
    next_sequence: i64,
}

/// In-memory implementation of `IdentityStore` and `AdminStore`.
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_username_sequence(1)
    }

    /// Create a store whose username sequence starts at `start`.
    pub fn with_username_sequence(start: i64) -> Self {
        Self {
            state: RwLock::new(State {
                identities: Vec::new(),
                admins: HashMap::new(),
                next_sequence: start,
            }),
        }
    }

    /// Number of stored identities.
    pub async fn identity_count(&self) -> usize {
        self.state.read().await.identities.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find_by_login(&self, identifier: &str) -> Result<Option<Identity>, StoreError> {
        let state = self.state.read().await;
        let email = identifier.to_lowercase();
        let found = state
            .identities
            .iter()
            .find(|i| i.username == identifier)
            .or_else(|| state.identities.iter().find(|i| i.email == email));
        Ok(found.cloned())
    }

    async fn find_by_federated_or_email(
        &self,
        federated_id: &str,
        email: &str,
    ) -> Result<Option<Identity>, StoreError> {
        let state = self.state.read().await;
        let found = state
            .identities
            .iter()
            .find(|i| i.federated_id.as_deref() == Some(federated_id))
            .or_else(|| state.identities.iter().find(|i| i.email == email));
        Ok(found.cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Identity>, StoreError> {
        let state = self.state.read().await;
        Ok(state.identities.iter().find(|i| i.id == id).cloned())
    }

    async fn find_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<Identity>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .identities
            .iter()
            .find(|i| i.verification.token.as_deref() == Some(token))
            .cloned())
    }

    async fn insert(&self, identity: NewIdentity) -> Result<Identity, StoreError> {
        let mut state = self.state.write().await;
        for existing in &state.identities {
            if identity.federated_id.is_some() && existing.federated_id == identity.federated_id {
                return Err(StoreError::UniqueViolation(UniqueField::FederatedId));
            }
            if existing.email == identity.email {
                return Err(StoreError::UniqueViolation(UniqueField::Email));
            }
            if existing.username == identity.username {
                return Err(StoreError::UniqueViolation(UniqueField::Username));
            }
        }
        let record = Identity {
            id: Uuid::now_v7().to_string(),
            username: identity.username,
            full_name: identity.full_name,
            email: identity.email,
            password_hash: identity.password_hash,
            federated_id: identity.federated_id,
            verification: identity.verification,
            created_at: Utc::now(),
        };
        state.identities.push(record.clone());
        Ok(record)
    }

    async fn mark_verified(&self, id: &str) -> Result<Option<Identity>, StoreError> {
        let mut state = self.state.write().await;
        let Some(identity) = state.identities.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };
        identity.verification = Verification::verified();
        Ok(Some(identity.clone()))
    }

    async fn next_username_sequence(&self) -> Result<i64, StoreError> {
        let mut state = self.state.write().await;
        let next = state.next_sequence;
        state.next_sequence += 1;
        Ok(next)
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn find_admin(&self, username: &str) -> Result<Option<AdminRecord>, StoreError> {
        Ok(self.state.read().await.admins.get(username).cloned())
    }

    async fn insert_admin(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<AdminRecord, StoreError> {
        let mut state = self.state.write().await;
        if state.admins.contains_key(username) {
            return Err(StoreError::UniqueViolation(UniqueField::Username));
        }
        let record = AdminRecord {
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        state.admins.insert(username.to_string(), record.clone());
        Ok(record)
    }

    async fn update_admin_password(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        match state.admins.get_mut(username) {
            Some(record) => {
                record.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
