//! Local credential verification.

use tracing::debug;

use super::AuthError;
use super::password::{verify_against_dummy, verify_password};
use crate::models::auth::Identity;
use crate::store::IdentityStore;

/// Check `identifier` (username or email) and `password` against the store.
///
/// Unknown identifier and wrong password both yield `InvalidCredentials`.
/// A store failure propagates as `StoreUnavailable`/`Internal`, never as a
/// credential failure.
pub async fn verify_local_credentials(
    store: &dyn IdentityStore,
    identifier: &str,
    password: &str,
) -> Result<Identity, AuthError> {
    let Some(identity) = store.find_by_login(identifier.trim()).await? else {
        verify_against_dummy(password);
        debug!(reason = "unknown_identifier", "local login rejected");
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(password, &identity.password_hash)? {
        debug!(reason = "password_mismatch", "local login rejected");
        return Err(AuthError::InvalidCredentials);
    }

    Ok(identity)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::auth::password::hash_password;
    use crate::models::auth::{NewIdentity, Verification};
    use crate::store::{MemoryStore, StoreError};

    async fn store_with_alice() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert(NewIdentity {
                username: "alice".into(),
                full_name: "Alice".into(),
                email: "alice@example.com".into(),
                password_hash: hash_password("wonderland").unwrap(),
                federated_id: None,
                verification: Verification::verified(),
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn accepts_username_or_email() {
        let store = store_with_alice().await;
        let by_name = verify_local_credentials(&store, "alice", "wonderland")
            .await
            .unwrap();
        let by_email = verify_local_credentials(&store, "alice@example.com", "wonderland")
            .await
            .unwrap();
        assert_eq!(by_name.id, by_email.id);
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let store = store_with_alice().await;
        let result = verify_local_credentials(&store, "alice", "looking-glass").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn unknown_user_is_invalid_credentials() {
        let store = store_with_alice().await;
        let result = verify_local_credentials(&store, "bob", "wonderland").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    struct DownStore;

    #[async_trait]
    impl IdentityStore for DownStore {
        async fn find_by_login(&self, _: &str) -> Result<Option<Identity>, StoreError> {
            Err(StoreError::Unavailable("pool timed out".into()))
        }
        async fn find_by_federated_or_email(
            &self,
            _: &str,
            _: &str,
        ) -> Result<Option<Identity>, StoreError> {
            unreachable!()
        }
        async fn find_by_id(&self, _: &str) -> Result<Option<Identity>, StoreError> {
            unreachable!()
        }
        async fn find_by_verification_token(
            &self,
            _: &str,
        ) -> Result<Option<Identity>, StoreError> {
            unreachable!()
        }
        async fn insert(&self, _: NewIdentity) -> Result<Identity, StoreError> {
            unreachable!()
        }
        async fn mark_verified(&self, _: &str) -> Result<Option<Identity>, StoreError> {
            unreachable!()
        }
        async fn next_username_sequence(&self) -> Result<i64, StoreError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn store_timeout_is_distinct_from_bad_credentials() {
        let result = verify_local_credentials(&DownStore, "alice", "wonderland").await;
        assert!(matches!(result, Err(AuthError::StoreUnavailable(_))));
    }
}
