//! Federated identity reconciliation.
//!
//! Turns a provider profile into a local identity. Lookup is by federated
//! id or email; creation relies on the store's unique constraints rather
//! than a read-then-write probe, so concurrent first logins cannot mint
//! duplicate usernames or duplicate identities.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use super::AuthError;
use super::password::{generate_secret, hash_password};
use crate::models::auth::{FederatedProfile, Identity, NewIdentity, Verification};
use crate::notify::{NotificationKind, Notifier, dispatch};
use crate::store::{IdentityStore, StoreError, UniqueField};

/// Prefix of system-generated usernames.
pub const USERNAME_PREFIX: &str = "shadowhacker";

/// Upper bound on username candidates tried for a single creation.
const MAX_USERNAME_ATTEMPTS: i64 = 32;

/// Length of the throwaway password for federated-only accounts.
const THROWAWAY_PASSWORD_LEN: usize = 48;

/// Length of verification tokens.
pub(crate) const VERIFICATION_TOKEN_LEN: usize = 64;

/// Verification token lifetime.
pub(crate) const VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;

/// Reconcile `profile` against local identities, creating one if absent.
///
/// Reconciling the same profile any number of times, concurrently or not,
/// yields one identity. The only mutation of an existing identity is the
/// one-time flip of its verification flag.
pub async fn reconcile(
    store: &dyn IdentityStore,
    notifier: &Arc<dyn Notifier>,
    profile: &FederatedProfile,
) -> Result<Identity, AuthError> {
    let profile = normalize(profile)?;

    if let Some(existing) = find_existing(store, &profile).await? {
        return Ok(existing);
    }

    match create(store, &profile).await {
        Ok(identity) => {
            info!(username = %identity.username, "federated identity created");
            dispatch(
                notifier,
                NotificationKind::Welcome,
                &identity.email,
                json!({ "username": identity.username, "fullName": identity.full_name }),
            );
            Ok(identity)
        }
        Err(AuthError::ProvisioningConflict) => {
            // A concurrent reconciliation created the row first.
            warn!(kind = "provisioning_conflict", "retrying federated lookup");
            find_existing(store, &profile)
                .await?
                .ok_or(AuthError::ProvisioningConflict)
        }
        Err(e) => Err(e),
    }
}

fn normalize(profile: &FederatedProfile) -> Result<FederatedProfile, AuthError> {
    let email = profile.email.trim().to_lowercase();
    if profile.external_id.trim().is_empty() || !email.contains('@') {
        return Err(AuthError::Provider(
            "profile is missing a subject or email".into(),
        ));
    }
    Ok(FederatedProfile {
        external_id: profile.external_id.trim().to_string(),
        email,
        display_name: profile.display_name.clone(),
    })
}

/// Look up by federated id or email; flip the verification flag if unset.
async fn find_existing(
    store: &dyn IdentityStore,
    profile: &FederatedProfile,
) -> Result<Option<Identity>, AuthError> {
    let Some(existing) = store
        .find_by_federated_or_email(&profile.external_id, &profile.email)
        .await?
    else {
        return Ok(None);
    };

    if existing.verification.is_verified {
        return Ok(Some(existing));
    }

    debug!(username = %existing.username, "provider-verified email, marking identity verified");
    let updated = store.mark_verified(&existing.id).await?;
    Ok(Some(updated.unwrap_or(existing)))
}

/// Full name for a new identity: display name, else the email local part.
fn full_name_for(profile: &FederatedProfile) -> String {
    match profile.display_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => profile
            .email
            .split('@')
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Insert a new identity, advancing the username candidate on collision.
async fn create(
    store: &dyn IdentityStore,
    profile: &FederatedProfile,
) -> Result<Identity, AuthError> {
    let full_name = full_name_for(profile);
    let password_hash = hash_password(&generate_secret(THROWAWAY_PASSWORD_LEN))?;
    let verification = Verification {
        is_verified: true,
        token: Some(generate_secret(VERIFICATION_TOKEN_LEN)),
        expires_at: Some(Utc::now() + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS)),
    };

    let base = store.next_username_sequence().await?;
    for offset in 0..MAX_USERNAME_ATTEMPTS {
        let username = format!("{USERNAME_PREFIX}{}", base + offset);
        let candidate = NewIdentity {
            username: username.clone(),
            full_name: full_name.clone(),
            email: profile.email.clone(),
            password_hash: password_hash.clone(),
            federated_id: Some(profile.external_id.clone()),
            verification: verification.clone(),
        };
        match store.insert(candidate).await {
            Ok(identity) => return Ok(identity),
            Err(StoreError::UniqueViolation(UniqueField::Username)) => {
                debug!(%username, "generated username taken, trying next");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AuthError::Internal(format!(
        "no free username after {MAX_USERNAME_ATTEMPTS} attempts"
    )))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::notify::{LogNotifier, NotifyError};
    use crate::store::MemoryStore;

    fn notifier() -> Arc<dyn Notifier> {
        Arc::new(LogNotifier)
    }

    fn profile() -> FederatedProfile {
        FederatedProfile {
            external_id: "g-123".into(),
            email: "new@x.com".into(),
            display_name: Some("New User".into()),
        }
    }

    async fn seed(store: &MemoryStore, username: &str, email: &str, verified: bool) -> Identity {
        store
            .insert(NewIdentity {
                username: username.into(),
                full_name: "Seed".into(),
                email: email.into(),
                password_hash: "hash".into(),
                federated_id: None,
                verification: Verification {
                    is_verified: verified,
                    token: (!verified).then(|| "pending".to_string()),
                    expires_at: None,
                },
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn creates_verified_identity_with_sequence_username() {
        let store = MemoryStore::with_username_sequence(42);
        let identity = reconcile(&store, &notifier(), &profile()).await.unwrap();
        assert_eq!(identity.username, "shadowhacker42");
        assert_eq!(identity.full_name, "New User");
        assert_eq!(identity.federated_id.as_deref(), Some("g-123"));
        assert!(identity.verification.is_verified);
        assert!(identity.verification.token.is_some());
        assert!(identity.verification.expires_at.is_some());
        assert!(identity.password_hash.starts_with("$2b$10$"));
    }

    #[tokio::test]
    async fn skips_taken_username() {
        let store = MemoryStore::with_username_sequence(42);
        seed(&store, "shadowhacker42", "someone@x.com", true).await;
        let identity = reconcile(&store, &notifier(), &profile()).await.unwrap();
        assert_eq!(identity.username, "shadowhacker43");
    }

    #[tokio::test]
    async fn full_name_falls_back_to_email_local_part() {
        let store = MemoryStore::new();
        let mut p = profile();
        p.display_name = None;
        let identity = reconcile(&store, &notifier(), &p).await.unwrap();
        assert_eq!(identity.full_name, "new");

        let mut blank = profile();
        blank.external_id = "g-456".into();
        blank.email = "blank@x.com".into();
        blank.display_name = Some("   ".into());
        let identity = reconcile(&store, &notifier(), &blank).await.unwrap();
        assert_eq!(identity.full_name, "blank");
    }

    #[tokio::test]
    async fn same_profile_twice_yields_same_identity() {
        let store = MemoryStore::new();
        let first = reconcile(&store, &notifier(), &profile()).await.unwrap();
        let second = reconcile(&store, &notifier(), &profile()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.identity_count().await, 1);
    }

    #[tokio::test]
    async fn concurrent_reconciliations_converge() {
        let store = Arc::new(MemoryStore::new());
        let n = notifier();
        let p = profile();
        let (a, b) = tokio::join!(
            reconcile(store.as_ref(), &n, &p),
            reconcile(store.as_ref(), &n, &p)
        );
        assert_eq!(a.unwrap().id, b.unwrap().id);
        assert_eq!(store.identity_count().await, 1);
    }

    /// Hides existing rows from the next federated lookup, reproducing a
    /// concurrent creation that lands between lookup and insert.
    struct LaggingStore {
        inner: MemoryStore,
        hide_next_lookup: AtomicBool,
        unique_violations: AtomicUsize,
    }

    #[async_trait]
    impl IdentityStore for LaggingStore {
        async fn find_by_login(&self, identifier: &str) -> Result<Option<Identity>, StoreError> {
            self.inner.find_by_login(identifier).await
        }
        async fn find_by_federated_or_email(
            &self,
            federated_id: &str,
            email: &str,
        ) -> Result<Option<Identity>, StoreError> {
            if self.hide_next_lookup.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.find_by_federated_or_email(federated_id, email).await
        }
        async fn find_by_id(&self, id: &str) -> Result<Option<Identity>, StoreError> {
            self.inner.find_by_id(id).await
        }
        async fn find_by_verification_token(
            &self,
            token: &str,
        ) -> Result<Option<Identity>, StoreError> {
            self.inner.find_by_verification_token(token).await
        }
        async fn insert(&self, identity: NewIdentity) -> Result<Identity, StoreError> {
            let result = self.inner.insert(identity).await;
            if matches!(result, Err(StoreError::UniqueViolation(_))) {
                self.unique_violations.fetch_add(1, Ordering::SeqCst);
            }
            result
        }
        async fn mark_verified(&self, id: &str) -> Result<Option<Identity>, StoreError> {
            self.inner.mark_verified(id).await
        }
        async fn next_username_sequence(&self) -> Result<i64, StoreError> {
            self.inner.next_username_sequence().await
        }
    }

    #[tokio::test]
    async fn lost_creation_race_falls_back_to_lookup() {
        let store = LaggingStore {
            inner: MemoryStore::new(),
            hide_next_lookup: AtomicBool::new(false),
            unique_violations: AtomicUsize::new(0),
        };
        let first = reconcile(&store, &notifier(), &profile()).await.unwrap();

        store.hide_next_lookup.store(true, Ordering::SeqCst);
        let second = reconcile(&store, &notifier(), &profile()).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(store.unique_violations.load(Ordering::SeqCst), 1);
        assert_eq!(store.inner.identity_count().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn parallel_distinct_profiles_get_distinct_usernames() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let profile = FederatedProfile {
                        external_id: format!("g-{i}"),
                        email: format!("user{i}@x.com"),
                        display_name: None,
                    };
                    reconcile(store.as_ref(), &notifier(), &profile).await
                })
            })
            .collect();

        let mut usernames = std::collections::HashSet::new();
        for handle in handles {
            usernames.insert(handle.await.unwrap().unwrap().username);
        }
        assert_eq!(usernames.len(), 16);
        assert_eq!(store.identity_count().await, 16);
    }

    #[tokio::test]
    async fn existing_unverified_email_account_is_verified_once() {
        let store = MemoryStore::new();
        let seeded = seed(&store, "localuser", "new@x.com", false).await;

        let identity = reconcile(&store, &notifier(), &profile()).await.unwrap();
        assert_eq!(identity.id, seeded.id);
        assert_eq!(identity.username, "localuser");
        assert!(identity.verification.is_verified);
        // Federated id is not linked; nothing beyond the flag changes.
        assert_eq!(identity.federated_id, None);

        let again = reconcile(&store, &notifier(), &profile()).await.unwrap();
        assert_eq!(again, identity);
    }

    #[tokio::test]
    async fn email_match_is_case_insensitive() {
        let store = MemoryStore::new();
        let seeded = seed(&store, "localuser", "new@x.com", true).await;
        let mut p = profile();
        p.email = "New@X.com".into();
        let identity = reconcile(&store, &notifier(), &p).await.unwrap();
        assert_eq!(identity.id, seeded.id);
    }

    #[tokio::test]
    async fn rejects_profile_without_email() {
        let store = MemoryStore::new();
        let mut p = profile();
        p.email = String::new();
        let err = reconcile(&store, &notifier(), &p).await.unwrap_err();
        assert!(matches!(err, AuthError::Provider(_)));
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify(
            &self,
            _: NotificationKind,
            _: &str,
            _: Value,
        ) -> Result<(), NotifyError> {
            Err(NotifyError::Delivery("smtp down".into()))
        }
    }

    #[tokio::test]
    async fn notification_failure_does_not_affect_result() {
        let store = MemoryStore::with_username_sequence(7);
        let failing: Arc<dyn Notifier> = Arc::new(FailingNotifier);
        let identity = reconcile(&store, &failing, &profile()).await.unwrap();
        assert_eq!(identity.username, "shadowhacker7");
        tokio::task::yield_now().await;
        assert_eq!(store.identity_count().await, 1);
    }
}
