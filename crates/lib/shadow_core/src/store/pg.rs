//! PostgreSQL-backed credential store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{AdminStore, IdentityStore, StoreError, UniqueField};
use crate::models::auth::{AdminRecord, Identity, NewIdentity, Verification};

const IDENTITY_COLUMNS: &str = "id::text AS id, username, full_name, email, password_hash, \
     federated_id, is_verified, verification_token, verification_expires_at, created_at";

/// Store backed by the `identities` and `admin_accounts` tables.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct IdentityRow {
    id: String,
    username: String,
    full_name: String,
    email: String,
    password_hash: String,
    federated_id: Option<String>,
    is_verified: bool,
    verification_token: Option<String>,
    verification_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<IdentityRow> for Identity {
    fn from(row: IdentityRow) -> Self {
        Identity {
            id: row.id,
            username: row.username,
            full_name: row.full_name,
            email: row.email,
            password_hash: row.password_hash,
            federated_id: row.federated_id,
            verification: Verification {
                is_verified: row.is_verified,
                token: row.verification_token,
                expires_at: row.verification_expires_at,
            },
            created_at: row.created_at,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                match db.constraint() {
                    Some("identities_username_key") | Some("admin_accounts_pkey") => {
                        StoreError::UniqueViolation(UniqueField::Username)
                    }
                    Some("identities_email_key") => StoreError::UniqueViolation(UniqueField::Email),
                    Some("identities_federated_id_key") => {
                        StoreError::UniqueViolation(UniqueField::FederatedId)
                    }
                    _ => StoreError::Backend(e.to_string()),
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(e.to_string())
            }
            _ => StoreError::Backend(e.to_string()),
        }
    }
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn find_by_login(&self, identifier: &str) -> Result<Option<Identity>, StoreError> {
        let sql = format!(
            "SELECT {IDENTITY_COLUMNS} FROM identities \
             WHERE username = $1 OR email = lower($1) \
             ORDER BY (username = $1) DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Identity::from))
    }

    async fn find_by_federated_or_email(
        &self,
        federated_id: &str,
        email: &str,
    ) -> Result<Option<Identity>, StoreError> {
        let sql = format!(
            "SELECT {IDENTITY_COLUMNS} FROM identities \
             WHERE federated_id = $1 OR email = $2 \
             ORDER BY (federated_id = $1) DESC NULLS LAST LIMIT 1"
        );
        let row = sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(federated_id)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Identity::from))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Identity>, StoreError> {
        let sql = format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE id::text = $1");
        let row = sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Identity::from))
    }

    async fn find_by_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<Identity>, StoreError> {
        let sql =
            format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE verification_token = $1");
        let row = sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Identity::from))
    }

    async fn insert(&self, identity: NewIdentity) -> Result<Identity, StoreError> {
        let sql = format!(
            "INSERT INTO identities \
             (username, full_name, email, password_hash, federated_id, \
              is_verified, verification_token, verification_expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {IDENTITY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(&identity.username)
            .bind(&identity.full_name)
            .bind(&identity.email)
            .bind(&identity.password_hash)
            .bind(&identity.federated_id)
            .bind(identity.verification.is_verified)
            .bind(&identity.verification.token)
            .bind(identity.verification.expires_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn mark_verified(&self, id: &str) -> Result<Option<Identity>, StoreError> {
        let sql = format!(
            "UPDATE identities \
             SET is_verified = TRUE, verification_token = NULL, verification_expires_at = NULL \
             WHERE id::text = $1 \
             RETURNING {IDENTITY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Identity::from))
    }

    async fn next_username_sequence(&self) -> Result<i64, StoreError> {
        let next = sqlx::query_scalar::<_, i64>("SELECT nextval('username_seq')")
            .fetch_one(&self.pool)
            .await?;
        Ok(next)
    }
}

#[async_trait]
impl AdminStore for PgStore {
    async fn find_admin(&self, username: &str) -> Result<Option<AdminRecord>, StoreError> {
        let row = sqlx::query_as::<_, (String, String, DateTime<Utc>)>(
            "SELECT username, password_hash, created_at FROM admin_accounts WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(username, password_hash, created_at)| AdminRecord {
            username,
            password_hash,
            created_at,
        }))
    }

    async fn insert_admin(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<AdminRecord, StoreError> {
        let created_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            "INSERT INTO admin_accounts (username, password_hash) VALUES ($1, $2) \
             RETURNING created_at",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(AdminRecord {
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at,
        })
    }

    async fn update_admin_password(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE admin_accounts SET password_hash = $2 WHERE username = $1")
                .bind(username)
                .bind(password_hash)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
