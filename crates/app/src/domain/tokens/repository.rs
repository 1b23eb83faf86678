//! Tokens Repository

use async_trait::async_trait;
use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use mockall::automock;
use sqlx::{FromRow, PgPool, Postgres, Row, postgres::PgRow, query, query_as};

use crate::{
    database::StoreError,
    domain::tokens::{
        data::{NewTokenRecord, RotatedSecret, TokenUpdate},
        records::{TokenRecord, TokenUuid},
    },
};

const LIST_TOKENS_SQL: &str = include_str!("sql/list_tokens.sql");
const FIND_TOKEN_SQL: &str = include_str!("sql/find_token.sql");
const FIND_TOKEN_BY_HASH_SQL: &str = include_str!("sql/find_token_by_hash.sql");
const CREATE_TOKEN_SQL: &str = include_str!("sql/create_token.sql");
const UPDATE_TOKEN_FIELDS_SQL: &str = include_str!("sql/update_token_fields.sql");
const ROTATE_TOKEN_SQL: &str = include_str!("sql/rotate_token.sql");
const DELETE_TOKEN_SQL: &str = include_str!("sql/delete_token.sql");
const TOUCH_LAST_USED_SQL: &str = include_str!("sql/touch_last_used.sql");

#[automock]
#[async_trait]
/// Distributed token persistence.
pub trait TokensRepository: Send + Sync {
    /// All tokens, most recently created first.
    async fn list_tokens(&self) -> Result<Vec<TokenRecord>, StoreError>;

    async fn find_token(&self, token: TokenUuid) -> Result<Option<TokenRecord>, StoreError>;

    async fn find_token_by_hash(&self, token_hash: &str)
    -> Result<Option<TokenRecord>, StoreError>;

    /// Insert a token. A duplicate `token_hash` is [`StoreError::AlreadyExists`].
    async fn create_token(&self, token: NewTokenRecord) -> Result<TokenRecord, StoreError>;

    /// Write the `Some` fields of an already normalised `update`, bumping
    /// `updated_at`. Secret columns and `last_used_at` are left alone.
    ///
    /// A missing row is [`StoreError::NotFound`].
    async fn update_token_fields(
        &self,
        token: TokenUuid,
        update: TokenUpdate,
    ) -> Result<TokenRecord, StoreError>;

    /// Swap in a new secret, reactivate the token and clear `last_used_at`.
    /// Display fields are left alone.
    ///
    /// A digest held by another token is [`StoreError::AlreadyExists`], a
    /// missing row [`StoreError::NotFound`].
    async fn rotate_token(
        &self,
        token: TokenUuid,
        secret: RotatedSecret,
    ) -> Result<TokenRecord, StoreError>;

    /// Remove a token. Missing rows are not an error.
    async fn delete_token(&self, token: TokenUuid) -> Result<(), StoreError>;

    async fn touch_last_used(&self, token: TokenUuid, when: Timestamp) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
/// PostgreSQL-backed tokens repository.
pub struct PgTokensRepository {
    pool: PgPool,
}

impl PgTokensRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokensRepository for PgTokensRepository {
    async fn list_tokens(&self) -> Result<Vec<TokenRecord>, StoreError> {
        query_as::<Postgres, TokenRecord>(LIST_TOKENS_SQL)
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn find_token(&self, token: TokenUuid) -> Result<Option<TokenRecord>, StoreError> {
        query_as::<Postgres, TokenRecord>(FIND_TOKEN_SQL)
            .bind(token.into_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn find_token_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<TokenRecord>, StoreError> {
        query_as::<Postgres, TokenRecord>(FIND_TOKEN_BY_HASH_SQL)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn create_token(&self, token: NewTokenRecord) -> Result<TokenRecord, StoreError> {
        query_as::<Postgres, TokenRecord>(CREATE_TOKEN_SQL)
            .bind(token.uuid.into_uuid())
            .bind(token.name)
            .bind(token.note)
            .bind(token.token_hash)
            .bind(token.token_ciphertext)
            .bind(token.key_prefix)
            .bind(token.expires_at.map(SqlxTimestamp::from))
            .bind(token.rate_limit_per_minute)
            .fetch_one(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn update_token_fields(
        &self,
        token: TokenUuid,
        update: TokenUpdate,
    ) -> Result<TokenRecord, StoreError> {
        query_as::<Postgres, TokenRecord>(UPDATE_TOKEN_FIELDS_SQL)
            .bind(token.into_uuid())
            .bind(update.name)
            .bind(update.note)
            .bind(update.is_active)
            .bind(update.clear_expires_at)
            .bind(update.expires_at.map(SqlxTimestamp::from))
            .bind(update.rate_limit_per_minute)
            .fetch_one(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn rotate_token(
        &self,
        token: TokenUuid,
        secret: RotatedSecret,
    ) -> Result<TokenRecord, StoreError> {
        query_as::<Postgres, TokenRecord>(ROTATE_TOKEN_SQL)
            .bind(token.into_uuid())
            .bind(secret.token_hash)
            .bind(secret.token_ciphertext)
            .bind(secret.key_prefix)
            .fetch_one(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn delete_token(&self, token: TokenUuid) -> Result<(), StoreError> {
        query(DELETE_TOKEN_SQL)
            .bind(token.into_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn touch_last_used(&self, token: TokenUuid, when: Timestamp) -> Result<(), StoreError> {
        query(TOUCH_LAST_USED_SQL)
            .bind(token.into_uuid())
            .bind(SqlxTimestamp::from(when))
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

impl<'r> FromRow<'r, PgRow> for TokenRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: TokenUuid::from_uuid(row.try_get("uuid")?),
            name: row.try_get("name")?,
            note: row.try_get("note")?,
            token_hash: row.try_get("token_hash")?,
            token_ciphertext: row.try_get("token_ciphertext")?,
            key_prefix: row.try_get("key_prefix")?,
            is_active: row.try_get("is_active")?,
            expires_at: row
                .try_get::<Option<SqlxTimestamp>, _>("expires_at")?
                .map(SqlxTimestamp::to_jiff),
            rate_limit_per_minute: row.try_get("rate_limit_per_minute")?,
            last_used_at: row
                .try_get::<Option<SqlxTimestamp>, _>("last_used_at")?
                .map(SqlxTimestamp::to_jiff),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::test::TestDb;

    use super::*;

    fn new_record(hash: &str) -> NewTokenRecord {
        NewTokenRecord {
            uuid: TokenUuid::new(),
            name: "Ops".to_string(),
            note: String::new(),
            token_hash: hash.to_string(),
            token_ciphertext: "sealed".to_string(),
            key_prefix: "uk_live_abcdef".to_string(),
            expires_at: None,
            rate_limit_per_minute: 60,
        }
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn create_then_find_by_hash() -> TestResult {
        let db = TestDb::new().await;
        let repository = PgTokensRepository::new(db.pool().clone());

        let created = repository.create_token(new_record("hash-a")).await?;
        let found = repository.find_token_by_hash("hash-a").await?;

        assert_eq!(found, Some(created.clone()));
        assert!(created.is_active);
        assert!(created.last_used_at.is_none());

        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn duplicate_hash_is_already_exists() -> TestResult {
        let db = TestDb::new().await;
        let repository = PgTokensRepository::new(db.pool().clone());

        repository.create_token(new_record("dup")).await?;

        let result = repository.create_token(new_record("dup")).await;

        assert!(
            matches!(result, Err(StoreError::AlreadyExists)),
            "expected AlreadyExists, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn list_is_newest_first_and_delete_is_idempotent() -> TestResult {
        let db = TestDb::new().await;
        let repository = PgTokensRepository::new(db.pool().clone());

        let first = repository.create_token(new_record("one")).await?;
        let second = repository.create_token(new_record("two")).await?;

        let uuids: Vec<_> = repository
            .list_tokens()
            .await?
            .into_iter()
            .map(|token| token.uuid)
            .collect();

        assert_eq!(uuids, vec![second.uuid, first.uuid]);

        repository.delete_token(first.uuid).await?;
        repository.delete_token(first.uuid).await?;

        assert!(repository.find_token(first.uuid).await?.is_none());

        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn update_missing_token_is_not_found() -> TestResult {
        let db = TestDb::new().await;
        let repository = PgTokensRepository::new(db.pool().clone());

        let token = repository.create_token(new_record("gone")).await?;

        repository.delete_token(token.uuid).await?;

        let result = repository
            .update_token_fields(
                token.uuid,
                TokenUpdate {
                    name: Some("Renamed".to_string()),
                    ..TokenUpdate::default()
                },
            )
            .await;

        assert!(matches!(result, Err(StoreError::NotFound)));

        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn field_update_and_rotation_touch_disjoint_columns() -> TestResult {
        let db = TestDb::new().await;
        let repository = PgTokensRepository::new(db.pool().clone());

        let token = repository.create_token(new_record("before")).await?;

        repository
            .touch_last_used(token.uuid, Timestamp::now())
            .await?;

        let updated = repository
            .update_token_fields(
                token.uuid,
                TokenUpdate {
                    name: Some("Renamed".to_string()),
                    is_active: Some(false),
                    clear_expires_at: true,
                    ..TokenUpdate::default()
                },
            )
            .await?;

        assert_eq!(updated.token_hash, "before");
        assert!(updated.last_used_at.is_some());
        assert!(!updated.is_active);

        let rotated = repository
            .rotate_token(
                token.uuid,
                RotatedSecret {
                    token_hash: "after".to_string(),
                    token_ciphertext: "resealed".to_string(),
                    key_prefix: "uk_live_zyxwvu".to_string(),
                },
            )
            .await?;

        assert_eq!(rotated.name, "Renamed");
        assert_eq!(rotated.token_hash, "after");
        assert!(rotated.is_active);
        assert!(rotated.last_used_at.is_none());
        assert!(repository.find_token_by_hash("before").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn rotate_onto_a_taken_digest_is_already_exists() -> TestResult {
        let db = TestDb::new().await;
        let repository = PgTokensRepository::new(db.pool().clone());

        repository.create_token(new_record("taken")).await?;
        let token = repository.create_token(new_record("mine")).await?;

        let result = repository
            .rotate_token(
                token.uuid,
                RotatedSecret {
                    token_hash: "taken".to_string(),
                    token_ciphertext: "sealed".to_string(),
                    key_prefix: "uk_live_abcdef".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(StoreError::AlreadyExists)));

        Ok(())
    }
}
