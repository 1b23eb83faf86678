//! Pool Keys Repository

use async_trait::async_trait;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use mockall::automock;
use sqlx::{FromRow, PgPool, Postgres, Row, postgres::PgRow, query_as};

use crate::{
    database::StoreError,
    domain::pool_keys::records::{NewPoolKey, PoolKeyRecord, PoolKeyUuid},
};

const CREATE_POOL_KEY_SQL: &str = include_str!("sql/create_pool_key.sql");
const SELECT_POOL_KEY_SQL: &str = include_str!("sql/select_pool_key.sql");

#[automock]
#[async_trait]
/// Upstream credential persistence.
pub trait PoolKeysRepository: Send + Sync {
    /// Insert a key. A duplicate secret is [`StoreError::AlreadyExists`].
    async fn create_pool_key(&self, key: NewPoolKey) -> Result<PoolKeyRecord, StoreError>;

    /// Claim the least recently used active key, stamping its last use.
    async fn select_pool_key(&self) -> Result<Option<PoolKeyRecord>, StoreError>;
}

#[derive(Debug, Clone)]
pub struct PgPoolKeysRepository {
    pool: PgPool,
}

impl PgPoolKeysRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PoolKeysRepository for PgPoolKeysRepository {
    async fn create_pool_key(&self, key: NewPoolKey) -> Result<PoolKeyRecord, StoreError> {
        query_as::<Postgres, PoolKeyRecord>(CREATE_POOL_KEY_SQL)
            .bind(key.uuid.into_uuid())
            .bind(key.key)
            .bind(key.alias)
            .bind(key.total_quota)
            .fetch_one(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn select_pool_key(&self) -> Result<Option<PoolKeyRecord>, StoreError> {
        query_as::<Postgres, PoolKeyRecord>(SELECT_POOL_KEY_SQL)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }
}

impl<'r> FromRow<'r, PgRow> for PoolKeyRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: PoolKeyUuid::from_uuid(row.try_get("uuid")?),
            key: row.try_get("key")?,
            alias: row.try_get("alias")?,
            total_quota: row.try_get("total_quota")?,
            used_quota: row.try_get("used_quota")?,
            is_active: row.try_get("is_active")?,
            last_used_at: row
                .try_get::<Option<SqlxTimestamp>, _>("last_used_at")?
                .map(SqlxTimestamp::to_jiff),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
