//! Settings Repository

use async_trait::async_trait;
use mockall::automock;
use sqlx::{PgPool, query, query_scalar};

use crate::database::StoreError;

const GET_SETTING_SQL: &str = include_str!("sql/get_setting.sql");
const PUT_SETTING_SQL: &str = include_str!("sql/put_setting.sql");
const INSERT_SETTING_IF_ABSENT_SQL: &str = include_str!("sql/insert_setting_if_absent.sql");

#[automock]
#[async_trait]
/// Generic key/value settings store.
pub trait SettingsRepository: Send + Sync {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Insert or replace the value stored under `key`.
    async fn put_setting(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Store `value` only when nothing is stored under `key` yet.
    ///
    /// Returns whether this call wrote the row.
    async fn insert_setting_if_absent(&self, key: &str, value: &str) -> Result<bool, StoreError>;
}

#[derive(Debug, Clone)]
pub struct PgSettingsRepository {
    pool: PgPool,
}

impl PgSettingsRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for PgSettingsRepository {
    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        query_scalar::<_, String>(GET_SETTING_SQL)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn put_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        query(PUT_SETTING_SQL)
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn insert_setting_if_absent(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let result = query(INSERT_SETTING_IF_ABSENT_SQL)
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}
