//! Usage Repository

use async_trait::async_trait;
use jiff::civil::Date;
use jiff_sqlx::Date as SqlxDate;
use mockall::automock;
use sqlx::{FromRow, PgPool, Postgres, Row, postgres::PgRow, query, query_as};

use crate::{
    database::StoreError,
    domain::{
        tokens::records::TokenUuid,
        usage::records::{DailyUsage, StatusClass, TokenUsageTotals, UsageTotals},
    },
};

const INCREMENT_USAGE_SQL: &str = include_str!("sql/increment_usage.sql");
const USAGE_TOTALS_SQL: &str = include_str!("sql/usage_totals.sql");
const USAGE_SERIES_SQL: &str = include_str!("sql/usage_series.sql");
const AGGREGATE_USAGE_SQL: &str = include_str!("sql/aggregate_usage.sql");

#[automock]
#[async_trait]
/// Daily usage counter persistence.
pub trait UsageRepository: Send + Sync {
    /// Insert the day's row or add one to it, atomically.
    async fn increment(
        &self,
        token: TokenUuid,
        date: Date,
        class: StatusClass,
    ) -> Result<(), StoreError>;

    async fn totals(&self, token: TokenUuid) -> Result<UsageTotals, StoreError>;

    /// Days on or after `since`, oldest first.
    async fn series(&self, token: TokenUuid, since: Date) -> Result<Vec<DailyUsage>, StoreError>;

    async fn aggregate(&self) -> Result<Vec<TokenUsageTotals>, StoreError>;
}

#[derive(Debug, Clone)]
/// PostgreSQL-backed usage repository.
pub struct PgUsageRepository {
    pool: PgPool,
}

impl PgUsageRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageRepository for PgUsageRepository {
    async fn increment(
        &self,
        token: TokenUuid,
        date: Date,
        class: StatusClass,
    ) -> Result<(), StoreError> {
        let (success, client, server) = class.increments();

        query(INCREMENT_USAGE_SQL)
            .bind(token.into_uuid())
            .bind(SqlxDate::from(date))
            .bind(success)
            .bind(client)
            .bind(server)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn totals(&self, token: TokenUuid) -> Result<UsageTotals, StoreError> {
        query_as::<Postgres, UsageTotals>(USAGE_TOTALS_SQL)
            .bind(token.into_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn series(&self, token: TokenUuid, since: Date) -> Result<Vec<DailyUsage>, StoreError> {
        query_as::<Postgres, DailyUsage>(USAGE_SERIES_SQL)
            .bind(token.into_uuid())
            .bind(SqlxDate::from(since))
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn aggregate(&self) -> Result<Vec<TokenUsageTotals>, StoreError> {
        query_as::<Postgres, TokenUsageTotals>(AGGREGATE_USAGE_SQL)
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }
}

impl<'r> FromRow<'r, PgRow> for UsageTotals {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            total: row.try_get("total_count")?,
            status_2xx: row.try_get("status_2xx")?,
            status_4xx: row.try_get("status_4xx")?,
            status_5xx: row.try_get("status_5xx")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for DailyUsage {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            date: row.try_get::<SqlxDate, _>("date")?.to_jiff(),
            totals: UsageTotals::from_row(row)?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for TokenUsageTotals {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            token: TokenUuid::from_uuid(row.try_get("token_uuid")?),
            totals: UsageTotals::from_row(row)?,
        })
    }
}
