//! Usage meter.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use jiff::{Span, Timestamp, civil::Date, tz::TimeZone};
use mockall::automock;
use rustc_hash::FxHashMap;
use sqlx::PgPool;

use crate::domain::{
    tokens::records::TokenUuid,
    usage::{
        errors::UsageServiceError,
        records::{DailyUsage, StatusClass, UsageTotals},
        repository::{PgUsageRepository, UsageRepository},
    },
};

/// Series length used when a non-positive day count is requested.
pub const DEFAULT_SERIES_DAYS: i32 = 30;

#[automock]
#[async_trait]
/// Per-token daily request accounting.
pub trait UsageService: Send + Sync {
    /// Count one response against the token's UTC day. The nil token is ignored.
    async fn record(
        &self,
        token: TokenUuid,
        status: u16,
        when: Timestamp,
    ) -> Result<(), UsageServiceError>;

    /// All-time totals for one token.
    async fn totals(&self, token: TokenUuid) -> Result<UsageTotals, UsageServiceError>;

    /// The last `days` UTC days up to and including today, oldest first.
    async fn series(
        &self,
        token: TokenUuid,
        days: i32,
    ) -> Result<Vec<DailyUsage>, UsageServiceError>;

    /// All-time totals for every token with recorded usage.
    async fn aggregate_by_token(
        &self,
    ) -> Result<FxHashMap<TokenUuid, UsageTotals>, UsageServiceError>;
}

#[derive(Clone)]
pub struct UsageMeter {
    repository: Arc<dyn UsageRepository>,
}

impl fmt::Debug for UsageMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsageMeter").finish_non_exhaustive()
    }
}

impl UsageMeter {
    #[must_use]
    pub fn new(repository: Arc<dyn UsageRepository>) -> Self {
        Self { repository }
    }

    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self::new(Arc::new(PgUsageRepository::new(pool)))
    }

    /// [`UsageService::series`] anchored on an explicit `today`.
    ///
    /// # Errors
    ///
    /// Returns an error when the store query fails.
    pub async fn series_through(
        &self,
        token: TokenUuid,
        days: i32,
        today: Date,
    ) -> Result<Vec<DailyUsage>, UsageServiceError> {
        self.repository
            .series(token, series_start(days, today))
            .await
            .map_err(Into::into)
    }
}

/// UTC calendar day containing `when`.
#[must_use]
pub fn utc_date(when: Timestamp) -> Date {
    when.to_zoned(TimeZone::UTC).date()
}

/// First day of a `days`-long window ending on `today`.
#[must_use]
pub fn series_start(days: i32, today: Date) -> Date {
    let days = if days <= 0 { DEFAULT_SERIES_DAYS } else { days };

    Span::new()
        .try_days(i64::from(days) - 1)
        .and_then(|span| today.checked_sub(span))
        .unwrap_or(Date::MIN)
}

#[async_trait]
impl UsageService for UsageMeter {
    async fn record(
        &self,
        token: TokenUuid,
        status: u16,
        when: Timestamp,
    ) -> Result<(), UsageServiceError> {
        if token.is_nil() {
            return Ok(());
        }

        self.repository
            .increment(token, utc_date(when), StatusClass::from_status(status))
            .await
            .map_err(Into::into)
    }

    async fn totals(&self, token: TokenUuid) -> Result<UsageTotals, UsageServiceError> {
        self.repository.totals(token).await.map_err(Into::into)
    }

    async fn series(
        &self,
        token: TokenUuid,
        days: i32,
    ) -> Result<Vec<DailyUsage>, UsageServiceError> {
        self.series_through(token, days, utc_date(Timestamp::now()))
            .await
    }

    async fn aggregate_by_token(
        &self,
    ) -> Result<FxHashMap<TokenUuid, UsageTotals>, UsageServiceError> {
        let rows = self.repository.aggregate().await?;

        Ok(rows.into_iter().map(|row| (row.token, row.totals)).collect())
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use testresult::TestResult;

    use crate::{
        domain::usage::repository::MockUsageRepository, memory::InMemoryUsageRepository,
    };

    use super::*;

    fn meter() -> UsageMeter {
        UsageMeter::new(Arc::new(InMemoryUsageRepository::default()))
    }

    fn at(date: Date, hour: i8) -> TestResult<Timestamp> {
        Ok(date.at(hour, 0, 0, 0).to_zoned(TimeZone::UTC)?.timestamp())
    }

    #[tokio::test]
    async fn record_ignores_nil_token() -> TestResult {
        let mut repository = MockUsageRepository::new();

        repository.expect_increment().never();

        UsageMeter::new(Arc::new(repository))
            .record(TokenUuid::nil(), 200, Timestamp::now())
            .await?;

        Ok(())
    }

    #[tokio::test]
    async fn record_partitions_by_status_class() -> TestResult {
        let meter = meter();
        let token = TokenUuid::new();
        let now = Timestamp::now();

        for status in [200, 201, 404, 429, 500, 503, 302] {
            meter.record(token, status, now).await?;
        }

        assert_eq!(
            meter.totals(token).await?,
            UsageTotals {
                total: 7,
                status_2xx: 2,
                status_4xx: 2,
                status_5xx: 2,
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn concurrent_records_are_all_counted() -> TestResult {
        let meter = meter();
        let token = TokenUuid::new();
        let now = Timestamp::now();

        let mut tasks = Vec::new();

        for _ in 0..64 {
            let meter = meter.clone();

            tasks.push(tokio::spawn(
                async move { meter.record(token, 200, now).await },
            ));
        }

        for task in tasks {
            task.await??;
        }

        assert_eq!(meter.totals(token).await?.total, 64);
        assert_eq!(meter.totals(token).await?.status_2xx, 64);

        Ok(())
    }

    #[tokio::test]
    async fn records_bucket_by_utc_day() -> TestResult {
        let meter = meter();
        let token = TokenUuid::new();

        meter.record(token, 200, at(date(2025, 5, 1), 23)?).await?;
        meter.record(token, 200, at(date(2025, 5, 2), 0)?).await?;
        meter.record(token, 500, at(date(2025, 5, 2), 12)?).await?;

        let series = meter.series_through(token, 7, date(2025, 5, 2)).await?;
        let days: Vec<_> = series.iter().map(|day| (day.date, day.totals.total)).collect();

        assert_eq!(days, vec![(date(2025, 5, 1), 1), (date(2025, 5, 2), 2)]);

        Ok(())
    }

    #[tokio::test]
    async fn series_window_includes_today_and_excludes_older_days() -> TestResult {
        let meter = meter();
        let token = TokenUuid::new();
        let today = date(2025, 5, 10);

        meter.record(token, 200, at(date(2025, 5, 7), 1)?).await?;
        meter.record(token, 200, at(date(2025, 5, 8), 1)?).await?;
        meter.record(token, 200, at(today, 1)?).await?;

        let series = meter.series_through(token, 3, today).await?;
        let dates: Vec<_> = series.iter().map(|day| day.date).collect();

        assert_eq!(dates, vec![date(2025, 5, 8), today]);

        Ok(())
    }

    #[test]
    fn series_start_defaults_non_positive_days() {
        let today = date(2025, 5, 31);

        assert_eq!(series_start(0, today), date(2025, 5, 2));
        assert_eq!(series_start(-4, today), date(2025, 5, 2));
        assert_eq!(series_start(1, today), today);
    }

    #[tokio::test]
    async fn aggregate_groups_by_token() -> TestResult {
        let meter = meter();
        let first = TokenUuid::new();
        let second = TokenUuid::new();
        let now = Timestamp::now();

        meter.record(first, 200, now).await?;
        meter.record(first, 404, now).await?;
        meter.record(second, 500, now).await?;

        let aggregate = meter.aggregate_by_token().await?;

        assert_eq!(aggregate.len(), 2);
        assert_eq!(aggregate.get(&first).map(|totals| totals.total), Some(2));
        assert_eq!(
            aggregate.get(&second).map(|totals| totals.status_5xx),
            Some(1)
        );

        Ok(())
    }

    #[tokio::test]
    async fn totals_for_unknown_token_are_zero() -> TestResult {
        assert_eq!(
            meter().totals(TokenUuid::new()).await?,
            UsageTotals::default()
        );

        Ok(())
    }
}
