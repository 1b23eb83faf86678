//! Distributed Key Stats Handler

use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};
use sublet_app::domain::{tokens::records::TokenUuid, usage::DEFAULT_SERIES_DAYS};

use crate::{
    errors::ApiError,
    extensions::*,
    tokens::models::{DailyCounts, TokenItem, UsageCounts},
};

const MAX_STATS_DAYS: i32 = 365;

/// Distributed Key Stats Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct TokenStatsResponse {
    pub item: TokenItem,

    /// All-time counters
    pub totals: UsageCounts,

    /// Days with recorded usage inside the window, oldest first
    pub series: Vec<DailyCounts>,

    pub days: i32,
}

/// Window length from `?days=`, defaulting when absent or blank.
fn parse_days(raw: Option<&str>) -> Result<i32, ApiError> {
    let raw = raw.map(str::trim).unwrap_or_default();

    if raw.is_empty() {
        return Ok(DEFAULT_SERIES_DAYS);
    }

    raw.parse::<i32>()
        .ok()
        .filter(|days| (1..=MAX_STATS_DAYS).contains(days))
        .ok_or(ApiError::bad_request("invalid_days"))
}

/// Distributed Key Stats Handler
#[endpoint(tags("distributed-keys"), summary = "Usage totals and daily series for a key")]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<TokenStatsResponse>, ApiError> {
    let uuid: TokenUuid = req.id_param_or_400("id")?;
    let state = depot.state_or_500()?;

    let token = state
        .app
        .tokens
        .find_token(uuid)
        .await?
        .ok_or(ApiError::not_found())?;

    let days = parse_days(req.query::<String>("days").as_deref())?;

    let totals = state
        .app
        .usage
        .totals(uuid)
        .await
        .or_500("failed to load distributed key totals")?;

    let series = state
        .app
        .usage
        .series(uuid, days)
        .await
        .or_500("failed to load distributed key series")?;

    Ok(Json(TokenStatsResponse {
        item: TokenItem::from(&token),
        totals: totals.into(),
        series: series.iter().map(DailyCounts::from).collect(),
        days,
    }))
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use salvo::test::{ResponseExt, TestClient};
    use sublet_app::domain::{
        tokens::MockTokensService,
        usage::{
            MockUsageService,
            records::{DailyUsage, UsageTotals},
        },
    };
    use testresult::TestResult;

    use crate::errors::ErrorBody;

    use super::{super::tests::*, *};

    fn route() -> Router {
        Router::with_path("distributed-keys/{id}/stats").get(handler)
    }

    #[test]
    fn days_default_and_bounds() {
        assert_eq!(parse_days(None), Ok(30));
        assert_eq!(parse_days(Some(" ")), Ok(30));
        assert_eq!(parse_days(Some("1")), Ok(1));
        assert_eq!(parse_days(Some("365")), Ok(365));
        assert!(parse_days(Some("0")).is_err());
        assert!(parse_days(Some("366")).is_err());
        assert!(parse_days(Some("week")).is_err());
    }

    #[tokio::test]
    async fn test_stats_returns_totals_and_series() -> TestResult {
        let uuid = TokenUuid::new();
        let token = make_token(uuid);

        let mut tokens = MockTokensService::new();

        tokens
            .expect_find_token()
            .once()
            .return_once(move |_| Ok(Some(token)));

        let day = UsageTotals {
            total: 2,
            status_2xx: 1,
            status_4xx: 1,
            status_5xx: 0,
        };

        let mut usage = MockUsageService::new();

        usage.expect_totals().once().return_once(move |_| Ok(day));
        usage
            .expect_series()
            .once()
            .withf(move |u, days| *u == uuid && *days == 7)
            .return_once(move |_, _| {
                Ok(vec![DailyUsage {
                    date: date(2026, 1, 2),
                    totals: day,
                }])
            });

        let mut res = TestClient::get(format!(
            "http://example.com/distributed-keys/{uuid}/stats?days=7"
        ))
        .send(&make_service(tokens, usage, route()))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        let body: TokenStatsResponse = res.take_json().await?;

        assert_eq!(body.days, 7);
        assert_eq!(body.totals.total_count, 2);
        assert_eq!(
            body.series.first().map(|day| day.date.as_str()),
            Some("2026-01-02")
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_stats_rejects_out_of_range_days() -> TestResult {
        let uuid = TokenUuid::new();
        let token = make_token(uuid);

        let mut tokens = MockTokensService::new();

        tokens
            .expect_find_token()
            .once()
            .return_once(move |_| Ok(Some(token)));

        let mut usage = MockUsageService::new();

        usage.expect_totals().never();

        let mut res = TestClient::get(format!(
            "http://example.com/distributed-keys/{uuid}/stats?days=400"
        ))
        .send(&make_service(tokens, usage, route()))
        .await;

        let body: ErrorBody = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
        assert_eq!(body.error, "invalid_days");

        Ok(())
    }

    #[tokio::test]
    async fn test_stats_for_unknown_key_is_404() -> TestResult {
        let mut tokens = MockTokensService::new();

        tokens.expect_find_token().once().return_once(|_| Ok(None));

        let res = TestClient::get(format!(
            "http://example.com/distributed-keys/{}/stats",
            TokenUuid::new()
        ))
        .send(&make_service(tokens, MockUsageService::new(), route()))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

        Ok(())
    }
}
