//! Upstream proxy handler.

use salvo::{
    http::header::{CONTENT_TYPE, HeaderValue},
    prelude::*,
};
use sublet_app::upstream::{UpstreamError, UpstreamRequest};
use tracing::{error, warn};

use crate::{errors::ApiError, extensions::*};

async fn upstream_request(req: &mut Request) -> Result<UpstreamRequest, ApiError> {
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let path_and_query = req
        .uri()
        .path_and_query()
        .map_or_else(|| "/".to_owned(), |value| value.as_str().to_owned());

    let method = req.method().as_str().to_owned();

    let body = req
        .payload()
        .await
        .or_500("failed to read proxied request body")?
        .to_vec();

    Ok(UpstreamRequest {
        method,
        path_and_query,
        content_type,
        body,
    })
}

async fn forward(req: &mut Request, depot: &Depot, res: &mut Response) -> Result<(), ApiError> {
    let request = upstream_request(req).await?;

    let response = match depot.state_or_500()?.app.forwarder.forward(request).await {
        Ok(response) => response,
        Err(UpstreamError::NoPoolKey) => return Err(ApiError::upstream_unavailable()),
        Err(UpstreamError::PoolKeys(source)) => {
            error!("failed to select a pool key: {source}");

            return Err(ApiError::internal());
        }
        Err(source) => {
            warn!("upstream request failed: {source}");

            return Err(ApiError::upstream_unavailable());
        }
    };

    res.status_code(StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY));

    if let Some(content_type) = response
        .content_type
        .as_deref()
        .and_then(|value| HeaderValue::from_str(value).ok())
    {
        res.headers_mut().insert(CONTENT_TYPE, content_type);
    }

    res.write_body(response.body)
        .or_500("failed to write upstream response body")
}

/// Replay the admitted request upstream and relay its response.
#[salvo::handler]
pub(crate) async fn handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    if let Err(error) = forward(req, depot, res).await {
        res.render(error);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use salvo::{
        affix_state::inject,
        test::{ResponseExt, TestClient},
    };
    use sublet_app::{
        context::AppContext,
        domain::{
            admin_secret::MockAdminSecretService,
            pool_keys::{MockPoolKeysService, records::PoolKeyRecord},
            tokens::MockTokensService,
            usage::MockUsageService,
        },
        rate_limiter::RateLimiter,
        upstream::{MockUpstream, UpstreamResponse},
    };
    use testresult::TestResult;

    use crate::{errors::ErrorBody, state::State};

    use super::*;

    fn pool_key() -> PoolKeyRecord {
        let now = jiff::Timestamp::UNIX_EPOCH;

        PoolKeyRecord {
            uuid: sublet_app::domain::pool_keys::records::PoolKeyUuid::new(),
            key: "tvly-pooled".to_owned(),
            alias: "Default".to_owned(),
            total_quota: 1000,
            used_quota: 0,
            is_active: true,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn make_service(pool_keys: MockPoolKeysService, upstream: MockUpstream) -> Service {
        let app = AppContext::assemble(
            Arc::new(MockTokensService::new()),
            Arc::new(MockUsageService::new()),
            Arc::new(MockAdminSecretService::new()),
            Arc::new(pool_keys),
            Arc::new(upstream),
            Arc::new(RateLimiter::default()),
        );

        Service::new(
            Router::new()
                .hoop(inject(State::from_app_context(app)))
                .push(Router::with_path("{**rest}").goal(handler)),
        )
    }

    #[tokio::test]
    async fn test_relays_upstream_response() -> TestResult {
        let mut pool_keys = MockPoolKeysService::new();

        pool_keys
            .expect_select_key()
            .once()
            .return_once(|| Ok(Some(pool_key())));

        let mut upstream = MockUpstream::new();

        upstream
            .expect_send()
            .withf(|request, key| {
                request.method == "POST"
                    && request.path_and_query == "/search?depth=basic"
                    && request
                        .content_type
                        .as_deref()
                        .is_some_and(|value| value.starts_with("application/json"))
                    && request.body == br#"{"query":"rust"}"#
                    && key == "tvly-pooled"
            })
            .once()
            .returning(|_, _| {
                Ok(UpstreamResponse {
                    status: 201,
                    content_type: Some("application/json".to_owned()),
                    body: br#"{"results":[]}"#.to_vec(),
                })
            });

        let mut res = TestClient::post("http://example.com/search?depth=basic")
            .json(&serde_json::json!({ "query": "rust" }))
            .send(&make_service(pool_keys, upstream))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::CREATED));
        assert_eq!(res.take_string().await?, r#"{"results":[]}"#);

        Ok(())
    }

    #[tokio::test]
    async fn test_empty_pool_is_upstream_unavailable() -> TestResult {
        let mut pool_keys = MockPoolKeysService::new();

        pool_keys.expect_select_key().once().return_once(|| Ok(None));

        let mut upstream = MockUpstream::new();

        upstream.expect_send().never();

        let mut res = TestClient::get("http://example.com/search")
            .send(&make_service(pool_keys, upstream))
            .await;

        let body: ErrorBody = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::BAD_GATEWAY));
        assert_eq!(body.error, "upstream_unavailable");

        Ok(())
    }
}
