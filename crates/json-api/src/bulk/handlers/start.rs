//! Start Bulk Provisioning Handler

use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{bulk::models::JobResponse, errors::ApiError, extensions::*};

/// Start Bulk Provisioning Request
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub(crate) struct StartBulkRequest {
    /// Raw pool key secrets; trimmed, blanks dropped, duplicates collapsed
    #[serde(default)]
    pub keys: Vec<String>,

    #[serde(default)]
    pub alias: String,

    /// Per-key quota; non-positive values use the default
    #[serde(default)]
    pub total_quota: i32,
}

/// Start Bulk Provisioning Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct StartBulkResponse {
    pub job: JobResponse,

    /// True when `job` is an earlier job that is still running
    pub already_running: bool,
}

/// Start Bulk Provisioning Handler
///
/// Returns immediately; progress is polled through the status endpoint.
#[endpoint(tags("pool-keys"), summary = "Start bulk pool key provisioning")]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<StartBulkResponse>, ApiError> {
    let request: StartBulkRequest = req.json_or_400().await?;

    let started = depot.state_or_500()?.app.bulk.start(
        request.keys,
        request.alias,
        request.total_quota,
    )?;

    Ok(Json(StartBulkResponse {
        job: JobResponse::from(&started.job),
        already_running: started.already_running,
    }))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::json;
    use sublet_app::domain::bulk::{
        BulkJobError, MockBulkJobService,
        job::{BulkJob, BulkJobStart, BulkJobStatus},
    };
    use testresult::TestResult;

    use crate::errors::ErrorBody;

    use super::{super::tests::*, *};

    fn route() -> Router {
        Router::with_path("keys/batch").post(handler)
    }

    #[tokio::test]
    async fn test_start_reports_running_job() -> TestResult {
        let mut bulk = MockBulkJobService::new();

        bulk.expect_start()
            .once()
            .withf(|keys, alias, quota| keys.len() == 2 && alias == "Team" && *quota == 50)
            .return_once(|keys, _, _| {
                Ok(BulkJobStart {
                    job: BulkJob {
                        status: BulkJobStatus::Running,
                        total: keys.len(),
                        ..BulkJob::idle()
                    },
                    already_running: true,
                })
            });

        let mut res = TestClient::post("http://example.com/keys/batch")
            .json(&json!({ "keys": ["a", "b"], "alias": "Team", "total_quota": 50 }))
            .send(&make_service(bulk, route()))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        let body: StartBulkResponse = res.take_json().await?;

        assert!(body.already_running);
        assert_eq!(body.job.status, "running");
        assert_eq!(body.job.total, 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_start_maps_capacity_errors() -> TestResult {
        for (error, code) in [
            (BulkJobError::NoItems, "missing_keys"),
            (
                BulkJobError::TooLarge {
                    count: 5001,
                    limit: 5000,
                },
                "too_many_keys",
            ),
        ] {
            let mut bulk = MockBulkJobService::new();

            bulk.expect_start().once().return_once(move |_, _, _| Err(error));

            let mut res = TestClient::post("http://example.com/keys/batch")
                .json(&json!({ "keys": [] }))
                .send(&make_service(bulk, route()))
                .await;

            let body: ErrorBody = res.take_json().await?;

            assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
            assert_eq!(body.error, code);
        }

        Ok(())
    }
}
