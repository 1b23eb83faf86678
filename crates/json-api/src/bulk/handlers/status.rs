//! Bulk Provisioning Status Handler

use salvo::prelude::*;

use crate::{bulk::models::JobResponse, errors::ApiError, extensions::*};

/// Bulk Provisioning Status Handler
///
/// Reports the idle placeholder until a job has been started.
#[endpoint(tags("pool-keys"), summary = "Bulk pool key provisioning status")]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<JobResponse>, ApiError> {
    let job = depot.state_or_500()?.app.bulk.snapshot();

    Ok(Json(JobResponse::from(&job)))
}
