//! Distributed key guard.
//!
//! Authenticates the bearer as a distributed key, charges its rate limit and
//! meters the final status of every authenticated request, rejected or not.

use jiff::Timestamp;
use salvo::prelude::*;
use sublet_app::gateway::AdmissionError;
use tracing::{debug, error};

use crate::{
    auth::extract_bearer_token,
    errors::ApiError,
    extensions::*,
    observability::{AdmissionOutcome, observe_admission},
};

/// Outcome label and response for a refused admission.
fn rejection(error: AdmissionError) -> (AdmissionOutcome, ApiError) {
    match error {
        AdmissionError::InvalidKey => (
            AdmissionOutcome::InvalidKey,
            ApiError::unauthorized("invalid_key"),
        ),
        AdmissionError::Disabled => (
            AdmissionOutcome::Disabled,
            ApiError::unauthorized("key_disabled"),
        ),
        AdmissionError::Expired => (
            AdmissionOutcome::Expired,
            ApiError::unauthorized("key_expired"),
        ),
        AdmissionError::RateLimited(_) => {
            (AdmissionOutcome::RateLimited, ApiError::rate_limited())
        }
        AdmissionError::Internal(source) => {
            error!("distributed key admission failed: {source}");

            (AdmissionOutcome::Error, ApiError::internal())
        }
    }
}

#[salvo::handler]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    let Some(bearer) = extract_bearer_token(req).map(str::to_owned) else {
        observe_admission(AdmissionOutcome::MissingKey);
        res.render(ApiError::unauthorized("missing_key"));

        return;
    };

    let state = match depot.state_or_500() {
        Ok(state) => state,
        Err(error) => {
            res.render(error);

            return;
        }
    };

    let now = Timestamp::now();

    match state.app.gateway.admit(&bearer, now).await {
        Ok(token) => {
            observe_admission(AdmissionOutcome::Admitted);

            ctrl.call_next(req, depot, res).await;

            let status = res.status_code.unwrap_or(StatusCode::OK);

            state
                .app
                .gateway
                .complete(token.uuid, status.as_u16(), now)
                .await;
        }
        Err(AdmissionError::RateLimited(token)) => {
            debug!(token = %token.uuid, "distributed key rate limited");

            observe_admission(AdmissionOutcome::RateLimited);

            let refusal = ApiError::rate_limited();

            state
                .app
                .gateway
                .complete(token.uuid, refusal.status().as_u16(), now)
                .await;

            res.render(refusal);
        }
        Err(error) => {
            let (outcome, refusal) = rejection(error);

            observe_admission(outcome);
            res.render(refusal);
        }
    }
}
