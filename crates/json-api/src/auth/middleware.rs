//! Admin secret middleware.

use salvo::prelude::*;
use tracing::debug;

use crate::{auth::extract_bearer_token, errors::ApiError, extensions::*};

/// Admit only requests bearing the current admin secret.
#[salvo::handler]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    let state = match depot.state_or_500() {
        Ok(state) => state,
        Err(error) => {
            res.render(error);

            return;
        }
    };

    let authorized = extract_bearer_token(req)
        .is_some_and(|candidate| state.app.admin_secret.authenticate(candidate));

    if !authorized {
        debug!(path = req.uri().path(), "admin request rejected");

        res.render(ApiError::unauthorized("unauthorized"));

        return;
    }

    ctrl.call_next(req, depot, res).await;
}
