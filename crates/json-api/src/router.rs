//! App Router

use std::sync::Arc;

use salvo::{affix_state::inject, prelude::*, trailing_slash::remove_slash};

use crate::{
    auth, bulk, errors::ApiError, gateway, healthcheck, master_key,
    observability::{metrics_handler, request_logging},
    state::State,
    tokens,
};

#[salvo::handler]
async fn unknown_admin_route(res: &mut Response) {
    res.render(ApiError::not_found());
}

/// Documented routes: the healthcheck plus the admin API under `/api`.
pub(crate) fn api_router() -> Router {
    Router::new()
        .push(Router::with_path("healthcheck").get(healthcheck::handler))
        .push(
            Router::with_path("api")
                .hoop(auth::middleware::handler)
                .push(
                    Router::with_path("distributed-keys")
                        .get(tokens::index::handler)
                        .post(tokens::create::handler)
                        .push(
                            Router::with_path("{id}")
                                .put(tokens::update::handler)
                                .delete(tokens::delete::handler)
                                .push(Router::with_path("rotate").post(tokens::rotate::handler))
                                .push(Router::with_path("stats").get(tokens::stats::handler)),
                        ),
                )
                .push(
                    Router::with_path("keys/batch")
                        .get(bulk::status::handler)
                        .post(bulk::start::handler),
                )
                .push(Router::with_path("master-key/reset").post(master_key::handler))
                .push(Router::with_path("{**rest}").goal(unknown_admin_route)),
        )
}

/// Everything else is proxied upstream behind the distributed key guard.
pub(crate) fn gateway_router() -> Router {
    Router::with_path("{**rest}")
        .hoop(gateway::guard::handler)
        .goal(gateway::proxy::handler)
}

/// The full service; `extra` routes are matched before the gateway catch-all.
pub(crate) fn app_router(state: Arc<State>, extra: Vec<Router>) -> Router {
    let router = Router::new()
        .hoop(CatchPanic::new())
        .hoop(request_logging)
        .hoop(remove_slash())
        .hoop(inject(state))
        .push(Router::with_path("metrics").get(metrics_handler))
        .push(api_router());

    extra
        .into_iter()
        .fold(router, Router::push)
        .push(gateway_router())
}
