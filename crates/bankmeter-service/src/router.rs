//! Axum router wiring.
//!
//! Exposes the health and scrape endpoints. When enabled, every routed
//! request is timed as `http.server.requests`.

use axum::{middleware, routing::get, Router};

use crate::{app_state::AppState, obs, ops};

pub fn build_router(state: AppState) -> Router {
    let metrics = &state.cfg().metrics;
    let mut router = Router::new()
        .route("/actuator/health", get(ops::health))
        .route(&metrics.endpoint, get(ops::prometheus));

    if metrics.http_server_requests {
        router = router.route_layer(middleware::from_fn_with_state(
            state.clone(),
            obs::http::track_requests,
        ));
    }
    router.with_state(state)
}
