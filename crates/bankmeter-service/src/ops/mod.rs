//! Operational HTTP endpoints.
//!
//! - `/actuator/health`     : liveness
//! - `/actuator/prometheus` : Prometheus text format (path configurable)

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use bankmeter_core::Timed;

use crate::app_state::AppState;

pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Time spent rendering the scrape body, visible from the next scrape on.
pub const SCRAPE_TIMER: &str = "bankmeter.scrape";

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "UP" })))
}

pub async fn prometheus(State(state): State<AppState>) -> Response {
    let timed =
        Timed::new(SCRAPE_TIMER).description("Time spent rendering the Prometheus scrape");
    let body = state.timed().measure(&timed, || state.registry().scrape());

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        body,
    )
        .into_response()
}
