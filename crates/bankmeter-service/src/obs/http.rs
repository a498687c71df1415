//! Per-request timing middleware (`http.server.requests`).
//!
//! Installed as a route layer so the matched route template is known; that
//! keeps the `uri` tag low-cardinality (`/accounts/:id`, not `/accounts/42`).

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

use crate::app_state::AppState;

pub const HTTP_SERVER_REQUESTS: &str = "http.server.requests";

/// Status class as reported in the `outcome` tag.
pub fn outcome(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "INFORMATIONAL",
        200..=299 => "SUCCESS",
        300..=399 => "REDIRECTION",
        400..=499 => "CLIENT_ERROR",
        500..=599 => "SERVER_ERROR",
        _ => "UNKNOWN",
    }
}

pub async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().as_str().to_owned();
    let uri = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "UNKNOWN".to_owned());

    let response = next.run(req).await;

    let status = response.status();
    let tags = [
        ("method", method.as_str()),
        ("uri", uri.as_str()),
        ("status", status.as_str()),
        ("outcome", outcome(status)),
    ];
    match state.registry().timer(HTTP_SERVER_REQUESTS, &tags) {
        Ok(timer) => timer.record(start.elapsed()),
        Err(e) => tracing::warn!(error = %e, %uri, "http request timing dropped"),
    }
    response
}
