//! Admission middleware.
//!
//! Wraps every route. While the tracker reports shutdown, requests are
//! refused with 503 before any tracking happens. Otherwise the request gets a
//! fresh [`RequestId`] and is tracked for exactly as long as its handler runs.

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tokio::time::Instant;
use tracing::Instrument;

use crate::http::error;
use crate::http::request::{RequestId, X_REQUEST_ID};
use crate::lifecycle::tracker::{RequestMetadata, RequestTracker};
use crate::observability::metrics;

pub async fn admission_middleware(
    State(tracker): State<RequestTracker>,
    mut request: Request,
    next: Next,
) -> Response {
    if tracker.is_shutting_down() {
        tracing::info!(method = %request.uri().path(), "Rejected request: service is shutting down");
        metrics::record_rejected();
        return error::unavailable();
    }

    let id = RequestId::new();
    let operation = request.uri().path().to_string();
    let metadata = RequestMetadata::from([
        ("method".to_string(), operation.clone()),
        ("http_method".to_string(), request.method().to_string()),
    ]);
    request.extensions_mut().insert(id);

    let span = tracing::info_span!("request", request_id = %id, method = %operation);
    let started = Instant::now();

    // The guard ends tracking even if the handler future is dropped.
    let guard = tracker.track(id, metadata);
    let mut response = next.run(request).instrument(span).await;
    drop(guard);

    metrics::record_request(&operation, response.status().as_u16(), started);
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}
