//! Per-request trace IDs and access logging.
//!
//! Reuses an incoming `x-trace-id` header when it parses as a UUID, otherwise
//! generates one. The ID is attached to an `http_request` span, forwarded to
//! handlers in the request headers and echoed back on the response.
//!
//! Bodies are not buffered here: uploads can be megabytes and the body limit
//! is enforced by the extractors downstream.

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderValue, header},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

pub static X_TRACE_ID: &str = "x-trace-id";

pub async fn trace_middleware(mut req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        let content_type = header_str(&req, header::CONTENT_TYPE);
        let content_length = header_str(&req, header::CONTENT_LENGTH);
        info!(content_type = %content_type, content_length = %content_length, "→ request started");

        // A hyphenated UUID is always a valid header value.
        let trace_header = HeaderValue::from_str(&trace_id.to_string()).ok();
        if let Some(value) = trace_header.clone() {
            req.headers_mut().insert(X_TRACE_ID, value);
        }

        let mut response = next.run(req).await;

        if let Some(value) = trace_header {
            response.headers_mut().insert(X_TRACE_ID, value);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis() as u64,
            "← response finished"
        );
        response
    }
    .instrument(span)
    .await
}

fn header_str(req: &Request<Body>, name: header::HeaderName) -> String {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_owned()
}
