//! HTTP request/response tracing middleware.

use axum::http::Request;
use tower_http::LatencyUnit;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{
    DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, MakeSpan, TraceLayer,
};
use tracing::{Level, Span};
use uuid::Uuid;

/// Span factory tagging every request with a random `request_id`.
///
/// Only the path is recorded. Query strings and cookies never reach the logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        tracing::info_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
            request_id = %Uuid::new_v4(),
        )
    }
}

pub type HttpTraceLayer = TraceLayer<SharedClassifier<ServerErrorsAsFailures>, RequestSpan>;

/// Creates a tracing middleware for HTTP requests.
///
/// Request start is logged at `DEBUG`, the response at `INFO` with status and
/// latency in milliseconds, and 5xx responses at `ERROR`.
///
/// # Example Logs
///
/// ```text
/// INFO request{method=POST path=/api/shorten request_id=5b0c...}: finished processing request latency=3 ms status=201
/// INFO request{method=GET path=/Ab3_x9Zq request_id=91fe...}: finished processing request latency=1 ms status=410
/// ```
pub fn layer() -> HttpTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(RequestSpan)
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
        .on_failure(
            DefaultOnFailure::new()
                .level(Level::ERROR)
                .latency_unit(LatencyUnit::Millis),
        )
}
