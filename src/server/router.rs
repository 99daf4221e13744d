//! Request handling shared by every listener
//!
//! - `GET /*` - Echo: dump of the request head as `text/plain`
//! - `GET <metrics path>` - Prometheus metrics in text format (optional)
//! - `GET /k8s/preStop` - Pre-stop hook (pre-stop listener only)
//!
//! Every request, whatever route answers it, is counted in
//! `http_requests_total`. Requests whose head is over the size limit are
//! answered with 431 before counting, as they never reach a route.

use super::echo::dump_request;
use super::listener::{MAX_HEADER_BYTES, SERVER_TIMEOUT};
use super::metrics::SharedMetrics;
use super::pre_stop::{pre_stop, PreStopState};
use crate::config::{normalize_metrics_path, PRE_STOP_PATH};
use axum::{
    extract::{Request, State},
    http::{header::CONTENT_TYPE, request::Parts, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info, warn};

/// State shared by the echo and metrics handlers of one listener
#[derive(Clone)]
pub struct ListenerState {
    listen: Arc<str>,
    metrics: SharedMetrics,
}

impl ListenerState {
    /// Create new listener state
    pub fn new(listen: &str, metrics: SharedMetrics) -> Self {
        Self {
            listen: Arc::from(listen),
            metrics,
        }
    }
}

/// Echo handler
///
/// Returns the request line and headers exactly as received. The body is
/// left unread.
async fn echo(State(state): State<ListenerState>, request: Request) -> Response {
    let (parts, _body) = request.into_parts();
    info!(listen = %state.listen, "request {}", parts.uri);

    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain")],
        dump_request(&parts),
    )
        .into_response()
}

/// Prometheus metrics handler
///
/// Returns metrics in Prometheus text format for scraping.
async fn metrics(State(state): State<ListenerState>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "encoding metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}

/// Count every response by status code and method
async fn count_requests(
    State(metrics): State<SharedMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let response = next.run(request).await;
    metrics.record_http_request(response.status(), &method);
    response
}

/// Slack allowed on top of [`MAX_HEADER_BYTES`] for the request line and
/// header framing
const HEADER_SLACK_BYTES: usize = 4096;

/// Size of the request head as it appeared on the wire
///
/// Request line plus `name: value\r\n` for every header value.
fn head_size(parts: &Parts) -> usize {
    let request_line = parts.method.as_str().len()
        + parts.uri.to_string().len()
        + "HTTP/1.1".len()
        + 4;
    let headers: usize = parts
        .headers
        .iter()
        .map(|(name, value)| name.as_str().len() + value.len() + 4)
        .sum();
    request_line + headers
}

/// Reject requests whose head is over the limit with 431
async fn limit_header_size(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let size = head_size(&parts);
    if size > MAX_HEADER_BYTES + HEADER_SLACK_BYTES {
        warn!(size, limit = MAX_HEADER_BYTES, "request header too large");
        return StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE.into_response();
    }
    next.run(Request::from_parts(parts, body)).await
}

/// Build the router for one listener
///
/// `metrics_path == None` leaves the metrics route out, so that path is
/// answered by the echo handler. The path is normalized first, so pattern
/// syntax never reaches the route table. `pre_stop` adds the pre-stop
/// route; it sits outside the request timeout because it blocks until
/// draining is done.
pub fn build_router(
    listen: &str,
    metrics_path: Option<&str>,
    metrics: SharedMetrics,
    pre_stop_state: Option<PreStopState>,
) -> Router {
    let state = ListenerState::new(listen, metrics.clone());
    let metrics_path = metrics_path.map(normalize_metrics_path);
    let metrics_path = metrics_path.as_deref();

    let mut router = Router::new().route("/{*path}", get(echo));
    if metrics_path != Some("/") {
        router = router.route("/", get(echo));
    }

    match metrics_path {
        Some(path) => {
            info!(listen = %listen, path = %path, "register metrics");
            router = router.route(path, get(self::metrics));
        }
        None => info!(listen = %listen, "skip metrics registration"),
    }

    #[allow(deprecated)]
    let mut router = router
        .with_state(state)
        .layer(TimeoutLayer::new(SERVER_TIMEOUT));

    if let Some(pre_stop_state) = pre_stop_state {
        info!(listen = %listen, path = PRE_STOP_PATH, "register pre-stop hook");
        router = router.route(PRE_STOP_PATH, get(pre_stop).with_state(pre_stop_state));
    }

    router
        .layer(middleware::from_fn_with_state(metrics, count_requests))
        .layer(middleware::from_fn(limit_header_size))
}
