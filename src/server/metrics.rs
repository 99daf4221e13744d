//! Prometheus metrics for the sidecar
//!
//! Two counters, created once at startup and never reset:
//! - `database_ping_total{status}` - prober outcome per tick (skip, fail, success)
//! - `http_requests_total{code,method}` - every request served by any listener
//!
//! Components receive the registry as a [`MetricsSink`] trait object so
//! tests can swap in a recording fake.

use axum::http::{Method, StatusCode};
use prometheus::{self, Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::fmt;
use std::sync::Arc;

/// Outcome label for `database_ping_total`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PingStatus {
    /// No database configured, tick counted as heartbeat
    Skip,
    /// Liveness check failed or timed out
    Fail,
    /// Liveness check answered within the timeout
    Success,
}

impl PingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PingStatus::Skip => "skip",
            PingStatus::Fail => "fail",
            PingStatus::Success => "success",
        }
    }
}

impl fmt::Display for PingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination for sidecar counters
pub trait MetricsSink: Send + Sync {
    /// Count one prober tick
    fn record_db_ping(&self, status: PingStatus);

    /// Count one served HTTP request
    fn record_http_request(&self, code: StatusCode, method: &Method);

    /// Render all metrics in Prometheus text exposition format
    fn encode(&self) -> Result<String, prometheus::Error>;
}

/// Shared metrics handle passed to every component
pub type SharedMetrics = Arc<dyn MetricsSink>;

/// Sidecar metrics registry
///
/// Owns its own `Registry` rather than the process-global default one.
#[derive(Clone)]
pub struct SidecarMetrics {
    registry: Registry,
    /// Database pings by status (skip, fail, success)
    pub database_ping_total: IntCounterVec,
    /// HTTP requests by response code and method
    pub http_requests_total: IntCounterVec,
}

impl SidecarMetrics {
    /// Create a new registry with both counters registered
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let database_ping_total = IntCounterVec::new(
            Opts::new("database_ping_total", "Total number of database ping sent."),
            &["status"],
        )?;
        registry.register(Box::new(database_ping_total.clone()))?;

        let http_requests_total = IntCounterVec::new(
            Opts::new(
                "http_requests_total",
                "Total number of HTTP request by code.",
            ),
            &["code", "method"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        Ok(Self {
            registry,
            database_ping_total,
            http_requests_total,
        })
    }
}

impl MetricsSink for SidecarMetrics {
    fn record_db_ping(&self, status: PingStatus) {
        self.database_ping_total
            .with_label_values(&[status.as_str()])
            .inc();
    }

    fn record_http_request(&self, code: StatusCode, method: &Method) {
        let method = method.as_str().to_ascii_lowercase();
        self.http_requests_total
            .with_label_values(&[code.as_str(), method.as_str()])
            .inc();
    }

    fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!("Failed to encode metrics as UTF-8: {}", e))
        })
    }
}

/// Create a new shared metrics instance
pub fn create_metrics() -> Result<SharedMetrics, prometheus::Error> {
    Ok(Arc::new(SidecarMetrics::new()?))
}

/// In-memory sink for tests
#[cfg(test)]
#[allow(clippy::expect_used)]
#[derive(Default)]
pub struct RecordingMetrics {
    pings: std::sync::Mutex<Vec<PingStatus>>,
    requests: std::sync::Mutex<Vec<(u16, String)>>,
}

#[cfg(test)]
#[allow(clippy::expect_used)]
impl RecordingMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// How many pings were recorded with the given status
    pub fn pings(&self, status: PingStatus) -> usize {
        self.pings
            .lock()
            .expect("RecordingMetrics lock poisoned")
            .iter()
            .filter(|s| **s == status)
            .count()
    }

    /// All recorded requests as (code, lowercase method)
    pub fn requests(&self) -> Vec<(u16, String)> {
        self.requests
            .lock()
            .expect("RecordingMetrics lock poisoned")
            .clone()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
impl MetricsSink for RecordingMetrics {
    fn record_db_ping(&self, status: PingStatus) {
        self.pings
            .lock()
            .expect("RecordingMetrics lock poisoned")
            .push(status);
    }

    fn record_http_request(&self, code: StatusCode, method: &Method) {
        self.requests
            .lock()
            .expect("RecordingMetrics lock poisoned")
            .push((code.as_u16(), method.as_str().to_ascii_lowercase()));
    }

    fn encode(&self) -> Result<String, prometheus::Error> {
        Ok(String::new())
    }
}
