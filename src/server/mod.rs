//! HTTP listeners and the shutdown plumbing they share
//!
//! Every listener serves the same routes:
//! - `/*` - Echo of the request head (debugging proxies and load balancers)
//! - `/metrics` - Prometheus metrics in text format (path configurable)
//!
//! The pre-stop listener also serves `/k8s/preStop`, which starts
//! shutdown and answers once every other component has drained.

pub mod barrier;
pub mod echo;
mod listener;
pub mod metrics;
mod pre_stop;
mod router;
pub mod shutdown;

pub use barrier::{CompletionBarrier, CompletionGuard};
pub use listener::{HttpListener, ServerError, MAX_HEADER_BYTES, SERVER_TIMEOUT};
pub use metrics::{create_metrics, MetricsSink, PingStatus, SharedMetrics, SidecarMetrics};
pub use pre_stop::PreStopState;
pub use router::{build_router, ListenerState};
pub use shutdown::{shutdown_channel, ShutdownController, ShutdownSignal, TerminationSignals};

#[cfg(test)]
#[path = "shutdown_test.rs"]
mod shutdown_tests;

#[cfg(test)]
#[path = "barrier_test.rs"]
mod barrier_tests;

#[cfg(test)]
#[path = "metrics_test.rs"]
mod metrics_tests;

#[cfg(test)]
#[path = "echo_test.rs"]
mod echo_tests;

#[cfg(test)]
#[path = "router_test.rs"]
mod router_tests;
