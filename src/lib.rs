//! Echo sidecar
//!
//! Diagnostic HTTP sidecar: echoes request heads back to the caller,
//! probes a Postgres database on a timer, exports Prometheus counters,
//! and drains cleanly on SIGTERM or a Kubernetes pre-stop call.

pub mod config;
pub mod lifecycle;
pub mod logging;
pub mod probe;
pub mod server;

pub use config::SidecarConfig;
pub use lifecycle::{RunningSidecar, Sidecar};
