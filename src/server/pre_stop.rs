//! Pre-stop hook endpoint
//!
//! The orchestrator calls `GET /k8s/preStop` before sending SIGTERM. The
//! handler starts shutdown and holds the response until every workload
//! component (prober, echo listeners) has exited, so the caller knows
//! draining is complete when the call returns.
//!
//! The pre-stop listener is not registered in the barrier it waits on.
//! It drains through the same cancellation signal, and its graceful
//! shutdown lets this in-flight response finish before closing.

use super::barrier::CompletionBarrier;
use super::shutdown::ShutdownController;
use axum::{extract::State, http::StatusCode};
use tracing::info;

/// State for the pre-stop route
#[derive(Clone)]
pub struct PreStopState {
    shutdown: ShutdownController,
    workload: CompletionBarrier,
}

impl PreStopState {
    /// `workload` must not contain the pre-stop listener itself
    pub fn new(shutdown: ShutdownController, workload: CompletionBarrier) -> Self {
        Self { shutdown, workload }
    }
}

/// Trigger shutdown and wait for the workload to drain
pub async fn pre_stop(State(state): State<PreStopState>) -> StatusCode {
    if state.shutdown.shutdown() {
        info!("pre-stop hook called, shutting down");
    } else {
        info!("pre-stop hook called, shutdown already in progress");
    }

    state.workload.wait().await;

    info!("all components drained, releasing pre-stop hook");
    StatusCode::NO_CONTENT
}
