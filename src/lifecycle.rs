//! Startup and shutdown sequencing
//!
//! [`Sidecar::start`] wires every component to one cancellation signal
//! and one completion barrier, in this order:
//! 1. Database prober (always, so `database_ping_total` keeps moving)
//! 2. One echo listener per configured address
//! 3. Pre-stop listener, when configured
//!
//! The prober and echo listeners hold barrier slots. The pre-stop
//! listener does not: its hook waits on that barrier, and it drains on
//! the cancellation signal like everything else.
//!
//! [`RunningSidecar::wait`] blocks until the barrier is empty, then joins
//! every task handle before returning.

use crate::config::SidecarConfig;
use crate::probe::{Prober, PROBE_INTERVAL};
use crate::server::{
    build_router, shutdown_channel, CompletionBarrier, HttpListener, PreStopState, SharedMetrics,
    ShutdownController, ShutdownSignal, TerminationSignals,
};
use futures::future::join_all;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Sidecar assembly, not yet started
pub struct Sidecar {
    config: SidecarConfig,
    metrics: SharedMetrics,
    probe_interval: Duration,
}

impl Sidecar {
    pub fn new(config: SidecarConfig, metrics: SharedMetrics) -> Self {
        Self {
            config,
            metrics,
            probe_interval: PROBE_INTERVAL,
        }
    }

    /// Override the prober tick interval
    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    /// Start every component and return the handle that owns them
    ///
    /// A listener that fails to bind is logged and skipped; the rest of
    /// the sidecar keeps running.
    pub async fn start(self) -> RunningSidecar {
        let (controller, signal) = shutdown_channel();
        let mut running = RunningSidecar {
            controller,
            signal,
            barrier: CompletionBarrier::new(),
            tasks: Vec::new(),
            listener_addrs: Vec::new(),
            pre_stop_addr: None,
            signal_task: None,
        };

        let prober = Prober::from_config(self.config.database.as_ref(), self.metrics.clone())
            .with_interval(self.probe_interval);
        running.spawn_component("prober", move |shutdown| prober.run(shutdown));

        let metrics_path = self.config.metrics_path.as_deref();
        for addr in &self.config.listen_addrs {
            let guard = running.barrier.enter(format!("listener {}", addr));
            let app = build_router(addr, metrics_path, self.metrics.clone(), None);
            match HttpListener::bind(addr, app).await {
                Ok(listener) => {
                    running.listener_addrs.push(listener.local_addr());
                    let shutdown = running.signal.clone();
                    running.tasks.push(tokio::spawn(async move {
                        let _guard = guard;
                        listener.serve(shutdown).await;
                    }));
                }
                Err(e) => {
                    error!(error = %e, "listener failed to start");
                    drop(guard);
                }
            }
        }

        if let Some(addr) = &self.config.pre_stop_addr {
            let state = PreStopState::new(running.controller.clone(), running.barrier.clone());
            let app = build_router(addr, metrics_path, self.metrics.clone(), Some(state));
            match HttpListener::bind(addr, app).await {
                Ok(listener) => {
                    running.pre_stop_addr = Some(listener.local_addr());
                    running
                        .tasks
                        .push(tokio::spawn(listener.serve(running.signal.clone())));
                }
                Err(e) => error!(error = %e, "pre-stop listener failed to start"),
            }
        } else {
            info!("no pre-stop address, pre-stop hook disabled");
        }

        info!(
            listeners = running.listener_addrs.len(),
            pre_stop = running.pre_stop_addr.is_some(),
            "sidecar started"
        );
        running
    }
}

/// A started sidecar
pub struct RunningSidecar {
    controller: ShutdownController,
    signal: ShutdownSignal,
    barrier: CompletionBarrier,
    tasks: Vec<JoinHandle<()>>,
    listener_addrs: Vec<SocketAddr>,
    pre_stop_addr: Option<SocketAddr>,
    signal_task: Option<JoinHandle<()>>,
}

impl RunningSidecar {
    /// Bound addresses of the echo listeners that started
    pub fn listener_addrs(&self) -> &[SocketAddr] {
        &self.listener_addrs
    }

    /// Bound address of the pre-stop listener, if it started
    pub fn pre_stop_addr(&self) -> Option<SocketAddr> {
        self.pre_stop_addr
    }

    /// Handle that can trigger shutdown
    pub fn shutdown_controller(&self) -> ShutdownController {
        self.controller.clone()
    }

    /// Barrier holding the prober and echo listeners
    pub fn barrier(&self) -> CompletionBarrier {
        self.barrier.clone()
    }

    /// Run an extra component under the same signal and barrier
    ///
    /// The barrier slot is taken before the task is spawned and released
    /// when the future completes or the task unwinds.
    pub fn spawn_component<F, Fut>(&mut self, name: &str, component: F)
    where
        F: FnOnce(ShutdownSignal) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let guard = self.barrier.enter(name);
        let future = component(self.signal.clone());
        self.tasks.push(tokio::spawn(async move {
            let _guard = guard;
            future.await;
        }));
    }

    /// Turn OS termination signals into shutdown
    ///
    /// The first signal triggers shutdown; later ones are logged and
    /// otherwise ignored.
    pub fn watch_signals(&mut self, mut signals: TerminationSignals) {
        let controller = self.controller.clone();
        self.signal_task = Some(tokio::spawn(async move {
            loop {
                let name = signals.recv().await;
                if controller.shutdown() {
                    info!(signal = name, "shutting down");
                } else {
                    warn!(signal = name, "shutdown already in progress");
                }
            }
        }));
    }

    /// Wait for every component to finish
    pub async fn wait(self) {
        self.barrier.wait().await;

        for result in join_all(self.tasks).await {
            if let Err(e) = result {
                error!(error = %e, "component task failed");
            }
        }

        if let Some(task) = self.signal_task {
            task.abort();
        }
        info!("stop execution");
    }
}

#[cfg(test)]
#[path = "lifecycle_test.rs"]
mod tests;
