use super::{DatabaseProbe, PostgresProbe};
use crate::config::DatabaseConfig;
use crate::server::{PingStatus, SharedMetrics, ShutdownSignal};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Time between two probe ticks
pub const PROBE_INTERVAL: Duration = Duration::from_secs(10);

/// Upper bound for connect plus ping
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Background task that probes the database on a fixed schedule
pub struct Prober {
    probe: Option<Arc<dyn DatabaseProbe>>,
    metrics: SharedMetrics,
    interval: Duration,
}

impl Prober {
    /// `probe == None` means no database is configured
    pub fn new(probe: Option<Arc<dyn DatabaseProbe>>, metrics: SharedMetrics) -> Self {
        Self {
            probe,
            metrics,
            interval: PROBE_INTERVAL,
        }
    }

    /// Prober for the resolved database settings, Postgres when enabled
    pub fn from_config(database: Option<&DatabaseConfig>, metrics: SharedMetrics) -> Self {
        let probe = database.map(|config| {
            Arc::new(PostgresProbe::new(config.clone(), PROBE_TIMEOUT)) as Arc<dyn DatabaseProbe>
        });
        Self::new(probe, metrics)
    }

    /// Override the tick interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.probe.is_some()
    }

    /// Run one tick: probe and count, or count a skip when disabled
    pub async fn tick(&self) {
        let Some(probe) = &self.probe else {
            self.metrics.record_db_ping(PingStatus::Skip);
            return;
        };

        let outcome = probe.probe().await;
        debug!(outcome = ?outcome, "database probe finished");
        self.metrics.record_db_ping(outcome.ping_status());
    }

    /// Tick until shutdown is signaled
    ///
    /// The first tick fires one interval after start. When shutdown and a
    /// tick are ready together, shutdown wins and the tick is dropped. A
    /// probe already in flight is allowed to finish.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            enabled = self.is_enabled(),
            interval_secs = self.interval.as_secs_f64(),
            "database prober started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                _ = ticker.tick() => self.tick().await,
            }
        }

        info!("db connection and ping loop ended");
    }
}
