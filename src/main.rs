use echo_sidecar::logging::init_logging;
use echo_sidecar::server::{create_metrics, TerminationSignals};
use echo_sidecar::{Sidecar, SidecarConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_format = init_logging()?;
    info!(format = ?log_format, "Starting echo sidecar");

    let config = SidecarConfig::from_env();

    let metrics = create_metrics()?;
    info!("Prometheus metrics registry initialized");

    // Registered before anything binds so an early SIGTERM is not lost
    let signals = TerminationSignals::install()?;

    let mut running = Sidecar::new(config, metrics).start().await;
    running.watch_signals(signals);
    running.wait().await;

    Ok(())
}
