//! Tests for startup and shutdown sequencing

use super::*;
use crate::server::metrics::RecordingMetrics;
use crate::server::PingStatus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn config(listen_addrs: &[&str], pre_stop_addr: Option<&str>) -> SidecarConfig {
    SidecarConfig {
        listen_addrs: listen_addrs.iter().map(|addr| addr.to_string()).collect(),
        metrics_path: Some("/metrics".to_string()),
        database: None,
        pre_stop_addr: pre_stop_addr.map(str::to_string),
    }
}

async fn wait_bounded(running: RunningSidecar) {
    tokio::time::timeout(Duration::from_secs(5), running.wait())
        .await
        .expect("sidecar should drain after shutdown");
}

#[tokio::test]
async fn test_start_registers_prober_and_listeners() {
    // ARRANGE
    let metrics = RecordingMetrics::new();
    let sidecar = Sidecar::new(config(&["127.0.0.1:0", "127.0.0.1:0"], None), metrics);

    // ACT
    let running = sidecar.start().await;

    // ASSERT: prober plus two listeners
    assert_eq!(running.listener_addrs().len(), 2);
    assert_ne!(running.listener_addrs()[0], running.listener_addrs()[1]);
    assert_eq!(running.pre_stop_addr(), None);
    assert_eq!(running.barrier().active(), 3);

    running.shutdown_controller().shutdown();
    wait_bounded(running).await;
}

#[tokio::test]
async fn test_shutdown_drains_every_component() {
    // ARRANGE
    let running = Sidecar::new(config(&["127.0.0.1:0"], None), RecordingMetrics::new())
        .start()
        .await;
    let addr = running.listener_addrs()[0];
    let barrier = running.barrier();

    // ACT
    assert!(running.shutdown_controller().shutdown());
    wait_bounded(running).await;

    // ASSERT
    assert_eq!(barrier.active(), 0);
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_second_shutdown_is_absorbed() {
    let running = Sidecar::new(config(&[], None), RecordingMetrics::new())
        .start()
        .await;
    let controller = running.shutdown_controller();

    assert!(controller.shutdown());
    assert!(!controller.shutdown());

    wait_bounded(running).await;
}

#[tokio::test]
async fn test_bind_failure_skips_only_that_listener() {
    // ARRANGE: occupy a port so one bind fails
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let taken_addr = taken.local_addr().unwrap().to_string();

    // ACT
    let running = Sidecar::new(
        config(&[taken_addr.as_str(), "127.0.0.1:0"], None),
        RecordingMetrics::new(),
    )
    .start()
    .await;

    // ASSERT: prober plus the one listener that bound
    assert_eq!(running.listener_addrs().len(), 1);
    assert_eq!(running.barrier().active(), 2);

    running.shutdown_controller().shutdown();
    wait_bounded(running).await;
}

#[tokio::test]
async fn test_no_listen_addresses_runs_prober_only() {
    let running = Sidecar::new(config(&[], None), RecordingMetrics::new())
        .start()
        .await;

    assert!(running.listener_addrs().is_empty());
    assert_eq!(running.barrier().active(), 1);

    running.shutdown_controller().shutdown();
    wait_bounded(running).await;
}

#[tokio::test]
async fn test_prober_counts_skip_without_database() {
    // ARRANGE
    let metrics = RecordingMetrics::new();
    let running = Sidecar::new(config(&[], None), metrics.clone())
        .with_probe_interval(Duration::from_millis(20))
        .start()
        .await;

    // ACT
    tokio::time::sleep(Duration::from_millis(150)).await;
    running.shutdown_controller().shutdown();
    wait_bounded(running).await;

    // ASSERT
    assert!(metrics.pings(PingStatus::Skip) >= 2);
    assert_eq!(metrics.pings(PingStatus::Success), 0);
    assert_eq!(metrics.pings(PingStatus::Fail), 0);
}

#[tokio::test]
async fn test_wait_blocks_on_slow_component() {
    // ARRANGE
    let mut running = Sidecar::new(config(&[], None), RecordingMetrics::new())
        .start()
        .await;
    let finished = Arc::new(AtomicBool::new(false));
    let flag = finished.clone();
    running.spawn_component("slow", move |mut shutdown| async move {
        shutdown.wait().await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        flag.store(true, Ordering::SeqCst);
    });
    assert_eq!(running.barrier().active(), 2);

    // ACT
    running.shutdown_controller().shutdown();
    wait_bounded(running).await;

    // ASSERT
    assert!(finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_panicking_component_releases_its_slot() {
    let mut running = Sidecar::new(config(&[], None), RecordingMetrics::new())
        .start()
        .await;
    running.spawn_component("broken", |_shutdown| async {
        panic!("component failure");
    });

    running.shutdown_controller().shutdown();
    wait_bounded(running).await;
}

#[tokio::test]
async fn test_pre_stop_listener_is_outside_barrier() {
    let running = Sidecar::new(
        config(&["127.0.0.1:0"], Some("127.0.0.1:0")),
        RecordingMetrics::new(),
    )
    .start()
    .await;

    assert!(running.pre_stop_addr().is_some());
    // prober plus one echo listener
    assert_eq!(running.barrier().active(), 2);

    running.shutdown_controller().shutdown();
    wait_bounded(running).await;
}
