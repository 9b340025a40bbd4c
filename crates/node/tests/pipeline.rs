//! End-to-end pipeline behaviour on a paused clock

use link_sim::LinkState;
use node::{NodeConfig, Pipeline};
use std::time::Duration;
use tokio::time::Instant;

fn fast_config() -> NodeConfig {
    let mut config = NodeConfig::default();
    config.acquisition.period_ms = 10;
    config.link.connect_delay_ms = 50;
    config.link.ip_delay_ms = 30;
    config.link.disconnect_delay_ms = 200;
    config
}

#[tokio::test(start_paused = true)]
async fn test_backlog_drains_once_link_has_address() {
    let pipeline = Pipeline::start(&fast_config()).await.unwrap();
    let mut state = pipeline.link().subscribe();

    state
        .wait_for(|s| *s == LinkState::ConnectedWithIp)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Ticks at 0..=70 ms ran before the address was acquired
    assert!(pipeline.uplinked() >= 8);

    let report = pipeline.shutdown().await.unwrap();
    assert_eq!(report.link_state, LinkState::ConnectedWithIp);
    assert_eq!(report.backlog_bytes, 0);
    assert_eq!(report.uplink_rejected, 0);
}

#[tokio::test(start_paused = true)]
async fn test_auto_reconnect_restarts_cycle() {
    let pipeline = Pipeline::start(&fast_config()).await.unwrap();
    let mut state = pipeline.link().subscribe();

    state
        .wait_for(|s| *s == LinkState::ConnectedWithIp)
        .await
        .unwrap();
    state
        .wait_for(|s| *s == LinkState::Disconnected)
        .await
        .unwrap();
    let dropped_at = Instant::now();

    state
        .wait_for(|s| *s == LinkState::ConnectedWithIp)
        .await
        .unwrap();
    assert_eq!(dropped_at.elapsed(), Duration::from_millis(80));

    pipeline.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_samples_buffer_after_drop_without_reconnect() {
    let mut config = fast_config();
    config.uplink.auto_reconnect = false;
    let pipeline = Pipeline::start(&config).await.unwrap();
    let mut state = pipeline.link().subscribe();

    state
        .wait_for(|s| *s == LinkState::ConnectedWithIp)
        .await
        .unwrap();
    state
        .wait_for(|s| *s == LinkState::Disconnected)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(pipeline.link_state(), LinkState::Disconnected);

    let report = pipeline.shutdown().await.unwrap();
    assert_eq!(report.link_state, LinkState::Disconnected);
    assert!(report.backlog_bytes >= 8 * 9);
    assert_eq!(report.backlog_bytes % 8, 0);
}

#[tokio::test(start_paused = true)]
async fn test_sensor_faults_do_not_stop_acquisition() {
    let mut config = fast_config();
    config.sensor.fault_every = 2;
    let pipeline = Pipeline::start(&config).await.unwrap();
    let mut state = pipeline.link().subscribe();

    state
        .wait_for(|s| *s == LinkState::ConnectedWithIp)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Every second frame fails its CRC; the rest are still delivered
    let report = pipeline.shutdown().await.unwrap();
    assert!(report.uplinked >= 5);
    assert_eq!(report.backlog_bytes, 0);
}

#[tokio::test(start_paused = true)]
async fn test_distance_sampler_reports_averages() {
    let mut config = fast_config();
    config.distance.enabled = true;
    config.distance.averaging.period_ms = 100;
    config.distance.averaging.target_samples = 5;
    let pipeline = Pipeline::start(&config).await.unwrap();

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(pipeline.distance_readings() >= 3);

    let report = pipeline.shutdown().await.unwrap();
    assert!(report.distance_readings >= 3);
}
