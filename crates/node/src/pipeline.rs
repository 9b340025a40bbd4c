//! Pipeline context
//!
//! Owns every long-lived piece of the node and tears them down in order:
//! link, distance sampler, acquisition (backlog handed back), backlog, buses.

use crate::error::NodeError;
use crate::settings::NodeConfig;
use acquisition::{
    link_flag, AcquisitionHandle, AcquisitionTask, AveragingHandle, AveragingSampler, DATA_READY,
    DISTANCE_EVENT_BASE,
};
use event_bus::{EventBus, IdFilter};
use link_sim::{LinkEvent, LinkHandle, LinkState, LinkStateMachine, LINK_EVENT_BASE};
use ring_store::RingStore;
use sensor::{DualChannelSensor, Sample, Shtc3Simulator, SimulatedAdc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct Counters {
    uplinked: AtomicU64,
    rejected: AtomicU64,
    distance_readings: AtomicU64,
}

/// Summary produced by [`Pipeline::shutdown`]
#[derive(Debug, Clone, Serialize)]
pub struct ShutdownReport {
    pub link_state: LinkState,
    /// Samples accepted by the link
    pub uplinked: u64,
    /// Samples the link refused (not connected with an address)
    pub uplink_rejected: u64,
    /// Backlog bytes discarded at shutdown
    pub backlog_bytes: usize,
    pub distance_readings: u64,
}

struct DistanceStage {
    sampler: AveragingHandle,
    bus: EventBus,
}

/// Running telemetry pipeline
pub struct Pipeline {
    link: LinkStateMachine,
    link_bus: EventBus,
    acquisition: AcquisitionHandle,
    uplink: JoinHandle<()>,
    distance: Option<DistanceStage>,
    counters: Arc<Counters>,
}

impl Pipeline {
    /// Start with the simulated SHTC3 described by `config.sensor`
    pub async fn start(config: &NodeConfig) -> Result<Self, NodeError> {
        let mut sensor = Shtc3Simulator::new(config.sensor.seed).with_mode(config.sensor.mode);
        if config.sensor.fault_every > 0 {
            sensor = sensor.with_fault_every(config.sensor.fault_every);
        }
        Self::start_with(config, sensor).await
    }

    /// Start with any two-channel sensor
    pub async fn start_with<S>(config: &NodeConfig, sensor: S) -> Result<Self, NodeError>
    where
        S: DualChannelSensor + 'static,
    {
        info!("Starting telemetry pipeline");
        let counters = Arc::new(Counters::default());

        let store = RingStore::new(config.store.capacity)?;

        let link_bus = EventBus::new("link", config.bus.queue_depth);
        let link = LinkStateMachine::new(config.link.clone(), link_bus.handle());
        let (flag_writer, flag) = link_flag();

        let reconnect = link.handle();
        let auto_reconnect = config.uplink.auto_reconnect;
        link_bus
            .register(LINK_EVENT_BASE, IdFilter::Any, move |event| {
                match LinkEvent::from_id(event.id) {
                    Some(LinkEvent::Connected) => debug!("Link associated, waiting for address"),
                    Some(LinkEvent::GotIp) => {
                        info!("Link up, draining backlog on next tick");
                        flag_writer.set_up(true);
                    }
                    Some(LinkEvent::Disconnected) => {
                        flag_writer.set_up(false);
                        if auto_reconnect {
                            info!("Link lost, reconnecting");
                            if let Err(e) = reconnect.request_connect() {
                                warn!("Reconnect request failed: {}", e);
                            }
                        } else {
                            info!("Link lost, buffering samples");
                        }
                    }
                    None => warn!("Unknown link event id {}", event.id),
                }
            })
            .await;

        let (sink, samples) = mpsc::channel(config.uplink.queue_depth.max(1));
        let uplink = tokio::spawn(uplink(link.handle(), samples, counters.clone()));

        let acquisition = AcquisitionTask::new(sensor, store, flag, config.acquisition.clone())
            .with_sink(sink)
            .spawn();

        let distance = if config.distance.enabled {
            Some(start_distance(config, counters.clone()).await)
        } else {
            None
        };

        link.init().await?;
        link.connect().await?;

        Ok(Self {
            link,
            link_bus,
            acquisition,
            uplink,
            distance,
            counters,
        })
    }

    pub fn link(&self) -> LinkHandle {
        self.link.handle()
    }

    pub fn link_state(&self) -> LinkState {
        self.link.state()
    }

    /// Samples accepted by the link so far
    pub fn uplinked(&self) -> u64 {
        self.counters.uplinked.load(Ordering::Relaxed)
    }

    /// Distance averages consumed so far
    pub fn distance_readings(&self) -> u64 {
        self.counters.distance_readings.load(Ordering::Relaxed)
    }

    /// Stop everything and discard the backlog
    pub async fn shutdown(self) -> Result<ShutdownReport, NodeError> {
        info!("Shutting down telemetry pipeline");
        let link_state = self.link.state();
        self.link.shutdown().await;

        let distance_bus = match self.distance {
            Some(stage) => {
                stage.sampler.stop().await?;
                Some(stage.bus)
            }
            None => None,
        };

        let mut store = self.acquisition.stop().await?;
        // The acquisition task held the only sample sender
        self.uplink.await?;

        let backlog_bytes = store.available();
        if backlog_bytes > 0 {
            warn!("Discarding {} bytes of unsent backlog", backlog_bytes);
        }
        store.destroy();

        self.link_bus.shutdown().await;
        if let Some(bus) = distance_bus {
            bus.shutdown().await;
        }

        let report = ShutdownReport {
            link_state,
            uplinked: self.counters.uplinked.load(Ordering::Relaxed),
            uplink_rejected: self.counters.rejected.load(Ordering::Relaxed),
            backlog_bytes,
            distance_readings: self.counters.distance_readings.load(Ordering::Relaxed),
        };
        info!(
            "Pipeline stopped: {} samples uplinked, {} backlog bytes discarded",
            report.uplinked, report.backlog_bytes
        );
        Ok(report)
    }
}

async fn uplink(link: LinkHandle, mut samples: mpsc::Receiver<Sample>, counters: Arc<Counters>) {
    while let Some(sample) = samples.recv().await {
        match link.send(&sample.to_bytes()) {
            Ok(()) => counters.uplinked.fetch_add(1, Ordering::Relaxed),
            Err(_) => counters.rejected.fetch_add(1, Ordering::Relaxed),
        };
    }
    debug!("Uplink task finished");
}

async fn start_distance(config: &NodeConfig, counters: Arc<Counters>) -> DistanceStage {
    let bus = EventBus::new("distance", config.bus.queue_depth);
    let sampler = AveragingSampler::new(
        SimulatedAdc::new(config.distance.seed),
        config.distance.averaging.clone(),
    );
    let (handle, readings) = sampler.start(bus.handle());

    bus.register(DISTANCE_EVENT_BASE, IdFilter::Id(DATA_READY), move |_| {
        while let Some(distance) = readings.pop() {
            counters.distance_readings.fetch_add(1, Ordering::Relaxed);
            info!("Distance: {:.2} cm", distance);
        }
    })
    .await;

    DistanceStage {
        sampler: handle,
        bus,
    }
}
