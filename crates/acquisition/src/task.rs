//! Periodic acquisition task
//!
//! Each tick drains the backlog when the link is up, then takes one
//! measurement and either delivers it or appends it to the backlog.

use crate::config::AcquisitionConfig;
use crate::error::AcquisitionError;
use crate::flag::LinkFlag;
use ring_store::{RingStore, StoreError};
use sensor::{DualChannelSensor, Sample, SensorError, SAMPLE_SIZE};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// What happened to the fresh measurement of a tick
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Link was up; the sample went straight out
    Delivered(Sample),
    /// Link was down; the sample was appended to the backlog
    Buffered(Sample),
    /// Link was down and the backlog had no room
    Dropped { sample: Sample, error: StoreError },
    /// The sensor read failed; nothing was taken this tick
    SensorFault(SensorError),
}

/// Result of a single tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Backlog records replayed before the fresh measurement, oldest first
    pub drained: Vec<Sample>,
    pub outcome: TickOutcome,
}

/// Periodic sampler that owns the offline backlog
pub struct AcquisitionTask<S> {
    sensor: S,
    store: RingStore,
    link: LinkFlag,
    config: AcquisitionConfig,
    sink: Option<mpsc::Sender<Sample>>,
    ticks: u64,
}

impl<S: DualChannelSensor> AcquisitionTask<S> {
    pub fn new(sensor: S, store: RingStore, link: LinkFlag, config: AcquisitionConfig) -> Self {
        info!(
            "Acquisition task for {} created: period {} ms, backlog {} bytes",
            sensor.name(),
            config.period_ms,
            store.capacity()
        );
        Self {
            sensor,
            store,
            link,
            config,
            sink: None,
            ticks: 0,
        }
    }

    /// Forward delivered samples (drained and fresh) to `sink`
    pub fn with_sink(mut self, sink: mpsc::Sender<Sample>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn store(&self) -> &RingStore {
        &self.store
    }

    /// Run one acquisition step.
    ///
    /// The link flag is read once, so drain and delivery agree within a tick.
    pub fn tick(&mut self) -> TickReport {
        self.ticks += 1;
        let link_up = self.link.is_up();

        let drained = if link_up { self.drain() } else { Vec::new() };

        let sample = match self.sensor.read() {
            Ok(sample) => sample,
            Err(e) => {
                warn!("{} read failed, skipping tick: {}", self.sensor.name(), e);
                metrics::counter!("acquisition_sensor_faults_total").increment(1);
                return TickReport {
                    drained,
                    outcome: TickOutcome::SensorFault(e),
                };
            }
        };

        let outcome = if link_up {
            self.deliver(sample);
            TickOutcome::Delivered(sample)
        } else {
            match self.store.write(&sample.to_bytes()) {
                Ok(()) => {
                    debug!(
                        "Link down, buffered sample ({} bytes held)",
                        self.store.available()
                    );
                    metrics::counter!("acquisition_samples_buffered_total").increment(1);
                    TickOutcome::Buffered(sample)
                }
                Err(e) => {
                    warn!("Backlog full, dropping sample: {}", e);
                    metrics::counter!("acquisition_samples_dropped_total").increment(1);
                    TickOutcome::Dropped { sample, error: e }
                }
            }
        };

        TickReport { drained, outcome }
    }

    /// Replay every whole record in the backlog, oldest first
    fn drain(&mut self) -> Vec<Sample> {
        let mut drained = Vec::new();

        while self.store.available() >= SAMPLE_SIZE {
            let primary = self.store.read_f32();
            let secondary = self.store.read_f32();
            match (primary, secondary) {
                (Ok(primary), Ok(secondary)) => {
                    let sample = Sample::new(primary, secondary);
                    self.deliver(sample);
                    drained.push(sample);
                }
                (Err(e), _) | (_, Err(e)) => {
                    error!("Backlog unreadable, abandoning drain: {}", e);
                    break;
                }
            }
        }

        let leftover = self.store.available();
        if leftover > 0 {
            warn!("Discarding {} bytes of partial record", leftover);
            self.store.clear();
        }

        if !drained.is_empty() {
            info!("Drained {} buffered samples", drained.len());
            metrics::counter!("acquisition_samples_drained_total").increment(drained.len() as u64);
        }
        drained
    }

    fn deliver(&self, sample: Sample) {
        info!(
            "{}: {:.2} / {:.2}",
            self.sensor.name(),
            sample.primary,
            sample.secondary
        );
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.try_send(sample) {
                debug!("Uplink not keeping up, sample not forwarded: {}", e);
            }
        }
    }
}

impl<S: DualChannelSensor + 'static> AcquisitionTask<S> {
    /// Tick every period until `shutdown` fires, then hand the backlog back
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) -> RingStore {
        info!("Starting acquisition loop");
        let mut interval = tokio::time::interval(self.config.period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = interval.tick() => {
                    self.tick();
                }
            }
        }

        info!(
            "Acquisition loop stopped after {} ticks ({} bytes still buffered)",
            self.ticks,
            self.store.available()
        );
        self.store
    }

    /// Move the task onto the runtime
    pub fn spawn(self) -> AcquisitionHandle {
        let (stop, shutdown) = oneshot::channel();
        let task = tokio::spawn(self.run(shutdown));
        AcquisitionHandle { stop, task }
    }
}

/// Handle to a spawned acquisition loop
pub struct AcquisitionHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<RingStore>,
}

impl AcquisitionHandle {
    /// Stop the loop and take the backlog back
    pub async fn stop(self) -> Result<RingStore, AcquisitionError> {
        let _ = self.stop.send(());
        Ok(self.task.await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flag::link_flag;
    use std::time::Duration;

    /// Sensor returning (n, n + 100) on its n-th read
    struct Counting {
        reads: u32,
        fail_on: Option<u32>,
    }

    impl Counting {
        fn new() -> Self {
            Self {
                reads: 0,
                fail_on: None,
            }
        }
    }

    impl DualChannelSensor for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn read(&mut self) -> Result<Sample, SensorError> {
            self.reads += 1;
            if self.fail_on == Some(self.reads) {
                return Err(SensorError::ReadFailed {
                    sensor: "counting",
                    details: "bus NACK".into(),
                });
            }
            let n = self.reads as f32;
            Ok(Sample::new(n, n + 100.0))
        }
    }

    fn task(capacity: usize) -> (AcquisitionTask<Counting>, crate::flag::LinkFlagWriter) {
        let (writer, reader) = link_flag();
        let store = RingStore::new(capacity).unwrap();
        let task = AcquisitionTask::new(Counting::new(), store, reader, AcquisitionConfig::default());
        (task, writer)
    }

    #[test]
    fn test_buffers_while_link_down() {
        let (mut task, _writer) = task(1024);
        for n in 1..=5 {
            let report = task.tick();
            assert!(report.drained.is_empty());
            let expected = Sample::new(n as f32, n as f32 + 100.0);
            assert_eq!(report.outcome, TickOutcome::Buffered(expected));
        }
        assert_eq!(task.store().available(), 5 * SAMPLE_SIZE);
    }

    #[test]
    fn test_link_up_drains_backlog_in_order() {
        let (mut task, writer) = task(1024);
        for _ in 0..3 {
            task.tick();
        }

        writer.set_up(true);
        let report = task.tick();

        assert_eq!(
            report.drained,
            vec![
                Sample::new(1.0, 101.0),
                Sample::new(2.0, 102.0),
                Sample::new(3.0, 103.0),
            ]
        );
        assert_eq!(report.outcome, TickOutcome::Delivered(Sample::new(4.0, 104.0)));
        assert_eq!(task.store().available(), 0);
    }

    #[test]
    fn test_full_backlog_drops_new_samples() {
        let (mut task, _writer) = task(2 * SAMPLE_SIZE);
        task.tick();
        task.tick();

        let report = task.tick();
        match report.outcome {
            TickOutcome::Dropped { sample, error } => {
                assert_eq!(sample, Sample::new(3.0, 103.0));
                assert!(matches!(error, StoreError::InvalidSize { .. }));
            }
            other => panic!("expected drop, got {:?}", other),
        }
        // Oldest records are kept
        assert_eq!(task.store().available(), 2 * SAMPLE_SIZE);
    }

    #[test]
    fn test_sensor_fault_skips_sample_but_still_drains() {
        let (writer, reader) = link_flag();
        let store = RingStore::new(64).unwrap();
        let sensor = Counting {
            reads: 0,
            fail_on: Some(2),
        };
        let mut task = AcquisitionTask::new(sensor, store, reader, AcquisitionConfig::default());

        task.tick();
        writer.set_up(true);
        let report = task.tick();

        assert_eq!(report.drained, vec![Sample::new(1.0, 101.0)]);
        assert!(matches!(report.outcome, TickOutcome::SensorFault(_)));
        assert_eq!(task.store().available(), 0);
    }

    #[test]
    fn test_sink_receives_drained_then_fresh() {
        let (mut task, writer) = task(1024);
        let (tx, mut rx) = mpsc::channel(8);
        task = task.with_sink(tx);

        task.tick();
        writer.set_up(true);
        task.tick();

        assert_eq!(rx.try_recv().unwrap(), Sample::new(1.0, 101.0));
        assert_eq!(rx.try_recv().unwrap(), Sample::new(2.0, 102.0));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_loop_returns_store_on_stop() {
        let (task, _writer) = task(1024);
        let handle = task.spawn();

        // Ticks at 0, 1000, 2000 ms
        tokio::time::sleep(Duration::from_millis(2_500)).await;

        let store = handle.stop().await.unwrap();
        assert_eq!(store.available(), 3 * SAMPLE_SIZE);
    }
}
