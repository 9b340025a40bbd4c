//! Averaging sampler
//!
//! A ticker wakes a worker every period. Each run reads the analog channel
//! until enough in-range readings are collected (or the attempt ceiling is
//! hit), converts them to distance, queues the average and posts
//! [`DATA_READY`] on the sampler's bus.

use crate::config::AveragingConfig;
use crate::error::AcquisitionError;
use crate::wake::WakeSignal;
use event_bus::{BusHandle, EventBase, EventId};
use sensor::VoltageSource;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

pub const DISTANCE_EVENT_BASE: EventBase = EventBase("DISTANCE");

/// Posted after each averaging run
pub const DATA_READY: EventId = 0;

/// Outcome of one averaging run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AverageReport {
    /// Sum of converted readings divided by the target count
    pub average: f32,
    /// In-range readings obtained
    pub valid: usize,
    /// Reads performed, failed reads included
    pub attempts: usize,
}

/// Reads a voltage channel and averages converted distances
pub struct AveragingSampler<V> {
    source: V,
    config: AveragingConfig,
}

impl<V: VoltageSource> AveragingSampler<V> {
    pub fn new(source: V, config: AveragingConfig) -> Self {
        Self { source, config }
    }

    /// Collect up to `target_samples` valid readings within the attempt ceiling.
    ///
    /// The average always divides by the target count, so a short run
    /// reports a value biased toward zero.
    pub fn sample_once(&mut self) -> AverageReport {
        let target = self.config.target_samples;
        let max_attempts = self.config.max_attempts();
        let mut sum = 0.0f32;
        let mut valid = 0usize;
        let mut attempts = 0usize;

        while valid < target && attempts < max_attempts {
            attempts += 1;
            let voltage = match self.source.read_voltage() {
                Ok(voltage) => voltage,
                Err(e) => {
                    trace!("Voltage read failed: {}", e);
                    continue;
                }
            };
            match self.config.valid_range.check(voltage) {
                Ok(voltage) => {
                    sum += self.config.curve.distance_cm(voltage);
                    valid += 1;
                }
                Err(e) => trace!("Discarding reading: {}", e),
            }
        }

        if valid < target {
            warn!(
                "Only {} of {} valid readings after {} attempts",
                valid, target, attempts
            );
        }

        let average = if target == 0 { 0.0 } else { sum / target as f32 };
        debug!("Distance average {:.2} cm ({} valid)", average, valid);

        AverageReport {
            average,
            valid,
            attempts,
        }
    }
}

impl<V: VoltageSource + 'static> AveragingSampler<V> {
    /// Spawn the ticker and the worker.
    ///
    /// Averages are pushed onto a queue of `queue_depth` entries; consumers
    /// drain it through the returned [`DistanceReadings`] when they see
    /// [`DATA_READY`] on `bus`.
    pub fn start(self, bus: BusHandle) -> (AveragingHandle, DistanceReadings) {
        let (queue, receiver) = mpsc::channel(self.config.queue_depth.max(1));
        let wake = Arc::new(WakeSignal::new());
        let period = self.config.period();

        info!(
            "Averaging sampler started: {} samples every {} ms",
            self.config.target_samples, self.config.period_ms
        );

        let ticker = tokio::spawn(tick(wake.clone(), period));
        let worker = tokio::spawn(self.work(wake.clone(), queue, bus));

        let handle = AveragingHandle {
            wake,
            ticker,
            worker,
        };
        let readings = DistanceReadings {
            receiver: Arc::new(Mutex::new(receiver)),
        };
        (handle, readings)
    }

    async fn work(mut self, wake: Arc<WakeSignal>, queue: mpsc::Sender<f32>, bus: BusHandle) {
        while wake.wait().await {
            let report = self.sample_once();

            match queue.try_send(report.average) {
                Ok(()) => {}
                Err(TrySendError::Full(average)) => {
                    debug!("Distance queue full, dropping {:.2}", average)
                }
                Err(TrySendError::Closed(_)) => debug!("Distance queue closed"),
            }

            if let Err(e) = bus
                .post(DISTANCE_EVENT_BASE, DATA_READY, &[], self.config.post_timeout())
                .await
            {
                warn!("Failed to post distance data-ready: {}", e);
            }

            wake.finish();
        }
        debug!("Averaging worker stopped");
    }
}

async fn tick(wake: Arc<WakeSignal>, period: Duration) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    loop {
        interval.tick().await;
        if !wake.wake() {
            trace!("Averaging run pending or in progress, wake ignored");
        }
    }
}

/// Consumer side of the averaged-distance queue
#[derive(Clone)]
pub struct DistanceReadings {
    receiver: Arc<Mutex<mpsc::Receiver<f32>>>,
}

impl DistanceReadings {
    /// Take the oldest queued average without waiting
    pub fn pop(&self) -> Option<f32> {
        self.receiver.lock().ok()?.try_recv().ok()
    }
}

/// Handle to a running averaging sampler
pub struct AveragingHandle {
    wake: Arc<WakeSignal>,
    ticker: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl AveragingHandle {
    /// Request a run now. Returns `false` if it coalesced or was ignored.
    pub fn wake(&self) -> bool {
        self.wake.wake()
    }

    /// Stop the ticker, then let the worker finish its current run and exit
    pub async fn stop(self) -> Result<(), AcquisitionError> {
        self.ticker.abort();
        match self.ticker.await {
            Err(e) if !e.is_cancelled() => return Err(e.into()),
            _ => {}
        }
        self.wake.close();
        self.worker.await?;
        info!("Averaging sampler stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_bus::{EventBus, IdFilter};
    use sensor::{DistanceCurve, SensorError};

    /// Replays `values` in a loop; `None` is a failed read
    struct Script {
        values: Vec<Option<f32>>,
        pos: usize,
    }

    impl Script {
        fn new(values: Vec<Option<f32>>) -> Self {
            Self { values, pos: 0 }
        }
    }

    impl VoltageSource for Script {
        fn read_voltage(&mut self) -> Result<f32, SensorError> {
            let value = self.values[self.pos % self.values.len()];
            self.pos += 1;
            value.ok_or(SensorError::ReadFailed {
                sensor: "script",
                details: "conversion timeout".into(),
            })
        }
    }

    fn config(target_samples: usize) -> AveragingConfig {
        AveragingConfig {
            target_samples,
            curve: DistanceCurve {
                a: 10.0,
                b: 0.0,
                c: 0.0,
            },
            ..AveragingConfig::default()
        }
    }

    #[test]
    fn test_averages_converted_readings() {
        let mut sampler = AveragingSampler::new(Script::new(vec![Some(2.0)]), config(4));
        let report = sampler.sample_once();
        assert_eq!(
            report,
            AverageReport {
                average: 5.0,
                valid: 4,
                attempts: 4
            }
        );
    }

    #[test]
    fn test_out_of_range_readings_discarded() {
        // Bounds are exclusive
        let script = Script::new(vec![Some(3.2), Some(0.005), Some(2.5)]);
        let mut sampler = AveragingSampler::new(script, config(2));
        let report = sampler.sample_once();
        assert_eq!(report.valid, 2);
        assert_eq!(report.attempts, 6);
        assert!((report.average - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_failed_reads_count_as_attempts() {
        let script = Script::new(vec![None, Some(2.0)]);
        let mut sampler = AveragingSampler::new(script, config(3));
        let report = sampler.sample_once();
        assert_eq!(report.valid, 3);
        assert_eq!(report.attempts, 6);
    }

    #[test]
    fn test_attempt_ceiling_biases_average_low() {
        let mut values = vec![Some(2.0), Some(2.0)];
        values.extend(std::iter::repeat(Some(5.0)).take(38));
        let mut sampler = AveragingSampler::new(Script::new(values), config(4));

        let report = sampler.sample_once();
        assert_eq!(report.attempts, 40);
        assert_eq!(report.valid, 2);
        // Two readings of 5 cm divided by the target of 4
        assert!((report.average - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_zero_target_reads_nothing() {
        let mut sampler = AveragingSampler::new(Script::new(vec![Some(2.0)]), config(0));
        let report = sampler.sample_once();
        assert_eq!(report.attempts, 0);
        assert_eq!(report.average, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_run_posts_data_ready() {
        let bus = EventBus::new("distance", 5);
        let sampler = AveragingSampler::new(Script::new(vec![Some(2.0)]), config(2));
        let (handle, readings) = sampler.start(bus.handle());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let consumer = readings.clone();
        bus.register(DISTANCE_EVENT_BASE, IdFilter::Id(DATA_READY), move |_| {
            if let Some(average) = consumer.pop() {
                let _ = tx.send((Instant::now(), average));
            }
        })
        .await;

        let start = Instant::now();
        let (at, average) = rx.recv().await.unwrap();
        assert_eq!(average, 5.0);
        assert_eq!(at - start, Duration::from_millis(1_000));

        handle.stop().await.unwrap();
        bus.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_queue_drops_silently() {
        let bus = EventBus::new("distance", 5);
        let config = AveragingConfig {
            queue_depth: 1,
            period_ms: 60_000,
            ..config(1)
        };
        let sampler = AveragingSampler::new(Script::new(vec![Some(2.0)]), config);
        let (handle, readings) = sampler.start(bus.handle());

        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.register(DISTANCE_EVENT_BASE, IdFilter::Any, move |event| {
            let _ = tx.send(event.id);
        })
        .await;

        for _ in 0..2 {
            while !handle.wake() {
                tokio::task::yield_now().await;
            }
            assert_eq!(rx.recv().await, Some(DATA_READY));
        }

        assert_eq!(readings.pop(), Some(5.0));
        assert_eq!(readings.pop(), None);

        handle.stop().await.unwrap();
        bus.shutdown().await;
    }
}
