//! Background distance sampling.
//!
//! A `DistanceSampler` owns the ranging sensor and, while started, runs one
//! thread that reads it at a fixed cadence, publishes the latest reading
//! lock-free and fires the proximity callback for readings below the warn
//! threshold. Failed reads are logged and retried after a longer backoff.
//!
//! `stop()` (or dropping the sampler) signals the thread over a channel, which
//! also interrupts the pacing wait, and joins it. The thread hands the sensor
//! back when it exits, so a stopped sampler can be started again.
use crate::command::UNKNOWN_DISTANCE_CM;
use crate::config::SamplerCfg;
use crate::error::{Result, RoverError};
use crate::hw_error::map_hw_error;
use crossbeam_channel as xch;
use eyre::WrapErr;
use rover_traits::RangeSensor;
use rover_traits::clock::Clock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Called on the sampling thread with each reading (cm) below the warn threshold.
pub type ProximityCallback = Arc<dyn Fn(f64) + Send + Sync>;

const NEVER: u64 = u64::MAX;

/// Shared handle to the most recent good reading, in centimeters.
#[derive(Debug, Clone)]
pub struct LatestDistance(Arc<AtomicU64>);

impl Default for LatestDistance {
    fn default() -> Self {
        Self(Arc::new(AtomicU64::new(UNKNOWN_DISTANCE_CM.to_bits())))
    }
}

impl LatestDistance {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set(&self, cm: f64) {
        self.0.store(cm.to_bits(), Ordering::Release);
    }
}

struct Worker<S> {
    stop_tx: xch::Sender<()>,
    handle: JoinHandle<S>,
}

struct WorkerCtx<C> {
    clock: C,
    epoch: Instant,
    period: Duration,
    backoff: Duration,
    read_timeout: Duration,
    warn_threshold_cm: f64,
    latest: LatestDistance,
    last_ok: Arc<AtomicU64>,
    callback: Arc<Mutex<Option<ProximityCallback>>>,
}

pub struct DistanceSampler<S, C> {
    sensor: Option<S>,
    clock: C,
    cfg: SamplerCfg,
    warn_threshold_cm: f64,
    latest: LatestDistance,
    /// ms since `epoch` of the last good sample, `NEVER` before the first
    last_ok: Arc<AtomicU64>,
    epoch: Instant,
    callback: Arc<Mutex<Option<ProximityCallback>>>,
    worker: Option<Worker<S>>,
}

impl<S, C> DistanceSampler<S, C>
where
    S: RangeSensor + Send + 'static,
    C: Clock + Clone + Send + 'static,
{
    pub fn new(sensor: S, cfg: SamplerCfg, warn_threshold_cm: f64, clock: C) -> Self {
        let epoch = clock.now();
        Self {
            sensor: Some(sensor),
            clock,
            cfg,
            warn_threshold_cm,
            latest: LatestDistance::new(),
            last_ok: Arc::new(AtomicU64::new(NEVER)),
            epoch,
            callback: Arc::new(Mutex::new(None)),
            worker: None,
        }
    }

    /// Spawn the sampling thread. Fails if it is already running.
    pub fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Err(RoverError::State("distance sampler already running".into()).into());
        }
        let Some(sensor) = self.sensor.take() else {
            return Err(
                RoverError::State("distance sensor lost by a panicked sampler".into()).into(),
            );
        };

        let (stop_tx, stop_rx) = xch::bounded(1);
        let ctx = WorkerCtx {
            clock: self.clock.clone(),
            epoch: self.epoch,
            period: Duration::from_millis(self.cfg.period_ms),
            backoff: Duration::from_millis(self.cfg.error_backoff_ms),
            read_timeout: Duration::from_millis(self.cfg.read_timeout_ms),
            warn_threshold_cm: self.warn_threshold_cm,
            latest: self.latest.clone(),
            last_ok: self.last_ok.clone(),
            callback: self.callback.clone(),
        };
        let handle = std::thread::Builder::new()
            .name("distance-sampler".into())
            .spawn(move || run(sensor, &ctx, &stop_rx))
            .wrap_err("spawn distance sampler thread")?;

        tracing::info!(
            period_ms = self.cfg.period_ms,
            warn_cm = self.warn_threshold_cm,
            "distance sampler started"
        );
        self.worker = Some(Worker { stop_tx, handle });
        Ok(())
    }

    /// Milliseconds since the last good sample, `None` before the first one.
    pub fn stalled_for_ms(&self) -> Option<u64> {
        match self.last_ok.load(Ordering::Relaxed) {
            NEVER => None,
            last => Some(self.clock.ms_since(self.epoch).saturating_sub(last)),
        }
    }
}

impl<S, C> DistanceSampler<S, C> {
    /// Signal the sampling thread and wait for it to exit. No-op when stopped.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        // Full or disconnected both mean the thread will see the signal.
        let _ = worker.stop_tx.try_send(());
        match worker.handle.join() {
            Ok(sensor) => {
                self.sensor = Some(sensor);
                tracing::info!("distance sampler stopped");
            }
            Err(e) => {
                tracing::warn!(?e, "distance sampler thread panicked");
            }
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Latest good reading in cm, `+inf` until the first one.
    #[inline]
    pub fn latest(&self) -> f64 {
        self.latest.get()
    }

    /// Handle that tracks `latest()` from other threads.
    pub fn reading(&self) -> LatestDistance {
        self.latest.clone()
    }

    /// Register the proximity callback, replacing any previous one.
    pub fn on_proximity<F>(&self, f: F)
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        let callback: ProximityCallback = Arc::new(f);
        *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }
}

impl<S, C> Drop for DistanceSampler<S, C> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sensor meters to centimeters; anything that is not a finite, non-negative
/// distance counts as a failed read.
#[inline]
fn to_centimeters(meters: f64) -> Option<f64> {
    let cm = meters * 100.0;
    (cm.is_finite() && cm >= 0.0).then_some(cm)
}

fn run<S: RangeSensor, C: Clock>(
    mut sensor: S,
    ctx: &WorkerCtx<C>,
    stop_rx: &xch::Receiver<()>,
) -> S {
    loop {
        let tick = ctx.clock.now();
        let wait = match sensor.read(ctx.read_timeout) {
            Ok(meters) => match to_centimeters(meters) {
                Some(cm) => {
                    ctx.latest.set(cm);
                    ctx.last_ok
                        .store(ctx.clock.ms_since(ctx.epoch), Ordering::Relaxed);
                    if cm < ctx.warn_threshold_cm {
                        tracing::debug!(distance_cm = cm, "proximity");
                        let callback = ctx
                            .callback
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .clone();
                        if let Some(callback) = callback {
                            callback(cm);
                        }
                    }
                    ctx.period
                        .saturating_sub(ctx.clock.now().saturating_duration_since(tick))
                }
                None => {
                    tracing::warn!(meters, "discarding invalid distance sample");
                    ctx.backoff
                }
            },
            Err(e) => {
                let err = map_hw_error(&*e);
                tracing::warn!(error = %err, "distance sensor read failed");
                ctx.backoff
            }
        };

        match stop_rx.recv_timeout(wait) {
            Err(xch::RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(xch::RecvTimeoutError::Disconnected) => break,
        }
    }
    tracing::trace!("distance sampler thread exiting");
    sensor
}
