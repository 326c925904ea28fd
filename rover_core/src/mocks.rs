//! Test and helper devices for rover_core.
//!
//! Every mock is `Clone`; clones share state, so a test can hand one copy to
//! the control loop and keep another to script or inspect it.

use rover_traits::{Buzzer, DeviceError, Drive, RangeSensor};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A sensor that always errors; the sampler never records anything from it.
pub struct NoopSensor;

impl RangeSensor for NoopSensor {
    fn read(&mut self, _timeout: Duration) -> Result<f64, DeviceError> {
        Err(Box::new(std::io::Error::other("noop sensor")))
    }
}

#[derive(Default)]
struct Script {
    queue: VecDeque<Result<f64, String>>,
    hold: Option<f64>,
}

/// Sensor that plays queued results in order, then keeps returning the last
/// good value (or errors if there never was one).
#[derive(Clone, Default)]
pub struct ScriptedSensor {
    script: Arc<Mutex<Script>>,
    reads: Arc<AtomicUsize>,
}

impl ScriptedSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sensor that reports a constant distance (meters).
    pub fn steady(meters: f64) -> Self {
        let s = Self::new();
        s.set(meters);
        s
    }

    pub fn push_ok(&self, meters: f64) {
        lock(&self.script).queue.push_back(Ok(meters));
    }

    pub fn push_err(&self, msg: &str) {
        lock(&self.script).queue.push_back(Err(msg.to_string()));
    }

    /// Drop anything queued and report `meters` from now on.
    pub fn set(&self, meters: f64) {
        let mut script = lock(&self.script);
        script.queue.clear();
        script.hold = Some(meters);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl RangeSensor for ScriptedSensor {
    fn read(&mut self, _timeout: Duration) -> Result<f64, DeviceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut script = lock(&self.script);
        match script.queue.pop_front() {
            Some(Ok(m)) => {
                script.hold = Some(m);
                Ok(m)
            }
            Some(Err(msg)) => Err(msg.into()),
            None => script.hold.ok_or_else(|| "no reading scripted".into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveCall {
    Set(f64, f64),
    Stop,
}

/// Drive that records every successful call. While failing, calls error and
/// are not recorded.
#[derive(Clone, Default)]
pub struct RecordingDrive {
    calls: Arc<Mutex<Vec<DriveCall>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingDrive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<DriveCall> {
        lock(&self.calls).clone()
    }

    pub fn last(&self) -> Option<DriveCall> {
        lock(&self.calls).last().copied()
    }

    fn record(&self, call: DriveCall) -> Result<(), DeviceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err("drive write failed".into());
        }
        lock(&self.calls).push(call);
        Ok(())
    }
}

impl Drive for RecordingDrive {
    fn set_ratios(&mut self, left: f64, right: f64) -> Result<(), DeviceError> {
        self.record(DriveCall::Set(left, right))
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.record(DriveCall::Stop)
    }
}

#[derive(Clone, Default)]
pub struct RecordingBuzzer {
    states: Arc<Mutex<Vec<bool>>>,
}

impl RecordingBuzzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn states(&self) -> Vec<bool> {
        lock(&self.states).clone()
    }
}

impl Buzzer for RecordingBuzzer {
    fn set(&mut self, on: bool) -> Result<(), DeviceError> {
        lock(&self.states).push(on);
        Ok(())
    }
}
