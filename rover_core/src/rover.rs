//! `Rover`: the process-wide context that wires sampler, control loop and
//! policy together. Built once at startup and handed to whatever serves
//! commands; there is no other shared state.

use crate::command::{MotorCommand, display_distance};
use crate::config::RoverCfg;
use crate::control::ControlLoop;
use crate::error::{Result, RoverError};
use crate::motor::MotorController;
use crate::policy::{SafetyDecision, SafetyPolicy};
use crate::sampler::DistanceSampler;
use rover_traits::clock::{Clock, MonotonicClock};
use rover_traits::{Buzzer, Drive, RangeSensor};
use std::sync::Arc;

/// Reply to an accepted command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandReply {
    pub decision: SafetyDecision,
    /// Distance used for display, one decimal place; `None` while unknown.
    pub distance_cm: Option<f64>,
}

/// Point-in-time view for status replies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoverStatus {
    pub distance_cm: Option<f64>,
    /// Ratios last written to the drive.
    pub applied: MotorCommand,
    pub buzzer_on: bool,
    /// Milliseconds since the last good reading; `None` before the first.
    pub stalled_ms: Option<u64>,
}

pub struct Rover<S, D, B, C = MonotonicClock> {
    sampler: DistanceSampler<S, C>,
    control: Arc<ControlLoop<D, B>>,
    full_scale: f64,
}

impl<S, D, B> Rover<S, D, B, MonotonicClock>
where
    S: RangeSensor + Send + 'static,
    D: Drive + Send + 'static,
    B: Buzzer + Send + 'static,
{
    pub fn new(sensor: S, drive: D, buzzer: B, cfg: &RoverCfg) -> Result<Self> {
        Self::with_clock(sensor, drive, buzzer, cfg, MonotonicClock::new())
    }
}

impl<S, D, B, C> Rover<S, D, B, C>
where
    S: RangeSensor + Send + 'static,
    D: Drive + Send + 'static,
    B: Buzzer + Send + 'static,
    C: Clock + Clone + Send + 'static,
{
    pub fn with_clock(sensor: S, drive: D, buzzer: B, cfg: &RoverCfg, clock: C) -> Result<Self> {
        let full_scale = cfg.control.full_scale;
        if !full_scale.is_finite() || full_scale <= 0.0 {
            let msg = format!("full scale must be > 0, got {full_scale}");
            return Err(RoverError::Config(msg).into());
        }
        let policy = SafetyPolicy::new(cfg.safety.near_threshold_cm)?;
        let sampler = DistanceSampler::new(
            sensor,
            cfg.sampler.clone(),
            policy.warn_threshold_cm(),
            clock,
        );
        let control = Arc::new(ControlLoop::new(
            MotorController::new(drive, buzzer),
            sampler.reading(),
            policy,
        ));
        sampler.on_proximity(control.proximity_handler());
        tracing::debug!(
            near_cm = policy.near_threshold_cm(),
            warn_cm = policy.warn_threshold_cm(),
            "rover assembled"
        );
        Ok(Self {
            sampler,
            control,
            full_scale,
        })
    }

    /// Start distance sampling.
    pub fn start(&mut self) -> Result<()> {
        self.sampler.start()
    }

    /// Submit wheel ratios already bounded to `[-1, 1]`.
    pub fn submit_command(&self, left: f64, right: f64) -> Result<CommandReply> {
        self.submit(MotorCommand::new(left, right))
    }

    /// Submit raw controller units (`+/- full_scale`), scaled and clamped here.
    pub fn submit_stick(&self, left: f64, right: f64) -> Result<CommandReply> {
        self.submit(MotorCommand::from_stick(left, right, self.full_scale))
    }

    fn submit(&self, command: MotorCommand) -> Result<CommandReply> {
        let decision = self.control.submit(command)?;
        Ok(CommandReply {
            decision,
            distance_cm: self.distance(),
        })
    }

    /// Latest distance for display, one decimal place; `None` while unknown.
    pub fn distance(&self) -> Option<f64> {
        display_distance(self.sampler.latest())
    }

    pub fn status(&self) -> RoverStatus {
        let (applied, buzzer_on) = self.control.applied();
        RoverStatus {
            distance_cm: self.distance(),
            applied,
            buzzer_on,
            stalled_ms: self.sampler.stalled_for_ms(),
        }
    }

    pub fn fault(&self) -> Option<RoverError> {
        self.control.fault()
    }

    pub fn control(&self) -> &Arc<ControlLoop<D, B>> {
        &self.control
    }

    pub fn is_sampling(&self) -> bool {
        self.sampler.is_running()
    }

    /// Stop sampling, then stop the motors. Safe to call more than once.
    pub fn shutdown(&mut self) -> Result<()> {
        self.sampler.stop();
        let res = self.control.halt();
        tracing::info!(ok = res.is_ok(), "rover shut down");
        res
    }
}
