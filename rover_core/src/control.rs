//! The safety control loop.
//!
//! Two triggers funnel into one critical section owned by a `CommandStore`:
//! a new command (`submit`) and a proximity event from the sampler
//! (`reevaluate`). Both take the distance snapshot after acquiring the lock,
//! run the policy and apply the result before releasing it, so a decision
//! derived from an older command can never land after a newer one.

use crate::command::MotorCommand;
use crate::error::{Report, Result, RoverError};
use crate::motor::MotorController;
use crate::policy::{SafetyDecision, SafetyPolicy};
use crate::sampler::LatestDistance;
use crate::store::CommandStore;
use rover_traits::{Buzzer, Drive};
use std::sync::{Arc, Mutex, PoisonError, Weak};

pub struct ControlLoop<D, B> {
    store: CommandStore<MotorController<D, B>>,
    distance: LatestDistance,
    policy: SafetyPolicy,
    fault: Mutex<Option<RoverError>>,
}

impl<D: Drive, B: Buzzer> ControlLoop<D, B> {
    pub fn new(
        motors: MotorController<D, B>,
        distance: LatestDistance,
        policy: SafetyPolicy,
    ) -> Self {
        Self {
            store: CommandStore::new(motors),
            distance,
            policy,
            fault: Mutex::new(None),
        }
    }

    /// Store a new command and apply the decision derived from it.
    ///
    /// Fails fast with the latched fault once an actuator write has failed.
    pub fn submit(&self, command: MotorCommand) -> Result<SafetyDecision> {
        if let Some(fault) = self.fault() {
            return Err(Report::new(fault));
        }
        self.store
            .replace_then(command, |cmd, motors| self.evaluate(cmd, motors))
            .map_err(Report::new)
    }

    /// Re-apply the stored command against the current distance.
    pub fn reevaluate(&self) -> Result<SafetyDecision> {
        self.store
            .with_current(|cmd, motors| self.evaluate(cmd, motors))
            .map_err(Report::new)
    }

    /// Forget the stored command and stop everything.
    pub fn halt(&self) -> Result<()> {
        self.store
            .replace_then(MotorCommand::STOP, |_, motors| motors.halt())
            .map_err(|e| {
                self.latch(&e);
                Report::new(e)
            })
    }

    pub fn current_command(&self) -> MotorCommand {
        self.store.current()
    }

    /// Drive command and buzzer state as last written to the hardware.
    pub fn applied(&self) -> (MotorCommand, bool) {
        self.store
            .with_current(|_, motors| (motors.applied(), motors.buzzer_on()))
    }

    /// Latched actuator fault, if any.
    pub fn fault(&self) -> Option<RoverError> {
        self.fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn evaluate(
        &self,
        command: MotorCommand,
        motors: &mut MotorController<D, B>,
    ) -> std::result::Result<SafetyDecision, RoverError> {
        let distance_cm = self.distance.get();
        let decision = self.policy.decide(command, distance_cm);
        tracing::debug!(
            left = command.left,
            right = command.right,
            distance_cm,
            eff_left = decision.effective.left,
            eff_right = decision.effective.right,
            buzzer = decision.buzzer_on,
            rule = ?decision.rule,
            "safety decision"
        );
        match motors.apply(&decision) {
            Ok(()) => Ok(decision),
            Err(e) => {
                self.latch(&e);
                Err(e)
            }
        }
    }

    fn latch(&self, e: &RoverError) {
        if !e.is_fatal() {
            return;
        }
        let mut fault = self.fault.lock().unwrap_or_else(PoisonError::into_inner);
        if fault.is_none() {
            tracing::error!(error = %e, "actuator fault; control loop latched");
            *fault = Some(e.clone());
        }
    }
}

impl<D, B> ControlLoop<D, B>
where
    D: Drive + Send + 'static,
    B: Buzzer + Send + 'static,
{
    /// Callback for `DistanceSampler::on_proximity`. Holds only a weak
    /// reference; once the loop is gone, or once a fault is latched, the
    /// callback does nothing.
    pub fn proximity_handler(self: &Arc<Self>) -> impl Fn(f64) + Send + Sync + 'static {
        let this: Weak<Self> = Arc::downgrade(self);
        move |distance_cm| {
            let Some(control) = this.upgrade() else {
                return;
            };
            if control.fault().is_some() {
                return;
            }
            if let Err(e) = control.reevaluate() {
                // Latched; the host sees it through `fault()`.
                tracing::debug!(error = %e, distance_cm, "proximity re-evaluation failed");
            }
        }
    }
}
