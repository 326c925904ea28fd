//! Applies safety decisions to the drive and buzzer.

use crate::command::MotorCommand;
use crate::error::RoverError;
use crate::hw_error::actuator_fault;
use crate::policy::{Rule, SafetyDecision};
use rover_traits::{Buzzer, Drive};

pub struct MotorController<D, B> {
    drive: D,
    buzzer: B,
    buzzer_on: bool,
    applied: MotorCommand,
}

impl<D: Drive, B: Buzzer> MotorController<D, B> {
    pub fn new(drive: D, buzzer: B) -> Self {
        Self {
            drive,
            buzzer,
            buzzer_on: false,
            applied: MotorCommand::STOP,
        }
    }

    /// Write the decision to the hardware: drive first, then buzzer. Every
    /// call writes, even when the decision is unchanged.
    pub fn apply(&mut self, decision: &SafetyDecision) -> Result<(), RoverError> {
        let MotorCommand { left, right } = decision.effective;
        let res = if decision.rule == Rule::DeadBand {
            self.drive.stop()
        } else {
            self.drive.set_ratios(left, right)
        };
        res.map_err(|e| actuator_fault(&*e))?;
        self.applied = decision.effective;

        self.buzzer
            .set(decision.buzzer_on)
            .map_err(|e| actuator_fault(&*e))?;
        self.buzzer_on = decision.buzzer_on;
        Ok(())
    }

    /// Stop both wheels and silence the buzzer. Both writes are attempted even
    /// if the first fails.
    pub fn halt(&mut self) -> Result<(), RoverError> {
        let drive = self.drive.stop().map_err(|e| actuator_fault(&*e));
        if drive.is_ok() {
            self.applied = MotorCommand::STOP;
        }
        let buzzer = self.buzzer.set(false).map_err(|e| actuator_fault(&*e));
        if buzzer.is_ok() {
            self.buzzer_on = false;
        }
        drive.and(buzzer)
    }

    #[inline]
    pub fn buzzer_on(&self) -> bool {
        self.buzzer_on
    }

    /// Last command successfully written to the drive.
    #[inline]
    pub fn applied(&self) -> MotorCommand {
        self.applied
    }
}
