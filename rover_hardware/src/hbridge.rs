use rppal::gpio::OutputPin;

use crate::error::{HwError, Result};
use crate::util::check_ratio;

/// One DC motor on a dual-input H-bridge: PWM on the forward pin drives
/// forward, PWM on the backward pin drives in reverse.
pub struct HBridgeMotor {
    forward: OutputPin,
    backward: OutputPin,
    pwm_hz: f64,
}

impl HBridgeMotor {
    pub fn new(mut forward: OutputPin, mut backward: OutputPin, pwm_hz: f64) -> Self {
        forward.set_low();
        backward.set_low();
        Self {
            forward,
            backward,
            pwm_hz,
        }
    }

    pub fn set(&mut self, ratio: f64) -> Result<()> {
        let ratio = check_ratio(ratio)?;
        let (active, idle) = if ratio >= 0.0 {
            (&mut self.forward, &mut self.backward)
        } else {
            (&mut self.backward, &mut self.forward)
        };
        idle.clear_pwm().map_err(pwm_err)?;
        idle.set_low();
        if ratio == 0.0 {
            active.clear_pwm().map_err(pwm_err)?;
            active.set_low();
            return Ok(());
        }
        active
            .set_pwm_frequency(self.pwm_hz, ratio.abs())
            .map_err(pwm_err)
    }

    pub fn stop(&mut self) -> Result<()> {
        for pin in [&mut self.forward, &mut self.backward] {
            pin.clear_pwm().map_err(pwm_err)?;
            pin.set_low();
        }
        Ok(())
    }
}

fn pwm_err(e: rppal::gpio::Error) -> HwError {
    HwError::Pwm(e.to_string())
}
