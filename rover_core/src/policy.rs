//! Collision-avoidance policy.
//!
//! `SafetyPolicy::decide` is a pure function of the requested command and the
//! current distance. Rules run in a fixed order:
//!
//! 1. Buzzer on iff both wheels reverse (below `REVERSE_ALERT`), whatever the distance.
//! 2. Dead-band: both magnitudes below `DEAD_BAND` means stop, and nothing else applies.
//! 3. Near obstacle: below the near threshold every forward component is clamped
//!    to 0. Reverse components are untouched so the robot can still back off or
//!    turn away.
//! 4. Otherwise the command passes through.

use crate::command::MotorCommand;
use crate::error::RoverError;

/// Default hard-stop boundary (cm).
pub const DEFAULT_NEAR_THRESHOLD_CM: f64 = 15.0;
/// The proximity re-evaluation boundary is this multiple of the near threshold.
pub const WARN_FACTOR: f64 = 1.5;
/// Wheel ratios with magnitude below this are an intended stop.
pub const DEAD_BAND: f64 = 0.1;
/// Both wheels below this ratio sound the reversing buzzer.
pub const REVERSE_ALERT: f64 = -0.01;

/// Which rule produced the effective command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    DeadBand,
    NearObstacle,
    PassThrough,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyDecision {
    pub effective: MotorCommand,
    pub buzzer_on: bool,
    pub rule: Rule,
}

#[derive(Debug, Clone, Copy)]
pub struct SafetyPolicy {
    near_threshold_cm: f64,
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            near_threshold_cm: DEFAULT_NEAR_THRESHOLD_CM,
        }
    }
}

impl SafetyPolicy {
    /// Fails unless the threshold is finite and positive, which keeps
    /// `warn_threshold_cm() > near_threshold_cm()`.
    pub fn new(near_threshold_cm: f64) -> Result<Self, RoverError> {
        if !near_threshold_cm.is_finite() || near_threshold_cm <= 0.0 {
            return Err(RoverError::Config(format!(
                "near threshold must be finite and > 0, got {near_threshold_cm}"
            )));
        }
        Ok(Self { near_threshold_cm })
    }

    #[inline]
    pub fn near_threshold_cm(&self) -> f64 {
        self.near_threshold_cm
    }

    #[inline]
    pub fn warn_threshold_cm(&self) -> f64 {
        self.near_threshold_cm * WARN_FACTOR
    }

    pub fn decide(&self, requested: MotorCommand, distance_cm: f64) -> SafetyDecision {
        let MotorCommand { left, right } = requested;
        let buzzer_on = left < REVERSE_ALERT && right < REVERSE_ALERT;

        if left.abs() < DEAD_BAND && right.abs() < DEAD_BAND {
            return SafetyDecision {
                effective: MotorCommand::STOP,
                buzzer_on,
                rule: Rule::DeadBand,
            };
        }

        if distance_cm < self.near_threshold_cm {
            return SafetyDecision {
                effective: MotorCommand {
                    left: left.min(0.0),
                    right: right.min(0.0),
                },
                buzzer_on,
                rule: Rule::NearObstacle,
            };
        }

        SafetyDecision {
            effective: requested,
            buzzer_on,
            rule: Rule::PassThrough,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warn_is_one_and_a_half_near() {
        let p = SafetyPolicy::new(20.0).unwrap();
        assert_eq!(p.warn_threshold_cm(), 30.0);
        assert!(p.warn_threshold_cm() > p.near_threshold_cm());
    }

    #[test]
    fn rejects_degenerate_thresholds() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(SafetyPolicy::new(bad).is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn unknown_distance_is_permissive() {
        let p = SafetyPolicy::default();
        let d = p.decide(MotorCommand::new(0.8, 0.8), crate::command::UNKNOWN_DISTANCE_CM);
        assert_eq!(d.rule, Rule::PassThrough);
        assert_eq!(d.effective, MotorCommand::new(0.8, 0.8));
    }

    #[test]
    fn spin_in_place_keeps_reverse_wheel_when_blocked() {
        let p = SafetyPolicy::default();
        let d = p.decide(MotorCommand::new(0.6, -0.6), 5.0);
        assert_eq!(d.effective, MotorCommand::new(0.0, -0.6));
        assert!(!d.buzzer_on);
    }

    #[test]
    fn exactly_at_threshold_is_not_near() {
        let p = SafetyPolicy::default();
        let d = p.decide(MotorCommand::new(0.5, 0.5), DEFAULT_NEAR_THRESHOLD_CM);
        assert_eq!(d.rule, Rule::PassThrough);
    }
}
