//! Motor command and distance value types.

/// Distance reported before the first good sample: no obstacle known.
pub const UNKNOWN_DISTANCE_CM: f64 = f64::INFINITY;

/// Requested drive ratios for the left and right wheels, each in `[-1.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotorCommand {
    pub left: f64,
    pub right: f64,
}

impl MotorCommand {
    pub const STOP: Self = Self {
        left: 0.0,
        right: 0.0,
    };

    /// Build a command from ratios the caller has already bounded to `[-1, 1]`.
    #[inline]
    pub fn new(left: f64, right: f64) -> Self {
        debug_assert!(in_unit_range(left), "left ratio out of range: {left}");
        debug_assert!(in_unit_range(right), "right ratio out of range: {right}");
        Self { left, right }
    }

    /// Bound arbitrary ratios to `[-1, 1]`; NaN becomes 0.
    #[inline]
    pub fn clamped(left: f64, right: f64) -> Self {
        Self {
            left: clamp_unit(left),
            right: clamp_unit(right),
        }
    }

    /// Scale raw controller units (`+/- full_scale`) into ratios.
    pub fn from_stick(left: f64, right: f64, full_scale: f64) -> Self {
        Self::clamped(left / full_scale, right / full_scale)
    }
}

#[inline]
fn in_unit_range(x: f64) -> bool {
    (-1.0..=1.0).contains(&x)
}

#[inline]
fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(-1.0, 1.0) }
}

/// Distance for display: one decimal place (ties to even), `None` while
/// still unknown.
pub fn display_distance(cm: f64) -> Option<f64> {
    cm.is_finite().then(|| (cm * 10.0).round_ties_even() / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stick_units_scale_and_clamp() {
        let c = MotorCommand::from_stick(1023.0, -511.5, 1023.0);
        assert_eq!(c, MotorCommand::new(1.0, -0.5));
        let c = MotorCommand::from_stick(5000.0, -5000.0, 1023.0);
        assert_eq!(c, MotorCommand::new(1.0, -1.0));
    }

    #[test]
    fn nan_becomes_zero() {
        let c = MotorCommand::clamped(f64::NAN, 0.3);
        assert_eq!(c, MotorCommand::new(0.0, 0.3));
    }

    #[test]
    fn display_rounds_to_one_decimal() {
        assert_eq!(display_distance(12.345), Some(12.3));
        assert_eq!(display_distance(12.36), Some(12.4));
        assert_eq!(display_distance(UNKNOWN_DISTANCE_CM), None);
    }

    #[test]
    fn display_ties_round_to_even() {
        assert_eq!(display_distance(12.25), Some(12.2));
        assert_eq!(display_distance(12.75), Some(12.8));
    }
}
