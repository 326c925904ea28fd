use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Speed of sound in dry air at ~20 °C, meters per second.
pub const SPEED_OF_SOUND_M_S: f64 = 343.26;

/// Wait until `read()` reports `level`, or fail with `EchoTimeout` once `timeout`
/// has passed. A zero `poll_interval` spins instead of sleeping, which the echo
/// timing path needs for sub-millisecond resolution.
pub fn wait_for_level(
    mut read: impl FnMut() -> bool,
    level: bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Instant> {
    let deadline = Instant::now() + timeout;
    loop {
        if read() == level {
            return Ok(Instant::now());
        }
        if Instant::now() >= deadline {
            return Err(HwError::EchoTimeout);
        }
        if poll_interval.is_zero() {
            std::hint::spin_loop();
        } else {
            std::thread::sleep(poll_interval);
        }
    }
}

/// Convert an echo pulse width to a one-way distance in meters, capped at
/// `max_distance_m` (the ranger reports "nothing in range" as a long pulse).
#[inline]
pub fn echo_to_distance_m(pulse: Duration, max_distance_m: f64) -> f64 {
    (pulse.as_secs_f64() * SPEED_OF_SOUND_M_S / 2.0).min(max_distance_m)
}

/// Longest echo worth waiting for when anything beyond `max_distance_m` is
/// reported as `max_distance_m`.
#[inline]
pub fn max_echo_for(max_distance_m: f64) -> Duration {
    Duration::from_secs_f64((2.0 * max_distance_m.max(0.0)) / SPEED_OF_SOUND_M_S)
}

/// Reject drive ratios outside `[-1, 1]` before they reach a PWM duty cycle.
#[inline]
pub fn check_ratio(ratio: f64) -> Result<f64> {
    if ratio.is_finite() && (-1.0..=1.0).contains(&ratio) {
        Ok(ratio)
    } else {
        Err(HwError::RatioOutOfRange(ratio))
    }
}
