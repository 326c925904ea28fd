use std::time::{Duration, Instant};
use tracing::trace;

use rppal::gpio::{InputPin, OutputPin};

use crate::error::{HwError, Result};
use crate::util::{echo_to_distance_m, max_echo_for, wait_for_level};

/// HC-SR04 style ultrasonic ranger: a 10 µs trigger pulse, then an echo
/// pulse whose width is the round-trip time of flight.
pub struct HcSr04 {
    trigger: OutputPin,
    echo: InputPin,
    max_distance_m: f64,
}

impl HcSr04 {
    pub fn new(mut trigger: OutputPin, echo: InputPin, max_distance_m: f64) -> Result<Self> {
        trigger.set_low();
        Ok(Self {
            trigger,
            echo,
            max_distance_m,
        })
    }

    /// One measurement in meters. Fails only when the echo never starts; an
    /// echo longer than the configured range reads as `max_distance_m`.
    pub fn read_with_timeout(&mut self, timeout: Duration) -> Result<f64> {
        // A previous echo may still be high if the last read bailed out early.
        wait_for_level(
            || self.echo.is_high(),
            false,
            timeout,
            Duration::from_micros(50),
        )?;

        self.trigger.set_high();
        spin_for(Duration::from_micros(10));
        self.trigger.set_low();

        let started = wait_for_level(|| self.echo.is_high(), true, timeout, Duration::ZERO)?;
        let cutoff = max_echo_for(self.max_distance_m) + Duration::from_micros(500);
        while self.echo.is_high() {
            if started.elapsed() > cutoff {
                trace!(max_m = self.max_distance_m, "echo beyond range");
                return Ok(self.max_distance_m);
            }
            std::hint::spin_loop();
        }
        let meters = echo_to_distance_m(started.elapsed(), self.max_distance_m);
        trace!(meters, "ranger read");
        Ok(meters)
    }
}

#[inline]
fn spin_for(d: Duration) {
    let until = Instant::now() + d;
    while Instant::now() < until {
        std::hint::spin_loop();
    }
}

pub(crate) fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}
