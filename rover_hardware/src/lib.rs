pub mod error;
pub mod util;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod hbridge;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod hcsr04;

use rover_traits::{Buzzer, DeviceError, Drive, RangeSensor};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Simulated ranger that reports whatever distance its handle was last set to.
#[derive(Debug, Clone)]
pub struct SimulatedRangeSensor {
    distance_m: Arc<AtomicU64>,
}

impl SimulatedRangeSensor {
    pub fn new(distance_m: f64) -> Self {
        Self {
            distance_m: Arc::new(AtomicU64::new(distance_m.to_bits())),
        }
    }

    /// Move the simulated obstacle; clones share the same distance.
    pub fn set_distance_m(&self, distance_m: f64) {
        self.distance_m.store(distance_m.to_bits(), Ordering::Relaxed);
    }
}

impl RangeSensor for SimulatedRangeSensor {
    fn read(&mut self, _timeout: std::time::Duration) -> Result<f64, DeviceError> {
        let m = f64::from_bits(self.distance_m.load(Ordering::Relaxed));
        tracing::trace!(meters = m, "ranger read (simulated)");
        Ok(m)
    }
}

/// Simulated drive; remembers the last ratios it was given.
#[derive(Debug, Clone, Default)]
pub struct SimulatedDrive {
    ratios: Arc<Mutex<(f64, f64)>>,
}

impl SimulatedDrive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ratios(&self) -> (f64, f64) {
        *self.ratios.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drive for SimulatedDrive {
    fn set_ratios(&mut self, left: f64, right: f64) -> Result<(), DeviceError> {
        util::check_ratio(left)?;
        util::check_ratio(right)?;
        *self.ratios.lock().unwrap_or_else(PoisonError::into_inner) = (left, right);
        tracing::debug!(left, right, "drive set (simulated)");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        *self.ratios.lock().unwrap_or_else(PoisonError::into_inner) = (0.0, 0.0);
        tracing::debug!("drive stopped (simulated)");
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedBuzzer {
    on: Arc<AtomicBool>,
}

impl SimulatedBuzzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::Relaxed)
    }
}

impl Buzzer for SimulatedBuzzer {
    fn set(&mut self, on: bool) -> Result<(), DeviceError> {
        self.on.store(on, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod hardware {
    use super::*;
    use crate::error::HwError;
    use crate::hbridge::HBridgeMotor;
    use crate::hcsr04::{HcSr04, gpio_err};
    use rppal::gpio::{Gpio, OutputPin};

    /// GPIO assignment for the ranger, buzzer and both H-bridge channels.
    #[derive(Debug, Clone, Copy)]
    pub struct PinMap {
        pub echo: u8,
        pub trigger: u8,
        pub buzzer: u8,
        pub left_forward: u8,
        pub left_backward: u8,
        pub right_forward: u8,
        pub right_backward: u8,
    }

    pub struct HardwareRangeSensor {
        ranger: HcSr04,
    }

    impl HardwareRangeSensor {
        pub fn try_new(
            gpio: &Gpio,
            trigger_pin: u8,
            echo_pin: u8,
            max_distance_m: f64,
        ) -> Result<Self, HwError> {
            let trigger = gpio.get(trigger_pin).map_err(gpio_err)?.into_output();
            let echo = gpio.get(echo_pin).map_err(gpio_err)?.into_input();
            Ok(Self {
                ranger: HcSr04::new(trigger, echo, max_distance_m)?,
            })
        }
    }

    impl RangeSensor for HardwareRangeSensor {
        fn read(&mut self, timeout: std::time::Duration) -> Result<f64, DeviceError> {
            match self.ranger.read_with_timeout(timeout) {
                Ok(m) => Ok(m),
                Err(e) => {
                    tracing::debug!(error = %e, "ranger read failed");
                    Err(Box::new(e))
                }
            }
        }
    }

    pub struct HardwareDrive {
        left: HBridgeMotor,
        right: HBridgeMotor,
    }

    impl HardwareDrive {
        pub fn try_new(gpio: &Gpio, pins: &PinMap, pwm_hz: f64) -> Result<Self, HwError> {
            let out = |pin: u8| -> Result<OutputPin, HwError> {
                Ok(gpio.get(pin).map_err(gpio_err)?.into_output())
            };
            Ok(Self {
                left: HBridgeMotor::new(out(pins.left_forward)?, out(pins.left_backward)?, pwm_hz),
                right: HBridgeMotor::new(
                    out(pins.right_forward)?,
                    out(pins.right_backward)?,
                    pwm_hz,
                ),
            })
        }
    }

    impl Drive for HardwareDrive {
        fn set_ratios(&mut self, left: f64, right: f64) -> Result<(), DeviceError> {
            self.left.set(left)?;
            self.right.set(right)?;
            Ok(())
        }

        fn stop(&mut self) -> Result<(), DeviceError> {
            // Stop both even if the first fails.
            let l = self.left.stop();
            let r = self.right.stop();
            l?;
            r?;
            Ok(())
        }
    }

    pub struct HardwareBuzzer {
        pin: OutputPin,
    }

    impl HardwareBuzzer {
        pub fn try_new(gpio: &Gpio, pin: u8) -> Result<Self, HwError> {
            let mut pin = gpio.get(pin).map_err(gpio_err)?.into_output();
            pin.set_low();
            Ok(Self { pin })
        }
    }

    impl Buzzer for HardwareBuzzer {
        fn set(&mut self, on: bool) -> Result<(), DeviceError> {
            if on {
                self.pin.set_high();
            } else {
                self.pin.set_low();
            }
            Ok(())
        }
    }

    /// Open the GPIO chip and claim every pin the rover uses.
    pub fn open(
        pins: &PinMap,
        max_distance_m: f64,
        pwm_hz: f64,
    ) -> Result<(HardwareRangeSensor, HardwareDrive, HardwareBuzzer), HwError> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let sensor = HardwareRangeSensor::try_new(&gpio, pins.trigger, pins.echo, max_distance_m)?;
        let drive = HardwareDrive::try_new(&gpio, pins, pwm_hz)?;
        let buzzer = HardwareBuzzer::try_new(&gpio, pins.buzzer)?;
        Ok((sensor, drive, buzzer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn simulated_ranger_follows_its_handle() {
        let mut sensor = SimulatedRangeSensor::new(0.5);
        let handle = sensor.clone();
        assert_eq!(sensor.read(Duration::from_millis(10)).unwrap(), 0.5);
        handle.set_distance_m(0.12);
        assert_eq!(sensor.read(Duration::from_millis(10)).unwrap(), 0.12);
    }

    #[test]
    fn simulated_drive_records_and_stops() {
        let mut drive = SimulatedDrive::new();
        let observed = drive.clone();
        drive.set_ratios(0.4, -0.2).unwrap();
        assert_eq!(observed.ratios(), (0.4, -0.2));
        drive.stop().unwrap();
        assert_eq!(observed.ratios(), (0.0, 0.0));
    }

    #[test]
    fn simulated_drive_rejects_out_of_range_ratio() {
        let mut drive = SimulatedDrive::new();
        assert!(drive.set_ratios(1.5, 0.0).is_err());
        assert_eq!(drive.ratios(), (0.0, 0.0));
    }

    #[test]
    fn simulated_buzzer_toggles() {
        let mut buzzer = SimulatedBuzzer::new();
        buzzer.set(true).unwrap();
        assert!(buzzer.is_on());
        buzzer.set(false).unwrap();
        assert!(!buzzer.is_on());
    }
}
