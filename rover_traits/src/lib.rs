pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Error type shared by every driver-facing trait.
pub type DeviceError = Box<dyn std::error::Error + Send + Sync>;

/// A ranging sensor that can take one distance measurement on demand.
pub trait RangeSensor {
    /// Take a single measurement, in meters.
    ///
    /// `timeout` bounds how long the driver may wait for the echo.
    fn read(&mut self, timeout: std::time::Duration) -> Result<f64, DeviceError>;
}

/// Two-wheel differential drive.
pub trait Drive {
    /// Drive both wheels; each ratio is in `[-1.0, 1.0]`, negative is reverse.
    fn set_ratios(&mut self, left: f64, right: f64) -> Result<(), DeviceError>;
    fn stop(&mut self) -> Result<(), DeviceError>;
}

pub trait Buzzer {
    fn set(&mut self, on: bool) -> Result<(), DeviceError>;
}

impl<T: RangeSensor + ?Sized> RangeSensor for Box<T> {
    fn read(&mut self, timeout: std::time::Duration) -> Result<f64, DeviceError> {
        (**self).read(timeout)
    }
}

impl<T: Drive + ?Sized> Drive for Box<T> {
    fn set_ratios(&mut self, left: f64, right: f64) -> Result<(), DeviceError> {
        (**self).set_ratios(left, right)
    }
    fn stop(&mut self) -> Result<(), DeviceError> {
        (**self).stop()
    }
}

impl<T: Buzzer + ?Sized> Buzzer for Box<T> {
    fn set(&mut self, on: bool) -> Result<(), DeviceError> {
        (**self).set(on)
    }
}
