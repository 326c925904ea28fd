//! Maps `Box<dyn Error>` from trait boundaries to typed `RoverError`.
//!
//! The traits in `rover_traits` use `Box<dyn Error + Send + Sync>`; sensor
//! errors are classified here, with an optional feature-gated path for
//! `rover_hardware::HwError` downcasting. Actuator errors are always fatal.

use crate::error::RoverError;

/// Classify a ranging sensor error.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> RoverError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<rover_hardware::error::HwError>() {
            return match hw {
                rover_hardware::error::HwError::EchoTimeout => RoverError::Timeout,
                other => RoverError::Sensor(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        RoverError::Timeout
    } else {
        RoverError::Sensor(s)
    }
}

/// Wrap a drive/buzzer error. There is no recovery at this layer.
pub fn actuator_fault(e: &(dyn std::error::Error + 'static)) -> RoverError {
    RoverError::Actuator(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_text_maps_to_timeout() {
        let e: Box<dyn std::error::Error + Send + Sync> = "echo timeout".into();
        assert_eq!(map_hw_error(&*e), RoverError::Timeout);
    }

    #[test]
    fn other_text_maps_to_sensor() {
        let e: Box<dyn std::error::Error + Send + Sync> = "bus glitch".into();
        assert_eq!(map_hw_error(&*e), RoverError::Sensor("bus glitch".into()));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hw_error_downcasts() {
        use rover_hardware::error::HwError;
        let e: Box<dyn std::error::Error + Send + Sync> = Box::new(HwError::EchoTimeout);
        assert_eq!(map_hw_error(&*e), RoverError::Timeout);
        let e: Box<dyn std::error::Error + Send + Sync> = Box::new(HwError::Gpio("busy".into()));
        assert_eq!(map_hw_error(&*e), RoverError::Sensor("gpio error: busy".into()));
    }

    #[test]
    fn actuator_errors_are_fatal() {
        let e: Box<dyn std::error::Error + Send + Sync> = "pwm write failed".into();
        let mapped = actuator_fault(&*e);
        assert!(mapped.is_fatal());
        assert_eq!(mapped.to_string(), "actuator fault: pwm write failed");
    }
}
