use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoverError {
    /// A drive or buzzer write failed; the robot state is unknown.
    #[error("actuator fault: {0}")]
    Actuator(String),
    #[error("sensor fault: {0}")]
    Sensor(String),
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
}

impl RoverError {
    /// Faults after which the control loop must not keep driving.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RoverError::Actuator(_))
    }
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
