//! Device assembly: real GPIO devices with `--features hardware` on Linux,
//! simulated ones otherwise.

use eyre::WrapErr;
use rover_core::RoverError;
use rover_traits::{Buzzer, Drive, RangeSensor};

pub type BoxedSensor = Box<dyn RangeSensor + Send>;
pub type BoxedDrive = Box<dyn Drive + Send>;
pub type BoxedBuzzer = Box<dyn Buzzer + Send>;

/// Simulated ranger distance, in cm.
pub const SIM_DISTANCE_ENV: &str = "ROVER_SIM_DISTANCE_CM";
const SIM_DEFAULT_CM: f64 = 100.0;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn open(cfg: &rover_config::Config) -> eyre::Result<(BoxedSensor, BoxedDrive, BoxedBuzzer)> {
    use rover_hardware::hardware::{self, PinMap};

    let p = &cfg.pins;
    let pins = PinMap {
        echo: p.echo,
        trigger: p.trigger,
        buzzer: p.buzzer,
        left_forward: p.left_forward,
        left_backward: p.left_backward,
        right_forward: p.right_forward,
        right_backward: p.right_backward,
    };
    let (sensor, drive, buzzer) = hardware::open(
        &pins,
        cfg.hardware.max_distance_m,
        cfg.hardware.pwm_frequency_hz,
    )
    .wrap_err("open rover hardware")?;
    tracing::info!(backend = "gpio", ?pins, "devices ready");
    Ok((Box::new(sensor), Box::new(drive), Box::new(buzzer)))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub fn open(_cfg: &rover_config::Config) -> eyre::Result<(BoxedSensor, BoxedDrive, BoxedBuzzer)> {
    use rover_hardware::{SimulatedBuzzer, SimulatedDrive, SimulatedRangeSensor};

    let distance_cm = sim_distance_cm()?;
    tracing::info!(backend = "sim", distance_cm, "devices ready");
    Ok((
        Box::new(SimulatedRangeSensor::new(distance_cm / 100.0)),
        Box::new(SimulatedDrive::new()),
        Box::new(SimulatedBuzzer::new()),
    ))
}

#[cfg_attr(all(feature = "hardware", target_os = "linux"), allow(dead_code))]
fn sim_distance_cm() -> eyre::Result<f64> {
    match std::env::var(SIM_DISTANCE_ENV) {
        Ok(raw) => parse_distance_cm(&raw)
            .ok_or_else(|| {
                RoverError::Config(format!("{SIM_DISTANCE_ENV}={raw:?} is not a distance"))
            })
            .wrap_err("simulated ranger"),
        Err(_) => Ok(SIM_DEFAULT_CM),
    }
}

#[cfg_attr(all(feature = "hardware", target_os = "linux"), allow(dead_code))]
fn parse_distance_cm(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|cm| cm.is_finite() && *cm >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::parse_distance_cm;

    #[test]
    fn sim_distance_parsing() {
        assert_eq!(parse_distance_cm("12.5"), Some(12.5));
        assert_eq!(parse_distance_cm(" 40 "), Some(40.0));
        assert_eq!(parse_distance_cm("-1"), None);
        assert_eq!(parse_distance_cm("inf"), None);
        assert_eq!(parse_distance_cm("near"), None);
    }
}
