#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the rover.
//!
//! Every section is optional; an empty file yields the stock CamJam wiring and
//! the default safety distances. `Config::validate()` must pass before the
//! values reach the control loop.
use serde::Deserialize;
use std::path::Path;

/// BCM pin numbers.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Pins {
    pub echo: u8,
    pub trigger: u8,
    pub buzzer: u8,
    pub left_forward: u8,
    pub left_backward: u8,
    pub right_forward: u8,
    pub right_backward: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            echo: 18,
            trigger: 17,
            buzzer: 4,
            left_forward: 9,
            left_backward: 10,
            right_forward: 7,
            right_backward: 8,
        }
    }
}

impl Pins {
    fn all(&self) -> [(&'static str, u8); 7] {
        [
            ("echo", self.echo),
            ("trigger", self.trigger),
            ("buzzer", self.buzzer),
            ("left_forward", self.left_forward),
            ("left_backward", self.left_backward),
            ("right_forward", self.right_forward),
            ("right_backward", self.right_backward),
        ]
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Safety {
    /// Forward motion is blocked below this distance. The proximity
    /// re-evaluation boundary is 1.5x this value.
    pub near_threshold_cm: f64,
}

impl Default for Safety {
    fn default() -> Self {
        Self {
            near_threshold_cm: 15.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Sampler {
    /// Target period between distance samples (ms).
    pub period_ms: u64,
    /// Wait after a failed sensor read before trying again (ms).
    pub error_backoff_ms: u64,
}

impl Default for Sampler {
    fn default() -> Self {
        Self {
            period_ms: 60,
            error_backoff_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Hardware {
    /// Max time to wait for the ranger echo to start before failing the read
    pub echo_timeout_ms: u64,
    /// Echoes from beyond this range read as this range
    pub max_distance_m: f64,
    pub pwm_frequency_hz: f64,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            echo_timeout_ms: 25,
            max_distance_m: 1.0,
            pwm_frequency_hz: 100.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Control {
    /// Controller units that map to full speed (joystick range is +/- this value)
    pub full_scale: f64,
}

impl Default for Control {
    fn default() -> Self {
        Self { full_scale: 1023.0 }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub pins: Pins,
    pub safety: Safety,
    pub sampler: Sampler,
    pub hardware: Hardware,
    pub control: Control,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a config file. A missing file yields `Config::default()`.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration {:?}: {}", path, e))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(eyre::eyre!("read config {:?}: {}", path, e)),
    }
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Safety
        let near = self.safety.near_threshold_cm;
        if !near.is_finite() || near <= 0.0 {
            eyre::bail!("safety.near_threshold_cm must be a finite value > 0");
        }

        // Sampler
        if self.sampler.period_ms == 0 {
            eyre::bail!("sampler.period_ms must be >= 1");
        }
        if self.sampler.error_backoff_ms == 0 {
            eyre::bail!("sampler.error_backoff_ms must be >= 1");
        }
        if self.sampler.period_ms > 10_000 {
            eyre::bail!("sampler.period_ms is unreasonably large (>10s)");
        }

        // Hardware
        if self.hardware.echo_timeout_ms == 0 {
            eyre::bail!("hardware.echo_timeout_ms must be >= 1");
        }
        let max_m = self.hardware.max_distance_m;
        if !max_m.is_finite() || max_m <= 0.0 {
            eyre::bail!("hardware.max_distance_m must be a finite value > 0");
        }
        if max_m * 100.0 <= near * 1.5 {
            eyre::bail!(
                "hardware.max_distance_m must exceed the proximity range ({} cm)",
                near * 1.5
            );
        }
        let pwm = self.hardware.pwm_frequency_hz;
        if !pwm.is_finite() || pwm <= 0.0 {
            eyre::bail!("hardware.pwm_frequency_hz must be > 0");
        }

        // Control
        let fs = self.control.full_scale;
        if !fs.is_finite() || fs <= 0.0 {
            eyre::bail!("control.full_scale must be a finite value > 0");
        }

        // Pins
        let pins = self.pins.all();
        for (i, (name, pin)) in pins.iter().enumerate() {
            if let Some((other, _)) = pins[i + 1..].iter().find(|(_, p)| p == pin) {
                eyre::bail!("pins.{name} and pins.{other} both use GPIO {pin}");
            }
        }

        // Logging
        if let Some(rotation) = self.logging.rotation.as_deref()
            && !matches!(rotation, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}
