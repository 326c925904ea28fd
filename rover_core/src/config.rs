//! Runtime configuration for the control loop and sampler.
//!
//! Separate from the TOML schema in `rover_config`; see `conversions`.

/// Safety policy configuration.
#[derive(Debug, Clone)]
pub struct SafetyCfg {
    /// Forward motion is blocked below this distance (cm).
    pub near_threshold_cm: f64,
}

impl Default for SafetyCfg {
    fn default() -> Self {
        Self {
            near_threshold_cm: crate::policy::DEFAULT_NEAR_THRESHOLD_CM,
        }
    }
}

/// Distance sampler pacing.
#[derive(Debug, Clone)]
pub struct SamplerCfg {
    /// Target period between samples (ms).
    pub period_ms: u64,
    /// Wait after a failed read (ms).
    pub error_backoff_ms: u64,
    /// Max time a single sensor read may block (ms).
    pub read_timeout_ms: u64,
}

impl Default for SamplerCfg {
    fn default() -> Self {
        Self {
            period_ms: 60,
            error_backoff_ms: 1_000,
            read_timeout_ms: 25,
        }
    }
}

/// Command intake scaling.
#[derive(Debug, Clone)]
pub struct ControlCfg {
    /// Controller units that map to a ratio of 1.0.
    pub full_scale: f64,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self { full_scale: 1023.0 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RoverCfg {
    pub safety: SafetyCfg,
    pub sampler: SamplerCfg,
    pub control: ControlCfg,
}
