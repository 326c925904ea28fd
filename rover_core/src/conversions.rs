//! `From` implementations bridging `rover_config` types to `rover_core` types.

use crate::config::{ControlCfg, RoverCfg, SafetyCfg, SamplerCfg};

// ── SafetyCfg ────────────────────────────────────────────────────────────────

impl From<&rover_config::Safety> for SafetyCfg {
    fn from(c: &rover_config::Safety) -> Self {
        Self {
            near_threshold_cm: c.near_threshold_cm,
        }
    }
}

// ── SamplerCfg ───────────────────────────────────────────────────────────────

impl From<&rover_config::Config> for SamplerCfg {
    fn from(c: &rover_config::Config) -> Self {
        Self {
            period_ms: c.sampler.period_ms,
            error_backoff_ms: c.sampler.error_backoff_ms,
            read_timeout_ms: c.hardware.echo_timeout_ms,
        }
    }
}

// ── ControlCfg ───────────────────────────────────────────────────────────────

impl From<&rover_config::Control> for ControlCfg {
    fn from(c: &rover_config::Control) -> Self {
        Self {
            full_scale: c.full_scale,
        }
    }
}

impl From<&rover_config::Config> for RoverCfg {
    fn from(c: &rover_config::Config) -> Self {
        Self {
            safety: (&c.safety).into(),
            sampler: c.into(),
            control: (&c.control).into(),
        }
    }
}
