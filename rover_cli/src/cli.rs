//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "rover", version, about = "Collision-avoiding rover drive")]
pub struct Cli {
    /// Path to config TOML; a missing file means built-in defaults
    #[arg(long, value_name = "FILE", default_value = "etc/rover.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Override safety.near_threshold_cm
    #[arg(long = "near-cm", value_name = "CM")]
    pub near_cm: Option<f64>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive from JSON-lines requests on stdin until EOF, shutdown or Ctrl-C
    Drive,
    /// Build the devices, take one distance reading and stop the actuators
    SelfCheck,
    /// Run the motors forward, stop, backward, stop (no obstacle checks)
    MotorTest {
        /// Duration of each phase in ms
        #[arg(long, value_name = "MS", default_value_t = 1000)]
        step_ms: u64,
    },
}
