#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Collision-avoiding drive control (hardware-agnostic).
//!
//! All hardware goes through `rover_traits::{RangeSensor, Drive, Buzzer}`.
//!
//! ## Architecture
//!
//! - **Sampling**: `DistanceSampler` polls the ranger on its own thread and
//!   fires a proximity callback below the warn threshold (`sampler` module)
//! - **Policy**: pure `SafetyPolicy::decide` (`policy` module)
//! - **Lock discipline**: `CommandStore` guards the last command together with
//!   the actuators (`store` module)
//! - **Actuation**: `MotorController` (`motor` module)
//! - **Orchestration**: `ControlLoop` reacts to new commands and proximity
//!   events (`control` module); `Rover` wires everything for a host process

pub mod command;
pub mod config;
pub mod control;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod motor;
pub mod policy;
pub mod rover;
pub mod sampler;
pub mod store;

pub use command::{MotorCommand, UNKNOWN_DISTANCE_CM, display_distance};
pub use config::{ControlCfg, RoverCfg, SafetyCfg, SamplerCfg};
pub use control::ControlLoop;
pub use error::{Result, RoverError};
pub use motor::MotorController;
pub use policy::{Rule, SafetyDecision, SafetyPolicy};
pub use rover::{CommandReply, Rover, RoverStatus};
pub use sampler::{DistanceSampler, LatestDistance};
pub use store::CommandStore;
