#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Closed-loop position control for a DC motor (hardware-agnostic).
//!
//! All hardware interaction goes through `poscon_traits::MotorDriver` and
//! `poscon_traits::EdgeSource`.
//!
//! ## Architecture
//!
//! - **Decoding**: quadrature edges to a signed pulse count (`pulse`)
//! - **Sampling**: cycle time, rotation and speed per reference tick (`sampler`)
//! - **Control**: PI with anti-windup and a bounded output (`controller`)
//! - **Run states**: Reset / Running / Stopped / Shutdown (`state`)
//! - **Orchestration**: event dispatch and driver I/O (`engine`)
//! - **Observers**: per-cycle snapshots and operator changes (`telemetry`)
//!
//! ## Fixed-Point Arithmetic
//!
//! Pulse counts are integers; every other physical quantity is a
//! `decimal::Decimal` at a configured scale (see `config::ScaleCfg`).

pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod decimal;
pub mod engine;
pub mod error;
pub mod history;
pub mod hw_error;
pub mod input;
pub mod mocks;
pub mod pulse;
pub mod sampler;
pub mod state;
pub mod telemetry;

pub use builder::ControlLoopBuilder;
pub use config::{ControllerCfg, EngineCfg, IntegralSaturation, ScaleCfg};
pub use controller::{Limiting, PositionController};
pub use decimal::{Decimal, Rounding};
pub use engine::{ControlLoop, ControllerStatus, Event, OperatorCommand};
pub use error::{BuildError, ControlError, Result};
pub use history::ErrorHistory;
pub use input::DestinationFormat;
pub use pulse::PulseCounter;
pub use sampler::{CycleSample, CycleSampler};
pub use state::{RunState, RunStateMachine};
pub use telemetry::{KinematicSnapshot, Publication, Telemetry};
