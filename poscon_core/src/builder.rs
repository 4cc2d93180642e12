//! Type-state builder for `ControlLoop`.
//!
//! The builder enforces at compile time that a motor driver is provided
//! before `build()` is available. `try_build()` is always available for
//! dynamic checks.
use std::marker::PhantomData;

use crate::config::EngineCfg;
use crate::decimal::Decimal;
use crate::engine::{BoxedDriver, ControlLoop};
use crate::error::{BuildError, Result};
use crate::input::DestinationFormat;

pub struct Missing;
pub struct Set;

pub struct ControlLoopBuilder<D> {
    driver: Option<BoxedDriver>,
    cfg: EngineCfg,
    _d: PhantomData<D>,
}

impl Default for ControlLoopBuilder<Missing> {
    fn default() -> Self {
        Self {
            driver: None,
            cfg: EngineCfg::default(),
            _d: PhantomData,
        }
    }
}

impl<D> ControlLoopBuilder<D> {
    pub fn driver(self, driver: BoxedDriver) -> ControlLoopBuilder<Set> {
        ControlLoopBuilder {
            driver: Some(driver),
            cfg: self.cfg,
            _d: PhantomData,
        }
    }

    pub fn config(mut self, cfg: EngineCfg) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn pulses_per_revolution(mut self, ppr: u32) -> Self {
        self.cfg.pulses_per_revolution = ppr;
        self
    }

    pub fn output_limit(mut self, limit: i32) -> Self {
        self.cfg.controller.output_limit = limit;
        self
    }

    pub fn proportional_gain(mut self, gain: Decimal) -> Self {
        self.cfg.controller.proportional_gain = gain;
        self
    }

    pub fn integral_gain(mut self, gain: Decimal) -> Self {
        self.cfg.controller.integral_gain = gain;
        self
    }

    pub fn anti_windup(mut self, on: bool) -> Self {
        self.cfg.controller.anti_windup = on;
        self
    }

    /// Validate and build; errors are `BuildError`s wrapped in the report.
    pub fn try_build(self) -> Result<ControlLoop> {
        let driver = self.driver.ok_or(BuildError::MissingDriver)?;
        let cfg = self.cfg;
        if cfg.pulses_per_revolution == 0 {
            return Err(BuildError::InvalidConfig("pulses_per_revolution must be > 0").into());
        }
        if cfg.controller.output_limit < 0 {
            return Err(BuildError::InvalidConfig("output_limit must be >= 0").into());
        }
        if cfg.controller.history_len == 0 {
            return Err(BuildError::InvalidConfig("history_len must be >= 1").into());
        }
        let s = cfg.scales;
        if [s.internal, s.rpm, s.rotation, s.cycle_time, s.gain]
            .iter()
            .any(|&v| v > poscon_config::MAX_SCALE)
        {
            return Err(BuildError::InvalidConfig("scales must be <= 12 decimal places").into());
        }
        if cfg.scales.cycle_time == 0 {
            return Err(BuildError::InvalidConfig("cycle_time scale must be >= 1").into());
        }
        if cfg.telemetry_capacity == 0 {
            return Err(BuildError::InvalidConfig("telemetry_capacity must be >= 1").into());
        }
        if cfg.speed_jitter_rpm.is_negative() {
            return Err(BuildError::InvalidConfig("speed_jitter_rpm must be >= 0").into());
        }
        let format = DestinationFormat::from_pattern(&cfg.destination_pattern)
            .map_err(|_| BuildError::InvalidConfig("destination_pattern is malformed"))?;
        tracing::debug!(
            ppr = cfg.pulses_per_revolution,
            limit = cfg.controller.output_limit,
            kp = %cfg.controller.proportional_gain,
            ki = %cfg.controller.integral_gain,
            anti_windup = cfg.controller.anti_windup,
            "control loop configured"
        );
        Ok(ControlLoop::new(cfg, format, driver))
    }
}

impl ControlLoopBuilder<Set> {
    pub fn build(self) -> Result<ControlLoop> {
        self.try_build()
    }
}
