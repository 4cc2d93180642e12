//! Runtime configuration for the control-loop engine.
//!
//! These are the structs `ControlLoop` is built from. They are separate from
//! the TOML-deserialized config in `poscon_config`; see `conversions`.
use crate::decimal::Decimal;

/// Decimal places used for each derived quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleCfg {
    /// Intermediate quotients (rate, 60/ppr).
    pub internal: u32,
    pub rpm: u32,
    pub rotation: u32,
    pub cycle_time: u32,
    /// Proportional and integral gains are normalised to this scale.
    pub gain: u32,
}

impl Default for ScaleCfg {
    fn default() -> Self {
        Self {
            internal: 6,
            rpm: 3,
            rotation: 3,
            cycle_time: 3,
            gain: 4,
        }
    }
}

/// What the anti-windup rule does when only the P+I sum saturates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IntegralSaturation {
    /// The accumulator is left untouched while the output is clamped.
    #[default]
    Freeze,
    /// The accumulator still admits the error; only P saturation freezes it.
    Integrate,
}

#[derive(Debug, Clone)]
pub struct ControllerCfg {
    /// Command range is `-output_limit..=output_limit`.
    pub output_limit: i32,
    pub proportional_gain: Decimal,
    pub integral_gain: Decimal,
    pub anti_windup: bool,
    pub integral_saturation: IntegralSaturation,
    /// Capacity of the error history ring.
    pub history_len: usize,
}

impl Default for ControllerCfg {
    fn default() -> Self {
        Self {
            output_limit: 15,
            proportional_gain: Decimal::zero(4),
            integral_gain: Decimal::zero(4),
            anti_windup: true,
            integral_saturation: IntegralSaturation::Freeze,
            history_len: 3,
        }
    }
}

/// Everything the engine needs at construction.
#[derive(Debug, Clone)]
pub struct EngineCfg {
    pub pulses_per_revolution: u32,
    pub scales: ScaleCfg,
    pub controller: ControllerCfg,
    /// Speeds with a smaller magnitude are reported as exactly zero.
    pub speed_jitter_rpm: Decimal,
    /// Pattern for operator destination input, e.g. `#0.000`.
    pub destination_pattern: String,
    /// Per-subscriber telemetry queue depth.
    pub telemetry_capacity: usize,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            pulses_per_revolution: 400,
            scales: ScaleCfg::default(),
            controller: ControllerCfg::default(),
            speed_jitter_rpm: Decimal::new(1, 2),
            destination_pattern: "#0.000".to_string(),
            telemetry_capacity: 64,
        }
    }
}
