#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the position controller.
//!
//! Every section is optional and falls back to the bench setup the loop was
//! tuned on (400 ppr encoder, DRV8830 at 0x60, limit 15). `Config::validate`
//! rejects values the engine cannot work with.
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Pins {
    /// Reference clock input (NE555 output), BCM numbering
    pub reference: u8,
    /// Encoder channel A: edge-triggered
    pub encoder_a: u8,
    /// Encoder channel B: level-read on A's rising edge
    pub encoder_b: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            reference: 17,
            encoder_a: 27,
            encoder_b: 22,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Bus {
    pub i2c_bus: u8,
    pub driver_address: u16,
}

impl Default for Bus {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            driver_address: 0x60,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Encoder {
    pub pulses_per_revolution: u32,
}

impl Default for Encoder {
    fn default() -> Self {
        Self {
            pulses_per_revolution: 400,
        }
    }
}

/// What the anti-windup rule does when only the P+I sum saturates.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntegralSaturation {
    /// Skip accumulation whenever the output is clamped
    #[default]
    Freeze,
    /// Keep accumulating unless the P term alone saturates
    Integrate,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Controller {
    /// Symmetric bound on the drive command
    pub output_limit: u32,
    pub proportional_gain: f64,
    pub integral_gain: f64,
    pub anti_windup: bool,
    pub integral_saturation: IntegralSaturation,
    /// Number of recent errors kept for diagnostics
    pub history_len: usize,
    /// |rpm| below this is reported as zero
    pub speed_jitter_rpm: f64,
}

impl Default for Controller {
    fn default() -> Self {
        Self {
            output_limit: 15,
            proportional_gain: 0.0,
            integral_gain: 0.0,
            anti_windup: true,
            integral_saturation: IntegralSaturation::Freeze,
            history_len: 3,
            speed_jitter_rpm: 0.01,
        }
    }
}

/// Decimal places used for each derived quantity.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Scales {
    pub internal: u32,
    pub rpm: u32,
    pub rotation: u32,
    pub cycle_time: u32,
    pub gain: u32,
}

impl Default for Scales {
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Input {
    /// Display/input pattern for the destination field, e.g. "#0.000"
    pub destination_pattern: String,
}

impl Default for Input {
    fn default() -> Self {
        Self {
            destination_pattern: "#0.000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Telemetry {
    /// Per-subscriber queue depth; a full queue drops publications
    pub channel_capacity: usize,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Simulation {
    /// Software reference clock period (ms)
    pub reference_period_ms: u64,
    /// Plant speed: encoder pulses per second per unit of drive
    pub pulses_per_sec_per_unit: u32,
    /// Plant integration step (ms)
    pub step_ms: u64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            reference_period_ms: 100,
            pulses_per_sec_per_unit: 40,
            step_ms: 1,
        }
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
    pub bus: Bus,
    pub encoder: Encoder,
    pub controller: Controller,
    pub scales: Scales,
    pub input: Input,
    pub telemetry: Telemetry,
    pub simulation: Simulation,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Largest decimal scale the engine accepts for any quantity.
pub const MAX_SCALE: u32 = 12;

/// Parse a `#0.000`-style pattern: optional `#`s, at least one `0`, then an
/// optional `.` followed only by `0`s, at most `MAX_SCALE` of them. Returns
/// the minimum integer digits and the fraction digits.
pub fn parse_destination_pattern(p: &str) -> Option<(usize, u32)> {
    let (int, frac) = match p.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (p, None),
    };
    let zeros = int.trim_start_matches('#');
    if zeros.is_empty() || !zeros.chars().all(|c| c == '0') {
        return None;
    }
    let frac_digits = match frac {
        None => 0,
        Some(f) if !f.is_empty() && f.chars().all(|c| c == '0') => u32::try_from(f.len()).ok()?,
        Some(_) => return None,
    };
    if frac_digits > MAX_SCALE {
        return None;
    }
    Some((zeros.len(), frac_digits))
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Encoder
        if self.encoder.pulses_per_revolution == 0 {
            eyre::bail!("encoder.pulses_per_revolution must be > 0");
        }

        // Controller
        if self.controller.output_limit > i32::MAX as u32 {
            eyre::bail!("controller.output_limit must fit a signed 32-bit command");
        }
        for (name, g) in [
            ("controller.proportional_gain", self.controller.proportional_gain),
            ("controller.integral_gain", self.controller.integral_gain),
        ] {
            if !g.is_finite() {
                eyre::bail!("{name} must be finite");
            }
            if g.abs() > 1.0e6 {
                eyre::bail!("{name} is unreasonably large (>1e6)");
            }
        }
        if self.controller.history_len == 0 {
            eyre::bail!("controller.history_len must be >= 1");
        }
        if self.controller.history_len > 1024 {
            eyre::bail!("controller.history_len is unreasonably large (>1024)");
        }
        if !self.controller.speed_jitter_rpm.is_finite() || self.controller.speed_jitter_rpm < 0.0
        {
            eyre::bail!("controller.speed_jitter_rpm must be >= 0");
        }

        // Scales
        for (name, s) in [
            ("scales.internal", self.scales.internal),
            ("scales.rpm", self.scales.rpm),
            ("scales.rotation", self.scales.rotation),
            ("scales.cycle_time", self.scales.cycle_time),
            ("scales.gain", self.scales.gain),
        ] {
            if s > MAX_SCALE {
                eyre::bail!("{name} must be <= {MAX_SCALE}");
            }
        }
        if self.scales.cycle_time == 0 {
            eyre::bail!("scales.cycle_time must be >= 1");
        }

        // Input
        if parse_destination_pattern(&self.input.destination_pattern).is_none() {
            eyre::bail!(
                "input.destination_pattern must look like \"#0.000\", got {:?}",
                self.input.destination_pattern
            );
        }

        // Telemetry
        if self.telemetry.channel_capacity == 0 {
            eyre::bail!("telemetry.channel_capacity must be >= 1");
        }

        // Simulation
        if self.simulation.reference_period_ms == 0 {
            eyre::bail!("simulation.reference_period_ms must be >= 1");
        }
        if self.simulation.step_ms == 0 {
            eyre::bail!("simulation.step_ms must be >= 1");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
