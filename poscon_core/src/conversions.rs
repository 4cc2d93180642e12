//! `From` implementations bridging `poscon_config` types to `poscon_core` types.

use crate::config::{ControllerCfg, EngineCfg, IntegralSaturation, ScaleCfg};
use crate::decimal::Decimal;

/// Config values are validated finite; anything else becomes zero.
fn decimal(v: f64, scale: u32) -> Decimal {
    Decimal::from_f64(v, scale).unwrap_or(Decimal::zero(scale))
}

// ── IntegralSaturation ───────────────────────────────────────────────────────

impl From<poscon_config::IntegralSaturation> for IntegralSaturation {
    fn from(p: poscon_config::IntegralSaturation) -> Self {
        match p {
            poscon_config::IntegralSaturation::Freeze => IntegralSaturation::Freeze,
            poscon_config::IntegralSaturation::Integrate => IntegralSaturation::Integrate,
        }
    }
}

// ── ScaleCfg ─────────────────────────────────────────────────────────────────

impl From<&poscon_config::Scales> for ScaleCfg {
    fn from(s: &poscon_config::Scales) -> Self {
        Self {
            internal: s.internal,
            rpm: s.rpm,
            rotation: s.rotation,
            cycle_time: s.cycle_time,
            gain: s.gain,
        }
    }
}

// ── EngineCfg ────────────────────────────────────────────────────────────────

impl From<&poscon_config::Config> for EngineCfg {
    fn from(c: &poscon_config::Config) -> Self {
        let scales = ScaleCfg::from(&c.scales);
        let ctl = &c.controller;
        Self {
            pulses_per_revolution: c.encoder.pulses_per_revolution,
            scales,
            controller: ControllerCfg {
                output_limit: i32::try_from(ctl.output_limit).unwrap_or(i32::MAX),
                proportional_gain: decimal(ctl.proportional_gain, scales.gain),
                integral_gain: decimal(ctl.integral_gain, scales.gain),
                anti_windup: ctl.anti_windup,
                integral_saturation: ctl.integral_saturation.into(),
                history_len: ctl.history_len,
            },
            speed_jitter_rpm: decimal(ctl.speed_jitter_rpm, scales.internal),
            destination_pattern: c.input.destination_pattern.clone(),
            telemetry_capacity: c.telemetry.channel_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_defaults() {
        let cfg = poscon_config::Config::default();
        let e = EngineCfg::from(&cfg);
        let d = EngineCfg::default();
        assert_eq!(e.pulses_per_revolution, d.pulses_per_revolution);
        assert_eq!(e.scales, d.scales);
        assert_eq!(e.controller.output_limit, d.controller.output_limit);
        assert_eq!(e.speed_jitter_rpm, d.speed_jitter_rpm);
        assert_eq!(e.destination_pattern, d.destination_pattern);
    }

    #[test]
    fn gains_land_on_gain_scale() {
        let mut cfg = poscon_config::Config::default();
        cfg.controller.proportional_gain = 0.5;
        cfg.controller.integral_gain = 0.00015;
        let e = EngineCfg::from(&cfg);
        assert_eq!(e.controller.proportional_gain.to_string(), "0.5000");
        assert_eq!(e.controller.integral_gain.to_string(), "0.0002");
    }
}
