//! PI position controller with anti-windup.
//!
//! `compute_command` turns a position error into a drive command bounded by
//! `±output_limit`. Both terms are truncated toward zero before they are
//! summed. With anti-windup on, the integral accumulator only admits the
//! error while the output stays inside the limit.
use crate::config::{ControllerCfg, IntegralSaturation};
use crate::decimal::{Decimal, Rounding};
use crate::history::ErrorHistory;

/// Which check clamped the last command, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limiting {
    /// The proportional term alone exceeded the limit.
    Proportional,
    /// P + I exceeded the limit.
    Sum,
}

#[derive(Debug, Clone)]
pub struct PositionController {
    proportional_gain: Decimal,
    integral_gain: Decimal,
    gain_scale: u32,
    anti_windup: bool,
    saturation: IntegralSaturation,
    limit: i64,
    history: ErrorHistory,
    accumulator: i64,
    last_output: i32,
    last_limiting: Option<Limiting>,
}

#[inline]
fn sign(x: i128) -> i128 {
    if x >= 0 { 1 } else { -1 }
}

impl PositionController {
    pub fn new(cfg: &ControllerCfg, gain_scale: u32) -> Self {
        Self {
            proportional_gain: cfg.proportional_gain.with_scale(gain_scale, Rounding::HalfUp),
            integral_gain: cfg.integral_gain.with_scale(gain_scale, Rounding::HalfUp),
            gain_scale,
            anti_windup: cfg.anti_windup,
            saturation: cfg.integral_saturation,
            limit: i64::from(cfg.output_limit.max(0)),
            history: ErrorHistory::new(cfg.history_len),
            accumulator: 0,
            last_output: 0,
            last_limiting: None,
        }
    }

    /// One controller evaluation. `seconds` is the cycle time; it is only
    /// logged, the control law is not time-weighted.
    pub fn compute_command(&mut self, seconds: Decimal, target: i64, measured: i64) -> i32 {
        let error = target.saturating_sub(measured);
        self.history.push(error);

        let p = self.proportional_gain.mul_int(error).trunc();
        let i = self
            .integral_gain
            .mul_int(error.saturating_add(self.accumulator))
            .trunc();
        let sum = p.saturating_add(i);
        let limit = i128::from(self.limit);

        let (command, admit, limiting) = if !self.anti_windup {
            let limiting = (sum.abs() > limit).then_some(Limiting::Sum);
            (sum.clamp(-limit, limit), true, limiting)
        } else if p.abs() > limit {
            (sign(p) * limit, false, Some(Limiting::Proportional))
        } else if sum.abs() > limit {
            let admit = self.saturation == IntegralSaturation::Integrate;
            (sign(sum) * limit, admit, Some(Limiting::Sum))
        } else {
            (sum, true, None)
        };

        if admit {
            self.accumulator = self.accumulator.saturating_add(error);
        }
        // |command| <= limit <= i32::MAX
        let command = i32::try_from(command).unwrap_or(0);
        self.last_output = command;
        self.last_limiting = limiting;

        tracing::debug!(
            target,
            measured,
            seconds = %seconds,
            error,
            p = %p,
            i = %i,
            command,
            accumulator = self.accumulator,
            limited_by = ?limiting,
            "controller evaluation"
        );
        command
    }

    /// Zero the error history, the accumulator and the last output.
    pub fn reset(&mut self) {
        self.history.clear();
        self.accumulator = 0;
        self.last_output = 0;
        self.last_limiting = None;
    }

    /// Set kp, normalised to the gain scale. Returns the stored value.
    pub fn set_proportional_gain(&mut self, gain: Decimal) -> Decimal {
        self.proportional_gain = gain.with_scale(self.gain_scale, Rounding::HalfUp);
        self.proportional_gain
    }

    /// Set ki, normalised to the gain scale. Returns the stored value.
    pub fn set_integral_gain(&mut self, gain: Decimal) -> Decimal {
        self.integral_gain = gain.with_scale(self.gain_scale, Rounding::HalfUp);
        self.integral_gain
    }

    pub fn set_anti_windup(&mut self, on: bool) {
        self.anti_windup = on;
    }

    pub fn proportional_gain(&self) -> Decimal {
        self.proportional_gain
    }

    pub fn integral_gain(&self) -> Decimal {
        self.integral_gain
    }

    pub fn anti_windup(&self) -> bool {
        self.anti_windup
    }

    pub fn output_limit(&self) -> i64 {
        self.limit
    }

    pub fn accumulator(&self) -> i64 {
        self.accumulator
    }

    pub fn last_output(&self) -> i32 {
        self.last_output
    }

    pub fn last_limiting(&self) -> Option<Limiting> {
        self.last_limiting
    }

    pub fn history(&self) -> &ErrorHistory {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gain(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn controller(kp: &str, ki: &str, anti_windup: bool) -> PositionController {
        let cfg = ControllerCfg {
            proportional_gain: gain(kp),
            integral_gain: gain(ki),
            anti_windup,
            ..ControllerCfg::default()
        };
        PositionController::new(&cfg, 4)
    }

    #[test]
    fn gains_are_normalised_to_gain_scale() {
        let mut c = controller("0.5", "0", true);
        assert_eq!(c.proportional_gain().to_string(), "0.5000");
        assert_eq!(c.set_integral_gain(gain("0.00005")).to_string(), "0.0001");
    }

    #[test]
    fn terms_truncate_toward_zero_before_summing() {
        // p = 0.9 * 1 = 0.9 -> 0, i = 0.9 * (1 + 0) = 0.9 -> 0
        let mut c = controller("0.9", "0.9", true);
        assert_eq!(c.compute_command(Decimal::ZERO, 1, 0), 0);
        // p = -1.8 -> -1, i = 0.9 * (-2 + 1) = -0.9 -> 0
        assert_eq!(c.compute_command(Decimal::ZERO, 0, 2), -1);
    }

    #[test]
    fn proportional_saturation_freezes_accumulator() {
        let mut c = controller("0.5", "0.1", true);
        assert_eq!(c.compute_command(Decimal::ZERO, 400, 0), 15);
        assert_eq!(c.accumulator(), 0);
        assert_eq!(c.last_limiting(), Some(Limiting::Proportional));
        assert_eq!(c.compute_command(Decimal::ZERO, -400, 0), -15);
        assert_eq!(c.accumulator(), 0);
    }

    #[test]
    fn sum_saturation_follows_policy() {
        // p = 0.5 * 20 = 10, i = 1 * 20 = 20 -> sum 30 > 15
        let mut frozen = controller("0.5", "1", true);
        assert_eq!(frozen.compute_command(Decimal::ZERO, 20, 0), 15);
        assert_eq!(frozen.accumulator(), 0);
        assert_eq!(frozen.last_limiting(), Some(Limiting::Sum));

        let cfg = ControllerCfg {
            proportional_gain: gain("0.5"),
            integral_gain: gain("1"),
            integral_saturation: IntegralSaturation::Integrate,
            ..ControllerCfg::default()
        };
        let mut integrating = PositionController::new(&cfg, 4);
        assert_eq!(integrating.compute_command(Decimal::ZERO, 20, 0), 15);
        assert_eq!(integrating.accumulator(), 20);
    }

    #[test]
    fn without_anti_windup_accumulator_always_moves() {
        let mut c = controller("1", "1", false);
        assert_eq!(c.compute_command(Decimal::ZERO, 100, 0), 15);
        assert_eq!(c.accumulator(), 100);
        // Overshoot: p = -30 but the wound-up integral still pushes forward.
        assert_eq!(c.compute_command(Decimal::ZERO, 0, 30), 15);
        assert_eq!(c.accumulator(), 70);
    }

    #[test]
    fn zero_is_a_positive_sign() {
        assert_eq!(sign(0), 1);
        assert_eq!(sign(-3), -1);
    }

    #[test]
    fn reset_clears_everything_but_gains() {
        let mut c = controller("0.01", "0.01", true);
        c.compute_command(Decimal::ZERO, 50, 0);
        c.compute_command(Decimal::ZERO, 60, 0);
        assert_eq!(c.accumulator(), 110);
        c.reset();
        assert_eq!(c.accumulator(), 0);
        assert_eq!(c.last_output(), 0);
        assert_eq!(c.history().to_vec(), vec![0, 0, 0]);
        assert_eq!(c.proportional_gain().to_string(), "0.0100");
    }

    #[test]
    fn history_records_errors_newest_first() {
        let mut c = controller("0", "0", true);
        for measured in [1, 2, 3, 4] {
            c.compute_command(Decimal::ZERO, 10, measured);
        }
        assert_eq!(c.history().to_vec(), vec![6, 7, 8]);
    }
}
