//! Destination input in the `#0.000` pattern style.
//!
//! The pattern fixes the minimum number of integer digits (count of `0`s
//! before the point) and the number of fraction digits. Operator text may
//! use `,` or `.` as decimal separator; values are rounded half-even to the
//! pattern's fraction digits.
use crate::decimal::{Decimal, Rounding};
use crate::error::ControlError;

/// Largest destination magnitude accepted from the operator.
pub const MAX_REVOLUTIONS: i128 = 1_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestinationFormat {
    min_int_digits: usize,
    frac_digits: u32,
}

impl Default for DestinationFormat {
    fn default() -> Self {
        Self {
            min_int_digits: 1,
            frac_digits: 3,
        }
    }
}

impl DestinationFormat {
    pub fn from_pattern(pattern: &str) -> Result<Self, ControlError> {
        let (min_int_digits, frac_digits) = poscon_config::parse_destination_pattern(pattern)
            .ok_or_else(|| ControlError::Config(format!("invalid destination pattern {pattern:?}")))?;
        Ok(Self {
            min_int_digits,
            frac_digits,
        })
    }

    pub fn frac_digits(&self) -> u32 {
        self.frac_digits
    }

    /// Round a value to the pattern's precision.
    pub fn normalise(&self, value: Decimal) -> Decimal {
        value.with_scale(self.frac_digits, Rounding::HalfEven)
    }

    pub fn parse(&self, text: &str) -> Result<Decimal, ControlError> {
        let value = text
            .parse::<Decimal>()
            .map(|d| self.normalise(d))
            .map_err(|e| ControlError::Input(format!("destination {text:?}: {e}")))?;
        if value.abs() > Decimal::new(MAX_REVOLUTIONS, 0) {
            return Err(ControlError::Input(format!(
                "destination {text:?} is out of range"
            )));
        }
        Ok(value)
    }

    pub fn format(&self, value: Decimal) -> String {
        let s = self.normalise(value).to_string();
        let (sign, body) = match s.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", s.as_str()),
        };
        let int_len = body.find('.').unwrap_or(body.len());
        let pad = self.min_int_digits.saturating_sub(int_len);
        format!("{sign}{}{body}", "0".repeat(pad))
    }
}

/// Revolutions to whole pulses, truncated toward zero. `None` when the
/// position does not fit the pulse counter.
pub fn to_pulses(revolutions: Decimal, pulses_per_revolution: u32) -> Option<i64> {
    let p = revolutions.mul_int(i64::from(pulses_per_revolution)).trunc();
    i64::try_from(p).ok()
}
