//! Fixed-scale decimal arithmetic for physical quantities.
//!
//! A `Decimal` is an `i128` count of `10^-scale` units. Every operation that
//! can lose digits takes an explicit scale and rounding mode, so long-running
//! accumulations never drift the way binary floating point would. All
//! arithmetic saturates instead of overflowing.

use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// How to resolve digits dropped by a rescale or division.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Ties away from zero.
    HalfUp,
    /// Ties to the even neighbour.
    HalfEven,
}

#[derive(Debug, Clone, Copy)]
pub struct Decimal {
    units: i128,
    scale: u32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseDecimalError {
    #[error("empty number")]
    Empty,
    #[error("invalid character {0:?} in number")]
    InvalidChar(char),
    #[error("more than one decimal separator")]
    MultipleSeparators,
    #[error("number has too many digits")]
    TooLong,
}

/// Largest power of ten representable in `i128` is 10^38.
const MAX_POW: u32 = 38;

#[inline]
fn pow10(n: u32) -> i128 {
    10i128.pow(n.min(MAX_POW))
}

/// Divide `n` by `d` (non-zero), rounding the discarded remainder.
fn div_round(n: i128, d: i128, mode: Rounding) -> i128 {
    let q = n / d;
    let r = n % d;
    if r == 0 {
        return q;
    }
    let r_abs = r.unsigned_abs();
    let d_abs = d.unsigned_abs();
    let rest = d_abs - r_abs;
    let away = match r_abs.cmp(&rest) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => match mode {
            Rounding::HalfUp => true,
            Rounding::HalfEven => q % 2 != 0,
        },
    };
    if !away {
        return q;
    }
    if (n < 0) != (d < 0) {
        q.saturating_sub(1)
    } else {
        q.saturating_add(1)
    }
}

impl Decimal {
    pub const ZERO: Decimal = Decimal { units: 0, scale: 0 };

    #[inline]
    pub const fn new(units: i128, scale: u32) -> Self {
        Self { units, scale }
    }

    #[inline]
    pub const fn zero(scale: u32) -> Self {
        Self { units: 0, scale }
    }

    #[inline]
    pub fn from_int(v: i64) -> Self {
        Self::new(i128::from(v), 0)
    }

    #[inline]
    pub fn units(self) -> i128 {
        self.units
    }

    #[inline]
    pub fn scale(self) -> u32 {
        self.scale
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.units == 0
    }

    #[inline]
    pub fn abs(self) -> Self {
        Self::new(self.units.saturating_abs(), self.scale)
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.units < 0
    }

    /// Change the number of decimal places, rounding when digits are dropped.
    pub fn with_scale(self, scale: u32, mode: Rounding) -> Self {
        match scale.cmp(&self.scale) {
            Ordering::Equal => self,
            Ordering::Greater => {
                Self::new(self.units.saturating_mul(pow10(scale - self.scale)), scale)
            }
            Ordering::Less => {
                let drop = self.scale - scale;
                if drop > MAX_POW {
                    return Self::zero(scale);
                }
                Self::new(div_round(self.units, pow10(drop), mode), scale)
            }
        }
    }

    /// Exact product; the scale is the sum of both scales.
    #[inline]
    pub fn mul(self, other: Decimal) -> Self {
        Self::new(
            self.units.saturating_mul(other.units),
            self.scale.saturating_add(other.scale),
        )
    }

    /// Exact product with an integer.
    #[inline]
    pub fn mul_int(self, v: i64) -> Self {
        Self::new(self.units.saturating_mul(i128::from(v)), self.scale)
    }

    /// `num / den` at `scale` decimal places; `None` when `den` is zero.
    pub fn div(num: Decimal, den: Decimal, scale: u32, mode: Rounding) -> Option<Self> {
        if den.units == 0 {
            return None;
        }
        let e = i64::from(scale) + i64::from(den.scale) - i64::from(num.scale);
        let (n, d) = if e >= 0 {
            (num.units.saturating_mul(pow10(e as u32)), den.units)
        } else {
            (num.units, den.units.saturating_mul(pow10((-e) as u32)))
        };
        Some(Self::new(div_round(n, d, mode), scale))
    }

    /// Integer part, truncated toward zero.
    #[inline]
    pub fn trunc(self) -> i128 {
        self.units / pow10(self.scale)
    }

    /// Seconds of `d` at `scale` places, ties rounded away from zero.
    pub fn from_duration(d: Duration, scale: u32) -> Self {
        let nanos = i128::try_from(d.as_nanos()).unwrap_or(i128::MAX);
        Self::new(nanos, 9).with_scale(scale, Rounding::HalfUp)
    }

    /// Exact decimal form of a finite `f64` rounded to `scale` places.
    ///
    /// Goes through the shortest round-trip string so `0.1` becomes exactly
    /// `0.1`, not the nearest binary fraction.
    pub fn from_f64(v: f64, scale: u32) -> Option<Self> {
        if !v.is_finite() {
            return None;
        }
        format!("{v}")
            .parse::<Decimal>()
            .ok()
            .map(|d| d.with_scale(scale, Rounding::HalfUp))
    }

    /// Compare values regardless of scale.
    fn aligned(self, other: Decimal) -> (i128, i128) {
        let s = self.scale.max(other.scale);
        (
            self.with_scale(s, Rounding::HalfUp).units,
            other.with_scale(s, Rounding::HalfUp).units,
        )
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = self.aligned(*other);
        a == b
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = self.aligned(*other);
        a.cmp(&b)
    }
}

impl Default for Decimal {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.units < 0 { "-" } else { "" };
        let abs = self.units.unsigned_abs();
        if self.scale == 0 {
            return write!(f, "{sign}{abs}");
        }
        let p = pow10(self.scale).unsigned_abs();
        let width = self.scale as usize;
        write!(f, "{sign}{}.{:0width$}", abs / p, abs % p)
    }
}

/// Accepts an optional sign, digits, and one `.` or `,` decimal separator.
impl std::str::FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (neg, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        if body.is_empty() {
            return Err(ParseDecimalError::Empty);
        }
        let mut units: i128 = 0;
        let mut scale: u32 = 0;
        let mut seen_sep = false;
        let mut digits = 0usize;
        for c in body.chars() {
            match c {
                '0'..='9' => {
                    digits += 1;
                    if digits > MAX_POW as usize {
                        return Err(ParseDecimalError::TooLong);
                    }
                    units = units * 10 + i128::from(c as u8 - b'0');
                    if seen_sep {
                        scale += 1;
                    }
                }
                '.' | ',' if !seen_sep => seen_sep = true,
                '.' | ',' => return Err(ParseDecimalError::MultipleSeparators),
                other => return Err(ParseDecimalError::InvalidChar(other)),
            }
        }
        if digits == 0 {
            return Err(ParseDecimalError::Empty);
        }
        Ok(Self::new(if neg { -units } else { units }, scale))
    }
}
