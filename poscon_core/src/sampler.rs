//! Per-tick timing and kinematics.
//!
//! Each reference tick measures the time since the previous tick and the
//! pulse delta over that interval, then derives rotation and speed as
//! fixed-scale decimals. The first tick after construction or `reset()` has
//! no previous timestamp: its elapsed time is zero and no rate is computed.
use std::time::{Duration, Instant};

use crate::config::ScaleCfg;
use crate::decimal::{Decimal, Rounding};

/// Timing and kinematics of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSample {
    pub elapsed: Duration,
    /// `elapsed` in seconds at the cycle-time scale.
    pub seconds: Decimal,
    /// Pulses since the previous tick.
    pub delta: i64,
    /// Revolutions since reset.
    pub rotation: Decimal,
    pub rpm: Decimal,
}

#[derive(Debug, Clone)]
pub struct CycleSampler {
    ppr: i64,
    scales: ScaleCfg,
    jitter: Decimal,
    /// round_half_up(60 / ppr) at the internal scale.
    rpm_factor: Decimal,
    previous: Option<Instant>,
    /// phi at the previous tick.
    last_phi: i64,
}

impl CycleSampler {
    /// `pulses_per_revolution` must be non-zero; the builder checks it.
    pub fn new(pulses_per_revolution: u32, scales: ScaleCfg, jitter: Decimal) -> Self {
        let ppr = i64::from(pulses_per_revolution.max(1));
        let rpm_factor = Decimal::div(
            Decimal::from_int(60),
            Decimal::from_int(ppr),
            scales.internal,
            Rounding::HalfUp,
        )
        .unwrap_or(Decimal::zero(scales.internal));
        Self {
            ppr,
            scales,
            jitter,
            rpm_factor,
            previous: None,
            last_phi: 0,
        }
    }

    pub fn on_tick(&mut self, now: Instant, phi: i64) -> CycleSample {
        let elapsed = match self.previous {
            Some(prev) => now.saturating_duration_since(prev),
            None => Duration::ZERO,
        };
        self.previous = Some(now);

        let seconds = self.seconds(elapsed);
        let delta = phi.saturating_sub(self.last_phi);
        self.last_phi = phi;

        let rotation = Decimal::div(
            Decimal::from_int(phi),
            Decimal::from_int(self.ppr),
            self.scales.rotation,
            Rounding::HalfUp,
        )
        .unwrap_or(Decimal::zero(self.scales.rotation));

        let sample = CycleSample {
            elapsed,
            seconds,
            delta,
            rotation,
            rpm: self.speed(delta, seconds),
        };
        tracing::trace!(
            phi,
            delta,
            seconds = %sample.seconds,
            rpm = %sample.rpm,
            "cycle sampled"
        );
        sample
    }

    /// Forget the previous tick and the delta history.
    pub fn reset(&mut self) {
        self.previous = None;
        self.last_phi = 0;
    }

    fn seconds(&self, elapsed: Duration) -> Decimal {
        let scale = self.scales.cycle_time;
        let s = Decimal::from_duration(elapsed, scale);
        if s < Decimal::new(1, scale) {
            Decimal::zero(scale)
        } else {
            s
        }
    }

    fn speed(&self, delta: i64, seconds: Decimal) -> Decimal {
        let scale = self.scales.rpm;
        let Some(rate) = Decimal::div(
            Decimal::from_int(delta),
            seconds,
            self.scales.internal,
            Rounding::HalfUp,
        ) else {
            return Decimal::zero(scale);
        };
        let rpm = rate
            .mul(self.rpm_factor)
            .with_scale(scale, Rounding::HalfUp);
        if rpm.abs() < self.jitter {
            Decimal::zero(scale)
        } else {
            rpm
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampler() -> CycleSampler {
        CycleSampler::new(400, ScaleCfg::default(), Decimal::new(1, 2))
    }

    #[test]
    fn first_tick_has_no_rate() {
        let mut s = sampler();
        let t0 = Instant::now();
        let out = s.on_tick(t0, 40);
        assert_eq!(out.elapsed, Duration::ZERO);
        assert!(out.seconds.is_zero());
        assert!(out.rpm.is_zero());
        assert_eq!(out.rotation.to_string(), "0.100");
    }

    #[test]
    fn forty_pulses_in_a_tenth_of_a_second_is_sixty_rpm() {
        let mut s = sampler();
        let t0 = Instant::now();
        s.on_tick(t0, 0);
        let out = s.on_tick(t0 + Duration::from_millis(100), 40);
        assert_eq!(out.seconds.to_string(), "0.100");
        assert_eq!(out.rotation.to_string(), "0.100");
        assert_eq!(out.rpm.to_string(), "60.000");
        assert_eq!(out.delta, 40);
    }

    #[test]
    fn sub_resolution_cycle_is_zero_seconds() {
        let mut s = sampler();
        let t0 = Instant::now();
        s.on_tick(t0, 0);
        let out = s.on_tick(t0 + Duration::from_micros(400), 3);
        assert!(out.seconds.is_zero());
        assert!(out.rpm.is_zero());
    }

    #[test]
    fn backwards_time_saturates() {
        let mut s = sampler();
        let t0 = Instant::now() + Duration::from_secs(1);
        s.on_tick(t0, 0);
        let out = s.on_tick(t0 - Duration::from_millis(5), 10);
        assert_eq!(out.elapsed, Duration::ZERO);
        assert!(out.rpm.is_zero());
    }

    #[test]
    fn slow_drift_is_reported_as_standstill() {
        // 1 pulse over 10 s = 0.015 rpm; with jitter 0.02 that is noise.
        let mut s = CycleSampler::new(400, ScaleCfg::default(), Decimal::new(2, 2));
        let t0 = Instant::now();
        s.on_tick(t0, 0);
        let out = s.on_tick(t0 + Duration::from_secs(10), 1);
        assert!(out.rpm.is_zero());
    }

    #[test]
    fn reverse_motion_is_negative() {
        let mut s = sampler();
        let t0 = Instant::now();
        s.on_tick(t0, 0);
        let out = s.on_tick(t0 + Duration::from_millis(100), -40);
        assert_eq!(out.rpm.to_string(), "-60.000");
        assert_eq!(out.rotation.to_string(), "-0.100");
    }

    #[test]
    fn reset_forgets_previous_tick() {
        let mut s = sampler();
        let t0 = Instant::now();
        s.on_tick(t0, 100);
        s.reset();
        let out = s.on_tick(t0 + Duration::from_millis(100), 0);
        assert_eq!(out.elapsed, Duration::ZERO);
        assert_eq!(out.delta, 0);
    }
}
