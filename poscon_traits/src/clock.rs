use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Monotonic time source for reference ticks and backend pacing.
///
/// - now(): current monotonic Instant
/// - sleep(): wait for the given duration (implementations may simulate)
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Time elapsed since `epoch`, saturating at zero.
    fn since(&self, epoch: Instant) -> Duration {
        self.now().saturating_duration_since(epoch)
    }
}

/// Real-time clock backed by `std::time::Instant`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

/// Deterministic clock whose time only moves when told to.
///
/// now() = origin + offset; sleep(d) advances the offset by d without
/// blocking. Clones share the same offset.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Advance the clock by `d`.
    pub fn advance(&self, d: Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off = off.saturating_add(d);
        }
    }

    /// The instant at `d` past this clock's origin.
    pub fn at(&self, d: Duration) -> Instant {
        self.origin + d
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let off = self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO);
        self.origin + off
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_only_when_advanced() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        assert_eq!(clock.now(), t0);
        clock.sleep(Duration::from_millis(100));
        assert_eq!(clock.since(t0), Duration::from_millis(100));
    }

    #[test]
    fn clones_share_time() {
        let a = ManualClock::new();
        let b = a.clone();
        a.advance(Duration::from_secs(1));
        assert_eq!(b.now(), a.at(Duration::from_secs(1)));
    }
}
