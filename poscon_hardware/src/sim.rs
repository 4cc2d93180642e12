//! Simulation backends: a motor driver that records commands and an edge
//! source that turns the commanded drive into encoder pulses.
//!
//! Each registered callback gets its own thread, shut down by `release()` or
//! on drop.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use poscon_traits::{BoxError, Clock, EdgeSource, LeadingEdgeFn, MotorDriver, ReferenceEdgeFn};

use crate::error::HwError;

const MICRO: i64 = 1_000_000;

/// State shared between a `SimulatedDriver` and whoever observes it.
#[derive(Debug, Default)]
pub struct SimShared {
    command: AtomicI32,
    fault: AtomicU8,
    fail_calls: AtomicUsize,
    brakes: AtomicUsize,
    drives: AtomicUsize,
    released: AtomicBool,
}

impl SimShared {
    /// Last command applied to the bridge (0 after brake).
    pub fn command(&self) -> i32 {
        self.command.load(Ordering::Relaxed)
    }
    /// Fault code the driver will report until changed.
    pub fn set_fault(&self, code: u8) {
        self.fault.store(code, Ordering::Relaxed);
    }
    /// Make the next `n` driver calls fail with a bus error.
    pub fn fail_next(&self, n: usize) {
        self.fail_calls.store(n, Ordering::Relaxed);
    }
    pub fn drive_count(&self) -> usize {
        self.drives.load(Ordering::Relaxed)
    }
    pub fn brake_count(&self) -> usize {
        self.brakes.load(Ordering::Relaxed)
    }
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Relaxed)
    }

    fn take_failure(&self) -> bool {
        self.fail_calls
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Motor driver that records commands instead of writing to a bus.
#[derive(Debug, Default)]
pub struct SimulatedDriver {
    shared: Arc<SimShared>,
}

impl SimulatedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(&self) -> Arc<SimShared> {
        self.shared.clone()
    }
}

impl MotorDriver for SimulatedDriver {
    fn drive(&mut self, command: i32) -> Result<(), BoxError> {
        if self.shared.take_failure() {
            return Err(Box::new(HwError::SimulatedBus));
        }
        self.shared.command.store(command, Ordering::Relaxed);
        self.shared.drives.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(command, "simulated drive");
        Ok(())
    }

    fn brake(&mut self) -> Result<(), BoxError> {
        if self.shared.take_failure() {
            return Err(Box::new(HwError::SimulatedBus));
        }
        self.shared.command.store(0, Ordering::Relaxed);
        self.shared.brakes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn fault(&mut self) -> Result<u8, BoxError> {
        if self.shared.take_failure() {
            return Err(Box::new(HwError::SimulatedBus));
        }
        Ok(self.shared.fault.load(Ordering::Relaxed))
    }

    fn release(&mut self) -> Result<(), BoxError> {
        self.shared.command.store(0, Ordering::Relaxed);
        self.shared.released.store(true, Ordering::Relaxed);
        Ok(())
    }
}

/// Timing of the simulated plant.
#[derive(Debug, Clone, Copy)]
pub struct SimParams {
    /// Reference clock period (the NE555 stand-in).
    pub reference_period: Duration,
    /// Encoder pulses per second produced by one unit of drive command.
    pub pulses_per_sec_per_unit: u32,
    /// Integration step of the plant thread.
    pub step: Duration,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            reference_period: Duration::from_millis(100),
            pulses_per_sec_per_unit: 40,
            step: Duration::from_millis(1),
        }
    }
}

/// Edge source driven by the command stored in a `SimShared`.
pub struct SimulatedEncoder<C: Clock + Clone + Send + 'static> {
    shared: Arc<SimShared>,
    params: SimParams,
    clock: C,
    shutdown: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl<C: Clock + Clone + Send + 'static> SimulatedEncoder<C> {
    pub fn new(shared: Arc<SimShared>, params: SimParams, clock: C) -> Self {
        Self {
            shared,
            params,
            clock,
            shutdown: Arc::new(AtomicBool::new(false)),
            threads: Vec::new(),
        }
    }

    fn join_all(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        let me = std::thread::current().id();
        for handle in self.threads.drain(..) {
            // Dropped from inside a callback: detach, the flag stops the loop.
            if handle.thread().id() == me {
                continue;
            }
            if let Err(e) = handle.join() {
                tracing::warn!(?e, "simulation thread panicked during shutdown");
            }
        }
    }
}

/// Advance the plant by `step_us` microseconds and return the number of
/// whole pulses produced (signed) together with the new sub-pulse remainder.
fn integrate(remainder: i64, command: i32, rate: u32, step_us: i64) -> (i64, i64) {
    let acc = remainder + i64::from(command) * i64::from(rate) * step_us;
    (acc / MICRO, acc % MICRO)
}

impl<C: Clock + Clone + Send + 'static> EdgeSource for SimulatedEncoder<C> {
    fn on_leading_edge(&mut self, mut callback: LeadingEdgeFn) -> Result<(), BoxError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(Box::new(HwError::Released));
        }
        let shared = self.shared.clone();
        let shutdown = self.shutdown.clone();
        let clock = self.clock.clone();
        let params = self.params;
        let step_us = i64::try_from(params.step.as_micros()).unwrap_or(i64::MAX).max(1);
        self.threads.push(std::thread::spawn(move || {
            let mut remainder = 0i64;
            while !shutdown.load(Ordering::Relaxed) {
                let (pulses, rest) = integrate(
                    remainder,
                    shared.command(),
                    params.pulses_per_sec_per_unit,
                    step_us,
                );
                remainder = rest;
                // Forward rotation leaves the lagging channel low at the edge.
                let lagging_high = pulses < 0;
                for _ in 0..pulses.unsigned_abs() {
                    callback(lagging_high);
                }
                clock.sleep(params.step);
            }
            tracing::trace!("simulated encoder thread exiting");
        }));
        Ok(())
    }

    fn on_reference_edge(&mut self, mut callback: ReferenceEdgeFn) -> Result<(), BoxError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(Box::new(HwError::Released));
        }
        let shutdown = self.shutdown.clone();
        let clock = self.clock.clone();
        let period = self.params.reference_period;
        self.threads.push(std::thread::spawn(move || {
            while !shutdown.load(Ordering::Relaxed) {
                clock.sleep(period);
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                callback(clock.now());
            }
            tracing::trace!("simulated reference clock exiting");
        }));
        Ok(())
    }

    fn release(&mut self) -> Result<(), BoxError> {
        self.join_all();
        Ok(())
    }
}

impl<C: Clock + Clone + Send + 'static> Drop for SimulatedEncoder<C> {
    fn drop(&mut self) {
        self.join_all();
    }
}
