//! Test and helper mocks for poscon_core

use std::sync::{Arc, Mutex};

use poscon_traits::{BoxError, MotorDriver};

/// One call made on a `RecordingDriver`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverCall {
    Drive(i32),
    Brake,
    Fault,
    Release,
}

/// Shared view of everything a `RecordingDriver` was asked to do.
#[derive(Debug, Default)]
pub struct DriverLog {
    calls: Mutex<Vec<DriverCall>>,
    fault: Mutex<u8>,
}

impl DriverLog {
    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn drives(&self) -> Vec<i32> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DriverCall::Drive(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    pub fn brakes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| **c == DriverCall::Brake)
            .count()
    }

    pub fn released(&self) -> bool {
        self.calls().contains(&DriverCall::Release)
    }

    /// Fault code reported from now on.
    pub fn set_fault(&self, code: u8) {
        if let Ok(mut f) = self.fault.lock() {
            *f = code;
        }
    }

    fn record(&self, call: DriverCall) {
        if let Ok(mut c) = self.calls.lock() {
            c.push(call);
        }
    }
}

/// Motor driver that only records calls. Never fails.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    log: Arc<DriverLog>,
}

impl RecordingDriver {
    pub fn log(&self) -> Arc<DriverLog> {
        self.log.clone()
    }
}

impl MotorDriver for RecordingDriver {
    fn drive(&mut self, command: i32) -> Result<(), BoxError> {
        self.log.record(DriverCall::Drive(command));
        Ok(())
    }

    fn brake(&mut self) -> Result<(), BoxError> {
        self.log.record(DriverCall::Brake);
        Ok(())
    }

    fn fault(&mut self) -> Result<u8, BoxError> {
        self.log.record(DriverCall::Fault);
        Ok(self.log.fault.lock().map(|f| *f).unwrap_or(0))
    }

    fn release(&mut self) -> Result<(), BoxError> {
        self.log.record(DriverCall::Release);
        Ok(())
    }
}
