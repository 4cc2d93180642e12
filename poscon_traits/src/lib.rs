//! Collaborator traits shared by the control-loop engine and its backends.
//!
//! Errors cross these boundaries as `Box<dyn Error + Send + Sync>` so that
//! backends stay free to use their own error types; `poscon_core` maps them
//! to typed errors.
pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

use std::time::Instant;

/// Boxed error used at every collaborator boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Callback invoked on a rising edge of the leading encoder channel.
/// The argument is the level of the lagging channel at that instant.
pub type LeadingEdgeFn = Box<dyn FnMut(bool) + Send>;

/// Callback invoked on a rising edge of the periodic reference input.
pub type ReferenceEdgeFn = Box<dyn FnMut(Instant) + Send>;

/// Motor-driver chip reached over a low-bandwidth bus.
pub trait MotorDriver {
    /// Apply a signed drive command; the sign selects the direction.
    fn drive(&mut self, command: i32) -> Result<(), BoxError>;
    /// Short the bridge to brake the motor.
    fn brake(&mut self) -> Result<(), BoxError>;
    /// Read the fault code; 0 means no fault.
    fn fault(&mut self) -> Result<u8, BoxError>;
    /// Put the chip into a safe idle state and give up the bus.
    fn release(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Source of encoder and reference-clock edges.
///
/// Callbacks may be invoked from any thread the host event mechanism uses.
pub trait EdgeSource {
    fn on_leading_edge(&mut self, callback: LeadingEdgeFn) -> Result<(), BoxError>;
    fn on_reference_edge(&mut self, callback: ReferenceEdgeFn) -> Result<(), BoxError>;
    /// Stop delivering edges and free the underlying inputs.
    fn release(&mut self) -> Result<(), BoxError>;
}

impl<T: MotorDriver + ?Sized> MotorDriver for Box<T> {
    fn drive(&mut self, command: i32) -> Result<(), BoxError> {
        (**self).drive(command)
    }
    fn brake(&mut self) -> Result<(), BoxError> {
        (**self).brake()
    }
    fn fault(&mut self) -> Result<u8, BoxError> {
        (**self).fault()
    }
    fn release(&mut self) -> Result<(), BoxError> {
        (**self).release()
    }
}
