//! Motor-driver and encoder backends.
//!
//! The `hardware` feature enables the Raspberry Pi backends (DRV8830 over
//! I²C, quadrature encoder and reference clock on GPIO). The simulation
//! backends are always available.
pub mod error;
pub mod protocol;
pub mod sim;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod drv8830;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod encoder;

pub use protocol::describe as describe_fault;
pub use sim::{SimParams, SimShared, SimulatedDriver, SimulatedEncoder};

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use encoder::{EncoderPins, GpioEncoder};

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub struct HardwareDriver {
    chip: drv8830::Drv8830,
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
impl HardwareDriver {
    /// Acquire the bus and report the chip's fault register once.
    pub fn open(bus: u8, address: u16, limit: u32) -> error::Result<Self> {
        let mut chip = drv8830::Drv8830::open(bus, address, limit)?;
        let code = chip.read_fault()?;
        tracing::info!(code, reason = %describe_fault(code), "drv8830 fault register at startup");
        Ok(Self { chip })
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
impl poscon_traits::MotorDriver for HardwareDriver {
    fn drive(&mut self, command: i32) -> Result<(), poscon_traits::BoxError> {
        self.chip.drive(command)?;
        Ok(())
    }

    fn brake(&mut self) -> Result<(), poscon_traits::BoxError> {
        self.chip.brake()?;
        Ok(())
    }

    fn fault(&mut self) -> Result<u8, poscon_traits::BoxError> {
        Ok(self.chip.read_fault()?)
    }

    fn release(&mut self) -> Result<(), poscon_traits::BoxError> {
        self.chip.coast()?;
        tracing::debug!("drv8830 released (coast)");
        Ok(())
    }
}
