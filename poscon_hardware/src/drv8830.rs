use rppal::i2c::I2c;
use tracing::{debug, trace};

use crate::error::Result;
use crate::protocol::{self, FAULT_CLEAR, REG_CONTROL, REG_FAULT};

/// DRV8830 low-voltage motor driver on an I²C bus.
pub struct Drv8830 {
    i2c: I2c,
    limit: u32,
}

impl Drv8830 {
    /// Open `bus` and address the chip at `address`. `limit` is the command
    /// magnitude that maps to full output voltage.
    pub fn open(bus: u8, address: u16, limit: u32) -> Result<Self> {
        let mut i2c = I2c::with_bus(bus)?;
        i2c.set_slave_address(address)?;
        debug!(bus, address, limit, "drv8830 opened");
        Ok(Self { i2c, limit })
    }

    pub fn write_control(&mut self, byte: u8) -> Result<()> {
        trace!(control = byte, "drv8830 control write");
        self.i2c.smbus_write_byte(REG_CONTROL, byte)?;
        Ok(())
    }

    /// Read the FAULT register and clear any latched bits.
    pub fn read_fault(&mut self) -> Result<u8> {
        let code = self.i2c.smbus_read_byte(REG_FAULT)?;
        if code != 0 {
            self.i2c.smbus_write_byte(REG_FAULT, FAULT_CLEAR)?;
        }
        Ok(code & !FAULT_CLEAR)
    }

    pub fn drive(&mut self, command: i32) -> Result<()> {
        self.write_control(protocol::drive_byte(command, self.limit))
    }

    pub fn brake(&mut self) -> Result<()> {
        self.write_control(protocol::brake_byte())
    }

    pub fn coast(&mut self) -> Result<()> {
        self.write_control(protocol::drive_byte(0, self.limit))
    }
}
