use std::time::Instant;

use poscon_traits::{BoxError, EdgeSource, LeadingEdgeFn, ReferenceEdgeFn};
use rppal::gpio::{Gpio, InputPin, Trigger};
use tracing::debug;

use crate::error::{HwError, Result};

/// BCM pin numbers of the encoder and reference inputs.
#[derive(Debug, Clone, Copy)]
pub struct EncoderPins {
    pub reference: u8,
    pub leading: u8,
    pub lagging: u8,
}

/// Quadrature encoder and reference clock on Raspberry Pi GPIO.
///
/// All inputs run with the built-in pull resistors disabled. Edge callbacks
/// are delivered on rppal's interrupt threads.
pub struct GpioEncoder {
    reference: Option<InputPin>,
    leading: Option<InputPin>,
    lagging: Option<InputPin>,
}

impl GpioEncoder {
    pub fn open(pins: EncoderPins) -> Result<Self> {
        let gpio = Gpio::new()?;
        let reference = gpio.get(pins.reference)?.into_input();
        let leading = gpio.get(pins.leading)?.into_input();
        let lagging = gpio.get(pins.lagging)?.into_input();
        debug!(
            reference = pins.reference,
            leading = pins.leading,
            lagging = pins.lagging,
            "gpio encoder inputs provisioned"
        );
        Ok(Self {
            reference: Some(reference),
            leading: Some(leading),
            lagging: Some(lagging),
        })
    }
}

impl EdgeSource for GpioEncoder {
    fn on_leading_edge(&mut self, mut callback: LeadingEdgeFn) -> std::result::Result<(), BoxError> {
        let lagging = self
            .lagging
            .take()
            .ok_or(HwError::AlreadyClaimed("lagging"))?;
        let leading = self.leading.as_mut().ok_or(HwError::Released)?;
        leading
            .set_async_interrupt(Trigger::RisingEdge, None, move |_| callback(lagging.is_high()))
            .map_err(HwError::from)?;
        Ok(())
    }

    fn on_reference_edge(
        &mut self,
        mut callback: ReferenceEdgeFn,
    ) -> std::result::Result<(), BoxError> {
        let reference = self.reference.as_mut().ok_or(HwError::Released)?;
        reference
            .set_async_interrupt(Trigger::RisingEdge, None, move |_| callback(Instant::now()))
            .map_err(HwError::from)?;
        Ok(())
    }

    fn release(&mut self) -> std::result::Result<(), BoxError> {
        for pin in [self.reference.as_mut(), self.leading.as_mut()]
            .into_iter()
            .flatten()
        {
            pin.clear_async_interrupt().map_err(HwError::from)?;
        }
        self.reference = None;
        self.leading = None;
        self.lagging = None;
        debug!("gpio encoder released");
        Ok(())
    }
}
