//! Acquire the motor driver and edge source: Raspberry Pi hardware with the
//! `hardware` feature on Linux, the simulation backends otherwise.

use eyre::{Result, WrapErr};
use poscon_core::engine::{BoxedDriver, BoxedEdgeSource};

/// Fault code the simulated driver reports, for exercising fault paths.
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub const SIM_FAULT_ENV: &str = "POSCON_SIM_FAULT";

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn open_driver(cfg: &poscon_config::Config) -> Result<BoxedDriver> {
    let driver = poscon_hardware::HardwareDriver::open(
        cfg.bus.i2c_bus,
        cfg.bus.driver_address,
        cfg.controller.output_limit,
    )
    .wrap_err("open motor driver")?;
    Ok(Box::new(driver))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub fn open_driver(_cfg: &poscon_config::Config) -> Result<BoxedDriver> {
    Ok(Box::new(sim_driver()?))
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn open_backends(cfg: &poscon_config::Config) -> Result<(BoxedDriver, BoxedEdgeSource)> {
    use poscon_hardware::{EncoderPins, GpioEncoder};
    let driver = open_driver(cfg)?;
    let encoder = GpioEncoder::open(EncoderPins {
        reference: cfg.pins.reference,
        leading: cfg.pins.encoder_a,
        lagging: cfg.pins.encoder_b,
    })
    .wrap_err("open encoder pins")?;
    tracing::info!(
        reference = cfg.pins.reference,
        a = cfg.pins.encoder_a,
        b = cfg.pins.encoder_b,
        "gpio encoder ready"
    );
    Ok((driver, Box::new(encoder)))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub fn open_backends(cfg: &poscon_config::Config) -> Result<(BoxedDriver, BoxedEdgeSource)> {
    use poscon_hardware::{SimParams, SimulatedEncoder};
    use poscon_traits::MonotonicClock;
    use std::time::Duration;

    let driver = sim_driver()?;
    let params = SimParams {
        reference_period: Duration::from_millis(cfg.simulation.reference_period_ms),
        pulses_per_sec_per_unit: cfg.simulation.pulses_per_sec_per_unit,
        step: Duration::from_millis(cfg.simulation.step_ms),
    };
    let encoder = SimulatedEncoder::new(driver.shared(), params, MonotonicClock::new());
    tracing::info!(
        period_ms = cfg.simulation.reference_period_ms,
        rate = cfg.simulation.pulses_per_sec_per_unit,
        "simulation backends ready"
    );
    Ok((Box::new(driver), Box::new(encoder)))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn sim_driver() -> Result<poscon_hardware::SimulatedDriver> {
    let driver = poscon_hardware::SimulatedDriver::new();
    if let Ok(v) = std::env::var(SIM_FAULT_ENV) {
        let code: u8 = v
            .trim()
            .parse()
            .wrap_err_with(|| format!("{SIM_FAULT_ENV} must be a fault code 0..=255"))?;
        driver.shared().set_fault(code);
    }
    Ok(driver)
}
