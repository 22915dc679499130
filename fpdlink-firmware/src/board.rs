//! Board wiring
//!
//! RP2040 host board: I2C0 on GPIO4 (SDA) / GPIO5 (SCL) to the DS90UB983,
//! touch MCU interrupt (forwarded through the bridge) on GPIO6, active low.

use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::I2C0;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Delay;

use fpdlink_core::config::BusConfig;
use fpdlink_core::gate::ReadinessGate;
use fpdlink_hal::{Embedded, I2cConfig, Retrying};

/// The one physical bus every bridge and MCU access goes through
pub type SharedBus = Retrying<Embedded<I2c<'static, I2C0, i2c::Async>>, Delay>;

/// Bus lock plus link readiness, shared by all tasks
pub type Gate = ReadinessGate<CriticalSectionRawMutex, SharedBus>;

/// Peripheral clock settings for the configured bus
pub fn i2c_config(bus: &BusConfig) -> i2c::Config {
    let mut config = i2c::Config::default();
    config.frequency = bus.frequency;
    config
}

/// Retry/timeout policy for the configured bus
pub fn bus_policy(bus: &BusConfig) -> I2cConfig {
    I2cConfig {
        frequency: bus.frequency,
        retries: bus.retries,
        timeout_ms: bus.timeout_ms,
    }
}
