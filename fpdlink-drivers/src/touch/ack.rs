//! Periodic interrupt acknowledge

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;
use fpdlink_core::gate::ReadinessGate;
use fpdlink_hal::I2cBus;

use crate::mcu;
use crate::transport::{Registers, TransportError};

/// Re-acknowledges the MCU interrupt on a fixed period
pub struct Acknowledger<'a, M: RawMutex, B: I2cBus, D: DelayNs> {
    gate: &'a ReadinessGate<M, B>,
    serializer: u8,
    interval_ms: u32,
    delay: D,
}

impl<'a, M: RawMutex, B: I2cBus, D: DelayNs> Acknowledger<'a, M, B, D> {
    pub fn new(gate: &'a ReadinessGate<M, B>, serializer: u8, interval_ms: u32, delay: D) -> Self {
        Self {
            gate,
            serializer,
            interval_ms,
            delay,
        }
    }

    /// Acknowledge once if the link is ready
    ///
    /// Returns whether an acknowledge was sent.
    pub async fn tick(&mut self) -> Result<bool, TransportError> {
        let mut guard = self.gate.lock().await;
        if !guard.is_ready() {
            return Ok(false);
        }
        mcu::acknowledge(&mut Registers::new(guard.bus()), self.serializer).await?;
        Ok(true)
    }

    pub async fn run(&mut self) -> ! {
        loop {
            if let Err(_e) = self.tick().await {
                #[cfg(feature = "defmt")]
                defmt::warn!("touch acknowledge failed: {}", _e);
            }
            self.delay.delay_ms(self.interval_ms).await;
        }
    }
}
