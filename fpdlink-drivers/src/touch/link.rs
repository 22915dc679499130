//! Readiness-checked access to the touch MCU

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;
use fpdlink_core::config::BridgeConfig;
use fpdlink_core::gate::{BusGuard, ReadinessGate};
use fpdlink_hal::I2cBus;
use fpdlink_protocol::{RawReport, COMMAND_QUERY, COMMAND_TP_REPORT};

use super::TouchError;
use crate::mcu;
use crate::transport::Registers;

/// Touch-side handle on the shared bus
///
/// Every exchange takes the bus lock, checks readiness under it and makes
/// sure the MCU session has been set up for the current link generation.
pub struct McuLink<'a, M: RawMutex, B: I2cBus, D: DelayNs> {
    gate: &'a ReadinessGate<M, B>,
    bridge: BridgeConfig,
    delay: D,
    /// Generation the session was last set up for
    session: Option<u32>,
}

impl<'a, M: RawMutex, B: I2cBus, D: DelayNs> McuLink<'a, M, B, D> {
    pub fn new(gate: &'a ReadinessGate<M, B>, bridge: BridgeConfig, delay: D) -> Self {
        Self {
            gate,
            bridge,
            delay,
            session: None,
        }
    }

    /// Link generation the MCU session belongs to
    pub fn session(&self) -> Option<u32> {
        self.session
    }

    /// Lock-free peek, recheck happens under the lock
    pub fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    /// Link is up but the MCU session still belongs to an older generation
    pub fn session_stale(&self) -> bool {
        self.gate.is_ready() && self.session != Some(self.gate.generation())
    }

    pub async fn sleep(&mut self, ms: u32) {
        self.delay.delay_ms(ms).await;
    }

    /// Set up the MCU session for the current generation without a fetch
    ///
    /// Interrupt delivery needs this before waiting for the first edge:
    /// the routing that carries the edge is part of the session.
    pub async fn ensure_session(&mut self) -> Result<(), TouchError> {
        self.locked_ready().await.map(drop)
    }

    /// Interrupt-mode fetch: query the pending report, then acknowledge
    pub async fn query(&mut self) -> Result<RawReport, TouchError> {
        let mut guard = self.locked_ready().await?;
        let mut regs = Registers::new(guard.bus());

        let raw = mcu::query(&mut regs, self.bridge.mcu_addr, COMMAND_QUERY).await?;
        mcu::acknowledge(&mut regs, self.bridge.serializer_addr).await?;
        Ok(raw)
    }

    /// Polling-mode fetch: acknowledge, then read the latest report
    pub async fn poll(&mut self) -> Result<RawReport, TouchError> {
        let mut guard = self.locked_ready().await?;
        let mut regs = Registers::new(guard.bus());

        mcu::acknowledge(&mut regs, self.bridge.serializer_addr).await?;
        let raw = mcu::query(&mut regs, self.bridge.mcu_addr, COMMAND_TP_REPORT).await?;
        Ok(raw)
    }

    /// Lock the bus, require Ready and an up to date session
    async fn locked_ready(&mut self) -> Result<BusGuard<'a, M, B>, TouchError> {
        let mut guard = self.gate.lock().await;
        if !guard.is_ready() {
            return Err(TouchError::NotReady);
        }

        let generation = guard.generation();
        if self.session != Some(generation) {
            let mut regs = Registers::new(guard.bus());
            mcu::init_session(&mut regs, &mut self.delay, &self.bridge).await?;
            self.session = Some(generation);

            #[cfg(feature = "defmt")]
            defmt::info!("touch session set up for link generation {}", generation);
        }

        Ok(guard)
    }
}
