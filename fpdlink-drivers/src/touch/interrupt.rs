//! Interrupt-driven report source

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::digital::Wait;
use fpdlink_core::traits::TouchSource;
use fpdlink_hal::I2cBus;
use fpdlink_protocol::RawReport;

use super::{McuLink, TouchError};

/// How often a quiet line rechecks for a re-established link
pub const SESSION_CHECK_MS: u32 = 20;

/// Fetches one report per falling edge of the MCU interrupt line
///
/// The MCU session (interrupt routing included) is set up before waiting,
/// and the wait is abandoned when the link comes back with a new
/// generation so the routing can be re-armed. Edges seen while the link
/// is not ready are dropped without touching the bus.
pub struct InterruptSource<'a, M: RawMutex, B: I2cBus, D: DelayNs, P: Wait> {
    link: McuLink<'a, M, B, D>,
    irq: P,
}

impl<'a, M: RawMutex, B: I2cBus, D: DelayNs, P: Wait> InterruptSource<'a, M, B, D, P> {
    pub fn new(link: McuLink<'a, M, B, D>, irq: P) -> Self {
        Self { link, irq }
    }

    pub fn link(&self) -> &McuLink<'a, M, B, D> {
        &self.link
    }
}

impl<M: RawMutex, B: I2cBus, D: DelayNs, P: Wait> TouchSource for InterruptSource<'_, M, B, D, P> {
    type Error = TouchError;

    async fn fetch_next_report(&mut self) -> Result<RawReport, TouchError> {
        loop {
            match self.link.ensure_session().await {
                Ok(()) | Err(TouchError::NotReady) => {}
                Err(e) => return Err(e),
            }

            let link = &mut self.link;
            let rearm = async move {
                loop {
                    link.sleep(SESSION_CHECK_MS).await;
                    if link.session_stale() {
                        break;
                    }
                }
            };

            match select(self.irq.wait_for_falling_edge(), rearm).await {
                Either::First(edge) => edge.map_err(|_| TouchError::Line)?,
                Either::Second(()) => {
                    #[cfg(feature = "defmt")]
                    defmt::debug!("link re-established, re-arming touch interrupt");
                    continue;
                }
            }

            match self.link.query().await {
                Err(TouchError::NotReady) => {
                    #[cfg(feature = "defmt")]
                    defmt::debug!("touch edge while link not ready");
                }
                result => return result,
            }
        }
    }
}
