//! Periodic report source

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;
use fpdlink_core::config::TouchConfig;
use fpdlink_core::traits::TouchSource;
use fpdlink_hal::I2cBus;
use fpdlink_protocol::RawReport;

use super::{McuLink, TouchError};

/// Fetches the latest report every poll period
///
/// The MCU answers with its last report whether or not anything changed,
/// so consumers must dedup (see `fpdlink_core::touch::ReportHistory`).
pub struct PollingSource<'a, M: RawMutex, B: I2cBus, D: DelayNs> {
    link: McuLink<'a, M, B, D>,
    poll_interval_ms: u32,
    not_ready_backoff_ms: u32,
    /// A fetch already happened, pace the next one
    started: bool,
}

impl<'a, M: RawMutex, B: I2cBus, D: DelayNs> PollingSource<'a, M, B, D> {
    pub fn new(link: McuLink<'a, M, B, D>, config: &TouchConfig) -> Self {
        Self {
            link,
            poll_interval_ms: config.poll_interval_ms,
            not_ready_backoff_ms: config.not_ready_backoff_ms,
            started: false,
        }
    }

    pub fn link(&self) -> &McuLink<'a, M, B, D> {
        &self.link
    }
}

impl<M: RawMutex, B: I2cBus, D: DelayNs> TouchSource for PollingSource<'_, M, B, D> {
    type Error = TouchError;

    async fn fetch_next_report(&mut self) -> Result<RawReport, TouchError> {
        if self.started {
            self.link.sleep(self.poll_interval_ms).await;
        }
        self.started = true;

        loop {
            match self.link.poll().await {
                Err(TouchError::NotReady) => self.link.sleep(self.not_ready_backoff_ms).await,
                result => return result,
            }
        }
    }
}
