//! Touch report source trait

use fpdlink_protocol::RawReport;

/// Something that yields raw touch reports from the MCU
///
/// Interrupt and polling delivery are two implementations of this trait;
/// everything downstream of [`TouchSource::fetch_next_report`] is shared.
#[allow(async_fn_in_trait)]
pub trait TouchSource {
    /// Error type for fetch failures
    type Error: core::fmt::Debug;

    /// Wait for and fetch the next report
    async fn fetch_next_report(&mut self) -> Result<RawReport, Self::Error>;
}
