//! Touch report sources
//!
//! Both delivery modes share an [`McuLink`], which owns the readiness check
//! and the per-link MCU session setup. The sources only decide when to
//! fetch:
//!
//! - [`InterruptSource`] waits for the MCU's falling edge
//! - [`PollingSource`] fetches on a fixed period
//!
//! [`Acknowledger`] is an optional companion for interrupt mode that keeps
//! re-acknowledging so a missed edge cannot wedge the line low.

pub mod ack;
pub mod interrupt;
pub mod link;
pub mod polling;

pub use ack::Acknowledger;
pub use interrupt::InterruptSource;
pub use link::McuLink;
pub use polling::PollingSource;

use crate::transport::TransportError;

/// Touch source errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TouchError {
    /// Link not ready, nothing was sent to the bus
    NotReady,
    /// Bus transaction failed
    Transport(TransportError),
    /// Interrupt line could not be waited on
    Line,
}

impl From<TransportError> for TouchError {
    fn from(e: TransportError) -> Self {
        TouchError::Transport(e)
    }
}
