//! Channel-backed input sink
//!
//! The touch service reports contacts synchronously; events are queued for
//! the input task, which stands in for the host input stack.

use fpdlink_core::traits::{ContactUpdate, InputCapabilities, InputSink};

use crate::channels::INPUT_CHANNEL;

/// One multi-touch event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputEvent {
    Registered(InputCapabilities),
    Contact(ContactUpdate),
    /// End of frame
    Sync,
    Unregistered,
}

/// Input queue was full, the event was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueueFull;

/// [`InputSink`] feeding [`INPUT_CHANNEL`]
pub struct ChannelSink;

impl ChannelSink {
    fn push(&mut self, event: InputEvent) -> Result<(), QueueFull> {
        INPUT_CHANNEL.try_send(event).map_err(|_| QueueFull)
    }
}

impl InputSink for ChannelSink {
    type Error = QueueFull;

    fn register(&mut self, caps: &InputCapabilities) -> Result<(), QueueFull> {
        self.push(InputEvent::Registered(*caps))
    }

    fn report_contact(&mut self, update: &ContactUpdate) -> Result<(), QueueFull> {
        self.push(InputEvent::Contact(*update))
    }

    fn sync_frame(&mut self) -> Result<(), QueueFull> {
        self.push(InputEvent::Sync)
    }

    fn unregister(&mut self) -> Result<(), QueueFull> {
        self.push(InputEvent::Unregistered)
    }
}
