//! Inter-task communication channels
//!
//! Defines the static channels used for communication between Embassy tasks.
//! Uses embassy-sync primitives for safe async communication.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use fpdlink_drivers::sequencer::BridgeCommand;

use crate::input::InputEvent;

/// Channel capacity for input events
///
/// One full frame is ten contacts plus the sync.
const INPUT_CHANNEL_SIZE: usize = 32;

/// Power and lifecycle requests for the bridge task
///
/// Latest request wins; a suspend or shutdown posted during bring-up
/// cancels it.
pub static BRIDGE_COMMANDS: Signal<CriticalSectionRawMutex, BridgeCommand> = Signal::new();

/// Multi-touch events produced by the touch service
pub static INPUT_CHANNEL: Channel<CriticalSectionRawMutex, InputEvent, INPUT_CHANNEL_SIZE> =
    Channel::new();
