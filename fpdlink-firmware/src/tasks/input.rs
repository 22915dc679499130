//! Input event consumer
//!
//! Drains the input channel and keeps a per-slot view of the contacts,
//! logging transitions.

use defmt::*;

use fpdlink_protocol::MAX_POINTS;

use crate::channels::INPUT_CHANNEL;
use crate::input::InputEvent;

#[embassy_executor::task]
pub async fn input_task() {
    info!("Input task started");

    let mut down = [false; MAX_POINTS];

    loop {
        match INPUT_CHANNEL.receive().await {
            InputEvent::Registered(caps) => {
                info!(
                    "Touch device registered: x 0..={}, y 0..={}, {} slots",
                    caps.x_max,
                    caps.y_max,
                    caps.slots
                );
            }
            InputEvent::Contact(c) => {
                let Some(slot) = down.get_mut(c.slot as usize) else {
                    warn!("Contact for unknown slot {}", c.slot);
                    continue;
                };
                if c.active && !*slot {
                    debug!("Slot {} down at ({}, {})", c.slot, c.x, c.y);
                } else if !c.active && *slot {
                    debug!("Slot {} up", c.slot);
                }
                *slot = c.active;
            }
            InputEvent::Sync => {
                trace!(
                    "Frame, {} contacts",
                    down.iter().filter(|d| **d).count()
                );
            }
            InputEvent::Unregistered => {
                info!("Touch device unregistered");
                down = [false; MAX_POINTS];
            }
        }
    }
}
