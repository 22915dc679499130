//! Interrupt acknowledge task

use defmt::*;
use embassy_time::Delay;

use fpdlink_drivers::touch::Acknowledger;

use crate::board::Gate;

/// Re-acknowledge the MCU interrupt every `interval_ms` while ready
#[embassy_executor::task]
pub async fn ack_task(gate: &'static Gate, serializer: u8, interval_ms: u32) {
    info!("Ack task started, every {}ms", interval_ms);

    Acknowledger::new(gate, serializer, interval_ms, Delay)
        .run()
        .await
}
