//! Bridge task
//!
//! Owns the sequencer and serves power/lifecycle commands from
//! [`BRIDGE_COMMANDS`].

use defmt::*;
use embassy_time::Delay;

use fpdlink_core::config::BridgeConfig;
use fpdlink_drivers::sequencer::BridgeSequencer;

use crate::board::Gate;
use crate::channels::BRIDGE_COMMANDS;

#[embassy_executor::task]
pub async fn bridge_task(gate: &'static Gate, config: BridgeConfig) {
    info!(
        "Bridge task started (ser={=u8:#x}, des={=u8:#x}, mcu={=u8:#x})",
        config.serializer_addr, config.deserializer_addr, config.mcu_addr
    );

    let mut sequencer = BridgeSequencer::new(gate, Delay, config);
    sequencer.run(&BRIDGE_COMMANDS).await
}
