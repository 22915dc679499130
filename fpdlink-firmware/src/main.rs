//! fpdlink - FPD-Link IV bridge firmware
//!
//! Brings up a DS90UB983 serializer and DS90UB984 deserializer over I2C,
//! trains the video link and then serves touch reports from the MCU behind
//! the bridge.
//!
//! Tasks:
//! - bridge: sequencer, owns link state and power commands
//! - touch: interrupt or polling report source into the input channel
//! - ack: optional periodic interrupt acknowledge
//! - input: input event consumer

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Pull};
use embassy_rp::i2c::{I2c, InterruptHandler as I2cInterruptHandler};
use embassy_rp::peripherals::I2C0;
use embassy_time::{Delay, Timer};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use fpdlink_core::config::DeliveryMode;
use fpdlink_core::gate::ReadinessGate;
use fpdlink_drivers::sequencer::BridgeCommand;
use fpdlink_hal::{Embedded, Retrying};

mod board;
mod channels;
mod config;
mod input;
mod tasks;

bind_interrupts!(struct Irqs {
    I2C0_IRQ => I2cInterruptHandler<I2C0>;
});

// The gate must outlive every task that borrows it
static GATE: StaticCell<board::Gate> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("fpdlink firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = config::load();
    info!(
        "Bus {} Hz, {} retries, touch mode {}",
        config.bus.frequency, config.bus.retries, config.touch.mode
    );

    let i2c = I2c::new_async(p.I2C0, p.PIN_5, p.PIN_4, Irqs, board::i2c_config(&config.bus));
    let bus = Retrying::new(Embedded(i2c), Delay, board::bus_policy(&config.bus));
    let gate: &'static board::Gate = GATE.init(ReadinessGate::new(bus));
    info!("I2C0 initialized");

    spawner.spawn(tasks::input_task().unwrap());
    spawner.spawn(tasks::bridge_task(gate, config.bridge).unwrap());

    match config.touch.mode {
        DeliveryMode::Interrupt => {
            let irq = Input::new(p.PIN_6, Pull::Up);
            spawner.spawn(
                tasks::interrupt_touch_task(gate, config.bridge, config.touch, irq).unwrap(),
            );
            if config.touch.ack_thread {
                spawner.spawn(
                    tasks::ack_task(
                        gate,
                        config.bridge.serializer_addr,
                        config.touch.ack_interval_ms,
                    )
                    .unwrap(),
                );
            }
        }
        DeliveryMode::Polling => {
            spawner.spawn(tasks::polling_touch_task(gate, config.bridge, config.touch).unwrap());
        }
    }

    info!("All tasks spawned, starting bridge");
    channels::BRIDGE_COMMANDS.signal(BridgeCommand::Start);

    loop {
        Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}
