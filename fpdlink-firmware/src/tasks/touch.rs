//! Touch service tasks
//!
//! One of these runs, depending on the configured delivery mode. Both
//! drive a [`TouchService`] into the input channel; they differ only in
//! the report source.

use defmt::*;
use embassy_rp::gpio::Input;
use embassy_time::{Delay, Timer};

use fpdlink_core::config::{BridgeConfig, TouchConfig};
use fpdlink_core::touch::{Outcome, TouchService};
use fpdlink_core::traits::TouchSource;
use fpdlink_drivers::touch::{InterruptSource, McuLink, PollingSource};

use crate::board::Gate;
use crate::input::ChannelSink;

/// Pause after a failed step before fetching again
const ERROR_BACKOFF_MS: u64 = 100;

#[embassy_executor::task]
pub async fn interrupt_touch_task(
    gate: &'static Gate,
    bridge: BridgeConfig,
    touch: TouchConfig,
    irq: Input<'static>,
) {
    info!("Touch task started (interrupt mode)");

    let link = McuLink::new(gate, bridge, Delay);
    serve(TouchService::new(
        InterruptSource::new(link, irq),
        ChannelSink,
        &touch,
    ))
    .await
}

#[embassy_executor::task]
pub async fn polling_touch_task(gate: &'static Gate, bridge: BridgeConfig, touch: TouchConfig) {
    info!(
        "Touch task started (polling every {}ms)",
        touch.poll_interval_ms
    );

    let link = McuLink::new(gate, bridge, Delay);
    serve(TouchService::new(
        PollingSource::new(link, &touch),
        ChannelSink,
        &touch,
    ))
    .await
}

async fn serve<S: TouchSource>(mut service: TouchService<S, ChannelSink>) -> ! {
    while let Err(e) = service.start() {
        warn!("Input registration failed: {}", Debug2Format(&e));
        Timer::after_millis(ERROR_BACKOFF_MS).await;
    }

    loop {
        match service.step().await {
            Ok(Outcome::Rejected(e)) => debug!("Touch frame rejected: {}", e),
            Ok(Outcome::SyntheticRelease) => debug!("Synthesized release after repeats"),
            Ok(_) => {}
            Err(e) => {
                warn!("Touch step failed: {}", Debug2Format(&e));
                Timer::after_millis(ERROR_BACKOFF_MS).await;
            }
        }
    }
}
