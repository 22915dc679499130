//! Touch/motor MCU behind the bridge
//!
//! The MCU sits on the remote side of the link and is reached through the
//! serializer's I2C pass-through. Reports are pulled with a one-byte
//! command followed by a 65-byte read in the same transaction. The MCU
//! raises its interrupt through the deserializer's INTB forwarding, which
//! is latched in the serializer until acknowledged by reading the port 0
//! interrupt status.

use embedded_hal_async::delay::DelayNs;
use fpdlink_core::config::BridgeConfig;
use fpdlink_hal::I2cBus;
use fpdlink_protocol::{MotorCommand, MotorFrame, RawReport, MOTOR_STATUS_LEN, MOTOR_STATUS_REG};

use crate::script::{self, ScriptError};
use crate::serdes::{des984, ser983};
use crate::transport::{Registers, TransportError};

/// Port 0 interrupt status in the serializer interrupt page
pub const INTR_STS_FPD4_PORT0: u8 = 0x8d;

/// Point the serializer's remote target 0 at the MCU and enable pass-through
pub async fn enable_pass_through<B: I2cBus>(
    regs: &mut Registers<'_, B>,
    serializer: u8,
    mcu: u8,
) -> Result<(), TransportError> {
    regs.write(serializer, ser983::reg::TARGET_ID_0, mcu << 1)
        .await?;
    regs.write(serializer, ser983::reg::TARGET_ALIAS_0, mcu << 1)
        .await?;
    regs.write(serializer, ser983::reg::TARGET_DEST_0, 0x00)
        .await?;
    regs.write(serializer, ser983::reg::GENERAL_CFG, 0x88).await
}

/// Clear the latched MCU interrupt
///
/// Returns the status byte that was pending.
pub async fn acknowledge<B: I2cBus>(
    regs: &mut Registers<'_, B>,
    serializer: u8,
) -> Result<u8, TransportError> {
    regs.read_indirect(serializer, ser983::page::INTERRUPT, INTR_STS_FPD4_PORT0)
        .await
}

/// Send a command and read back one report frame
pub async fn query<B: I2cBus>(
    regs: &mut Registers<'_, B>,
    mcu: u8,
    command: u8,
) -> Result<RawReport, TransportError> {
    let mut raw = RawReport::new();
    regs.transfer(mcu, &[command], raw.as_mut_bytes()).await?;
    Ok(raw)
}

/// Drive the motor and read back its status block
pub async fn motor<B: I2cBus>(
    regs: &mut Registers<'_, B>,
    mcu: u8,
    command: MotorCommand,
) -> Result<[u8; MOTOR_STATUS_LEN], TransportError> {
    let frame = MotorFrame::new(command);
    regs.send(mcu, frame.as_bytes()).await?;

    let mut status = [0u8; MOTOR_STATUS_LEN];
    regs.read_many(mcu, MOTOR_STATUS_REG, &mut status).await?;
    Ok(status)
}

/// Prepare the bridge for touch traffic
///
/// Must run once per link generation: a bridge reset drops the
/// pass-through and interrupt routing.
pub async fn init_session<B: I2cBus, D: DelayNs>(
    regs: &mut Registers<'_, B>,
    delay: &mut D,
    bridge: &BridgeConfig,
) -> Result<(), TransportError> {
    enable_pass_through(regs, bridge.serializer_addr, bridge.mcu_addr).await?;

    // Remote fast mode is optional, older deserializer straps NACK it
    let fast_mode = async {
        regs.write(bridge.deserializer_addr, 0x2b, 0x0a).await?;
        regs.write(bridge.deserializer_addr, 0x2c, 0x0b).await
    };
    if let Err(_e) = fast_mode.await {
        #[cfg(feature = "defmt")]
        defmt::warn!("deserializer fast mode not set: {}", _e);
    }

    script::apply(
        regs,
        delay,
        bridge.serializer_addr,
        &ser983::INTERRUPT_FORWARDING,
    )
    .await
    .map_err(|e: ScriptError| e.error)?;
    script::apply(
        regs,
        delay,
        bridge.deserializer_addr,
        &des984::INTERRUPT_FORWARDING,
    )
    .await
    .map_err(|e: ScriptError| e.error)?;

    acknowledge(regs, bridge.serializer_addr).await?;
    Ok(())
}
