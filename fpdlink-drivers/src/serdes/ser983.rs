//! DS90UB983 DP-to-FPD-Link IV serializer
//!
//! Register tables for single-port FPD-Link IV operation at 6.75 Gbps with
//! a 2880x1620 DisplayPort SST input, plus strap-mode decoding.
//!
//! Most of the configuration goes through the indirect window (0x40 page,
//! 0x41 offset, 0x42 data) or the DP APB window (0x48 enable, 0x49/0x4a
//! address, 0x4b..0x4e data).

use fpdlink_hal::I2cBus;

use crate::script::Script;
use crate::script::Step::{self, Delay, Write as W};
use crate::transport::{Registers, TransportError};

/// DS90UB983 register addresses
pub mod reg {
    /// Soft reset control
    pub const RESET_CTL: u8 = 0x01;
    /// Mode overrides, CRC error reset (bit 5)
    pub const FPD4_CFG: u8 = 0x02;
    /// Strap config, I2C pass-through (bit 3)
    pub const GENERAL_CFG: u8 = 0x07;
    /// Strapped TX mode
    pub const TX_MODE_STS: u8 = 0x27;
    /// Port write select
    pub const TX_PORT_SEL: u8 = 0x2d;
    /// Remote target id / alias
    pub const TARGET_ID_0: u8 = 0x70;
    pub const TARGET_ALIAS_0: u8 = 0x78;
    pub const TARGET_DEST_0: u8 = 0x88;
}

/// Indirect pages
pub mod page {
    /// Interrupt control for the FPD-Link IV ports
    pub const INTERRUPT: u8 = 9;
    /// Video processor status
    pub const VIDEO_PROCESSOR: u8 = 12;
}

/// Video processor 0 registers in [`page::VIDEO_PROCESSOR`]
pub mod vp {
    /// Pattern generator control, bit 0 = enabled
    pub const PATGEN_CTL: u8 = 0x28;
    /// VP0 status, bit 0 = synchronized to the DP input
    pub const VP0_STS: u8 = 0x30;
}

/// Pass-through enable bit in [`reg::GENERAL_CFG`]
pub const I2C_PASS_THROUGH: u8 = 0x08;
/// CRC error reset bit in [`reg::FPD4_CFG`]
pub const CRC_ERROR_RESET: u8 = 0x20;

/// Link rate selected by the mode straps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StrapRate {
    /// FPD-Link III compatible
    Fpd3,
    Gbps10_8,
    Gbps13_5,
    Gbps6_75,
    Gbps3_375,
    /// Low nibble with no assigned rate
    Unassigned(u8),
}

/// Decoded mode straps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StrapProfile {
    pub tx_mode: u8,
    pub general_cfg: u8,
    pub rate: StrapRate,
}

impl StrapProfile {
    pub fn decode(tx_mode: u8, general_cfg: u8) -> Self {
        let rate = if general_cfg & 0x01 != 0 {
            StrapRate::Fpd3
        } else {
            match tx_mode & 0x0f {
                0x0f => StrapRate::Fpd3,
                0x08 | 0x09 => StrapRate::Gbps10_8,
                0x0a | 0x0b => StrapRate::Gbps13_5,
                0x0c | 0x0d => StrapRate::Gbps6_75,
                0x0e => StrapRate::Gbps3_375,
                other => StrapRate::Unassigned(other),
            }
        };
        Self {
            tx_mode,
            general_cfg,
            rate,
        }
    }

    /// A zero TX_MODE_STS means nothing answered as a serializer
    pub fn serializer_present(&self) -> bool {
        self.tx_mode != 0
    }
}

/// Read and decode the mode straps
pub async fn read_straps<B: I2cBus>(
    regs: &mut Registers<'_, B>,
    dev: u8,
) -> Result<StrapProfile, TransportError> {
    let tx_mode = regs.read(dev, reg::TX_MODE_STS).await?;
    let general_cfg = regs.read(dev, reg::GENERAL_CFG).await?;
    Ok(StrapProfile::decode(tx_mode, general_cfg))
}

/// Whether the internal pattern generator drives VP0
///
/// A failed read counts as "not running".
pub async fn pattern_generator_enabled<B: I2cBus>(regs: &mut Registers<'_, B>, dev: u8) -> bool {
    matches!(
        regs.read_indirect(dev, page::VIDEO_PROCESSOR, vp::PATGEN_CTL).await,
        Ok(v) if v & 0x01 != 0
    )
}

/// Whether VP0 is synchronized to the DP input
///
/// A failed read counts as "not locked".
pub async fn vp0_locked<B: I2cBus>(regs: &mut Registers<'_, B>, dev: u8) -> bool {
    matches!(
        regs.read_indirect(dev, page::VIDEO_PROCESSOR, vp::VP0_STS).await,
        Ok(v) if v & 0x01 != 0
    )
}

/// Video input reset through the APB window
pub const VIDEO_INPUT_RESET: Script = Script::new(
    "ser.video_input_reset",
    &[
        W(0x49, 0x54),
        W(0x4a, 0x00),
        W(0x4b, 0x01),
        W(0x4c, 0x00),
        W(0x4d, 0x00),
        W(0x4e, 0x00),
    ],
);

/// Soft reset, port 0 select, then a video input reset
pub const RESET: Script = Script::new(
    "ser.reset",
    &[
        W(reg::RESET_CTL, 0xff),
        W(reg::TX_PORT_SEL, 0x01),
        W(0x49, 0x54),
        W(0x4a, 0x00),
        W(0x4b, 0x01),
        W(0x4c, 0x00),
        W(0x4d, 0x00),
        W(0x4e, 0x00),
    ],
);

/// 400 kHz remote I2C and remote deserializer id
pub const VARIABLES: Script = Script::new(
    "ser.variables",
    &[
        W(0x2b, 0x0a),
        W(0x2c, 0x0b),
        W(reg::TARGET_ID_0, 0x30),
        W(reg::TARGET_ALIAS_0, 0x30),
        W(reg::TARGET_DEST_0, 0x00),
    ],
);

/// No FPD3 FIFO pass-through, single port 0 FPD-Link IV
pub const FPD4_MODE: Script = Script::new("ser.fpd4_mode", &[W(0x5b, 0x23), W(0x05, 0x2c)]);

/// PLL programming for 6.75 Gbps
pub const FPD4_PLL: Script = Script::new(
    "ser.fpd4_pll",
    &[
        // Disable PLL0 and PLL1
        W(0x40, 0x08),
        W(0x41, 0x1b),
        W(0x42, 0x08),
        W(0x40, 0x08),
        W(0x41, 0x5b),
        W(0x42, 0x08),
        // Mode overwrite
        W(reg::FPD4_CFG, 0xd1),
        W(reg::TX_PORT_SEL, 0x01),
        // Ncount and post divider
        W(0x40, 0x08),
        W(0x41, 0x05),
        W(0x42, 0x64),
        W(0x41, 0x13),
        W(0x42, 0x80),
        W(reg::TX_PORT_SEL, 0x01),
        // Back channel sampling
        W(0x6a, 0x0a),
        W(0x6e, 0x86),
        W(0x40, 0x04),
        W(0x41, 0x06),
        W(0x42, 0x00),
        W(0x41, 0x0d),
        W(0x42, 0x34),
        W(0x41, 0x0e),
        W(0x42, 0x53),
        // HALFRATE_MODE
        W(reg::FPD4_CFG, 0x11),
        W(reg::FPD4_CFG, 0x51),
        W(reg::FPD4_CFG, 0x50),
        // Zero fractional PLL for port 0
        W(0x40, 0x08),
        W(0x41, 0x04),
        W(0x42, 0x01),
        W(0x41, 0x1e),
        W(0x42, 0x00),
        W(0x41, 0x1f),
        W(0x42, 0x00),
        W(0x41, 0x20),
        W(0x42, 0x00),
    ],
);

/// Set VCO, reset and enable PLL0, soft reset
pub const ENABLE_PLLS: Script = Script::new(
    "ser.enable_plls",
    &[
        W(0x40, 0x08),
        W(0x41, 0x0e),
        W(0x42, 0xc7),
        W(reg::RESET_CTL, 0x30),
        W(0x40, 0x08),
        W(0x41, 0x1b),
        W(0x42, 0x00),
        W(reg::RESET_CTL, 0x01),
        Delay(20),
    ],
);

pub const ENABLE_PASS_THROUGH: Script = Script::new(
    "ser.enable_pass_through",
    &[Step::Update {
        reg: reg::GENERAL_CFG,
        mask: I2C_PASS_THROUGH,
        value: I2C_PASS_THROUGH,
    }],
);

/// DP receiver: 2.7 Gbps, 4 lanes, SST, HPD toggled around the setup
pub const DP_CONFIG: Script = Script::new(
    "ser.dp_config",
    &[
        W(0x48, 0x01),
        // HPD low
        W(0x49, 0x00),
        W(0x4a, 0x00),
        W(0x4b, 0x00),
        W(0x4c, 0x00),
        W(0x4d, 0x00),
        W(0x4e, 0x00),
        // Max advertised link rate
        W(0x49, 0x74),
        W(0x4a, 0x00),
        W(0x4b, 0x0a),
        W(0x4c, 0x00),
        W(0x4d, 0x00),
        W(0x4e, 0x00),
        // Max advertised lane count
        W(0x49, 0x70),
        W(0x4a, 0x00),
        W(0x4b, 0x04),
        W(0x4c, 0x00),
        W(0x4d, 0x00),
        W(0x4e, 0x00),
        // Minimum VOD swing
        W(0x49, 0x14),
        W(0x4a, 0x02),
        W(0x4b, 0x02),
        W(0x4c, 0x00),
        W(0x4d, 0x00),
        W(0x4e, 0x00),
        // SST, DP mode
        W(0x49, 0x18),
        W(0x4a, 0x00),
        W(0x4b, 0x14),
        W(0x4c, 0x00),
        W(0x4d, 0x00),
        W(0x4e, 0x00),
        // HPD high starts link training
        W(0x49, 0x00),
        W(0x4a, 0x00),
        W(0x4b, 0x01),
        W(0x4c, 0x00),
        W(0x4d, 0x00),
        W(0x4e, 0x00),
    ],
);

/// Video processor 0 timing for 2880x1620
pub const VP_CONFIG: Script = Script::new(
    "ser.vp_config",
    &[
        W(0x40, 0x32),
        W(0x41, 0x01),
        W(0x42, 0xa8),
        W(0x41, 0x02),
        W(0x42, 0x40),
        W(0x42, 0x0b),
        W(0x41, 0x10),
        // H active, back porch, sync, total
        W(0x42, 0x40),
        W(0x42, 0x0b),
        W(0x42, 0xe0),
        W(0x42, 0x01),
        W(0x42, 0x20),
        W(0x42, 0x00),
        W(0x42, 0x70),
        W(0x42, 0x0d),
        // V active, back porch, sync, front porch
        W(0x42, 0x54),
        W(0x42, 0x06),
        W(0x42, 0x0c),
        W(0x42, 0x00),
        W(0x42, 0x08),
        W(0x42, 0x00),
        W(0x42, 0x08),
        W(0x42, 0x00),
        // Sync polarity
        W(0x41, 0x27),
        W(0x42, 0x00),
        // M/N
        W(0x41, 0x23),
        W(0x42, 0x50),
        W(0x42, 0x28),
        W(0x42, 0x0f),
    ],
);

/// One video processor in use
pub const ENABLE_VPS: Script = Script::new("ser.enable_vps", &[W(0x43, 0x00), W(0x44, 0x01)]);

/// Link layer 0: stream enable, time slots, bpp
pub const TX_LINK_LAYER: Script = Script::new(
    "ser.tx_link_layer",
    &[
        W(0x40, 0x2e),
        W(0x41, 0x01),
        W(0x42, 0x01),
        W(0x41, 0x06),
        W(0x42, 0x41),
        W(0x41, 0x20),
        W(0x42, 0x61),
        W(0x41, 0x00),
        W(0x42, 0x03),
    ],
);

/// Pulse the CRC error reset bit
pub const CLEAR_CRC_ERROR: Script = Script::new(
    "ser.clear_crc_error",
    &[
        Step::Update {
            reg: reg::FPD4_CFG,
            mask: CRC_ERROR_RESET,
            value: CRC_ERROR_RESET,
        },
        Step::Update {
            reg: reg::FPD4_CFG,
            mask: CRC_ERROR_RESET,
            value: 0,
        },
        W(reg::TX_PORT_SEL, 0x01),
        Delay(20),
    ],
);

/// Forward remote interrupts from the deserializer to INTB
pub const INTERRUPT_FORWARDING: Script = Script::new(
    "ser.interrupt_forwarding",
    &[
        // INTERRUPT_CTL, FPD3_ICR
        W(0x51, 0x83),
        W(0xc6, 0x21),
        // IE_DES_INT for both FPD-Link IV ports, page 9
        W(0x40, page::INTERRUPT << 2),
        W(0x41, 0x8c),
        W(0x42, 0x30),
        W(0x40, page::INTERRUPT << 2),
        W(0x41, 0x9c),
        W(0x42, 0x30),
    ],
);
