//! DS90UB984 FPD-Link IV to DP deserializer
//!
//! Output side of the bridge: eFuse workaround, temperature ramp
//! calibration and the DP TX configuration for the 2880x1620 panel.

use embedded_hal_async::delay::DelayNs;
use fpdlink_hal::I2cBus;

use crate::script::Step::{Delay, Read, Write as W};
use crate::script::{self, Script, ScriptError};
use crate::transport::{reg as window, Registers, TransportError};

/// DS90UB984 register addresses
pub mod reg {
    /// Device id / I2C address readback
    pub const I2C_DEV_ID: u8 = 0x00;
    /// Soft reset control
    pub const RESET_CTL: u8 = 0x01;
    /// APB data byte 0, holds the unique id after an eFuse probe
    pub const APB_DATA0: u8 = 0x4b;
    /// Port register select
    pub const PORT_SEL: u8 = 0x0e;
}

/// Unique id of parts whose eFuse needs no override
pub const EXPECTED_UNIQUE_ID: u8 = 0x19;

/// Whether the analog eFuse override has to be written
///
/// A non-zero device readback always forces the override, matching how
/// the production parts were qualified.
pub fn needs_efuse_override(readback: u8, unique_id: u8) -> bool {
    unique_id != EXPECTED_UNIQUE_ID || readback != 0
}

/// Outcome of the eFuse probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EfuseProbe {
    pub readback: u8,
    pub unique_id: u8,
    pub overridden: bool,
}

/// Temperature sensor code programmed by the eFuse
const EFUSE_TS_CODE: i16 = 2;

/// Ramp adjustment derived from the die temperature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RampPlan {
    /// Die temperature in degrees Celsius
    pub temperature_c: i16,
    /// TS code to program when ramp-up range is short
    pub up: Option<u8>,
    /// TS code to program when ramp-down range is short
    pub down: Option<u8>,
}

impl RampPlan {
    /// Plan from the raw sensor reading
    pub fn from_raw(raw: u8) -> Self {
        let temperature_c = 2 * raw as i16 - 273;
        // 190 / 11 in integer arithmetic
        let step = 17;
        let up_delta = (150 - temperature_c) / step + 1 - 4;
        let down_delta = (temperature_c - 30) / step + 1 - 7;

        Self {
            temperature_c,
            up: (up_delta > 0).then(|| (EFUSE_TS_CODE - up_delta).max(0) as u8),
            down: (down_delta > 0).then(|| (EFUSE_TS_CODE + down_delta).min(7) as u8),
        }
    }

    pub fn codes(&self) -> impl Iterator<Item = u8> {
        self.up.into_iter().chain(self.down)
    }
}

/// Selects the unique id for readback through the APB window
pub const EFUSE_PROBE: Script = Script::new(
    "des.efuse_probe",
    &[
        W(0x2b, 0x0a),
        W(0x2c, 0x0b),
        W(0x49, 0x0c),
        W(0x4a, 0x00),
        W(0x48, 0x1b),
    ],
);

/// Analog eFuse override, ends with a soft reset
pub const EFUSE_OVERRIDE: Script = Script::new(
    "des.efuse_override",
    &[
        W(0x0e, 0x03),
        W(0x61, 0x00),
        W(0x5a, 0x74),
        W(0x5f, 0x04),
        W(0x40, 0x3c),
        W(0x41, 0xf5),
        W(0x42, 0x21),
        W(0x40, 0x54),
        W(0x41, 0x43),
        W(0x42, 0x03),
        W(0x40, 0x58),
        W(0x41, 0x43),
        W(0x42, 0x03),
        W(0x40, 0x54),
        W(0x41, 0x05),
        W(0x42, 0x00),
        W(0x40, 0x58),
        W(0x41, 0x05),
        W(0x42, 0x00),
        W(0x40, 0x54),
        W(0x41, 0x06),
        W(0x42, 0x01),
        W(0x40, 0x58),
        W(0x41, 0x06),
        W(0x42, 0x01),
        W(0x40, 0x54),
        W(0x41, 0x37),
        W(0x42, 0x32),
        W(0x40, 0x58),
        W(0x41, 0x37),
        W(0x42, 0x32),
        W(0x40, 0x54),
        W(0x41, 0x8d),
        W(0x42, 0xff),
        W(0x40, 0x58),
        W(0x41, 0x8d),
        W(0x42, 0xff),
        W(0x40, 0x5c),
        W(0x41, 0x20),
        W(0x42, 0x3c),
        W(0x41, 0xa0),
        W(0x42, 0x3c),
        W(0x40, 0x38),
        W(0x41, 0x24),
        W(0x42, 0x61),
        W(0x41, 0x54),
        W(0x42, 0x61),
        W(0x41, 0x2c),
        W(0x42, 0x19),
        W(0x41, 0x5c),
        W(0x42, 0x19),
        W(0x41, 0x2e),
        W(0x42, 0x00),
        W(0x41, 0x5e),
        W(0x42, 0x00),
        W(0x40, 0x10),
        W(0x41, 0x18),
        W(0x42, 0x4b),
        W(0x41, 0x38),
        W(0x42, 0x4b),
        W(0x40, 0x54),
        W(0x41, 0x15),
        W(0x42, 0x00),
        W(0x40, 0x58),
        W(0x41, 0x15),
        W(0x42, 0x00),
        W(0x40, 0x54),
        W(0x41, 0x4a),
        W(0x42, 0x01),
        W(0x40, 0x58),
        W(0x41, 0x4a),
        W(0x42, 0x01),
        W(0x40, 0x54),
        W(0x41, 0xaa),
        W(0x42, 0x2c),
        W(0x40, 0x58),
        W(0x41, 0xaa),
        W(0x42, 0x2c),
        W(0x40, 0x54),
        W(0x41, 0xab),
        W(0x42, 0x2c),
        W(0x40, 0x58),
        W(0x41, 0xab),
        W(0x42, 0x2c),
        W(0x40, 0x54),
        W(0x41, 0xac),
        W(0x42, 0x4c),
        W(0x40, 0x58),
        W(0x41, 0xac),
        W(0x42, 0x4c),
        W(0x40, 0x54),
        W(0x41, 0xad),
        W(0x42, 0x4c),
        W(0x40, 0x58),
        W(0x41, 0xad),
        W(0x42, 0x4c),
        W(0x40, 0x54),
        W(0x41, 0xae),
        W(0x42, 0xac),
        W(0x40, 0x58),
        W(0x41, 0xae),
        W(0x42, 0xac),
        W(0x40, 0x54),
        W(0x41, 0xaf),
        W(0x42, 0xac),
        W(0x40, 0x58),
        W(0x41, 0xaf),
        W(0x42, 0xac),
        W(0x40, 0x10),
        W(0x41, 0x05),
        W(0x42, 0x0a),
        W(0x41, 0x25),
        W(0x42, 0x0a),
        W(0x40, 0x54),
        W(0x41, 0x89),
        W(0x42, 0x38),
        W(0x40, 0x58),
        W(0x41, 0x89),
        W(0x42, 0x38),
        W(0x40, 0x10),
        W(0x41, 0x1a),
        W(0x42, 0x08),
        W(0x41, 0x3a),
        W(0x42, 0x08),
        W(0x40, 0x38),
        W(0x41, 0x6f),
        W(0x42, 0x54),
        W(0x41, 0x70),
        W(0x42, 0x05),
        W(0x41, 0x80),
        W(0x42, 0x55),
        W(0x41, 0x81),
        W(0x42, 0x44),
        W(0x41, 0x82),
        W(0x42, 0x03),
        W(0x41, 0x86),
        W(0x42, 0x2c),
        W(0x41, 0x87),
        W(0x42, 0x06),
        W(0x41, 0x18),
        W(0x42, 0x32),
        W(0x41, 0x48),
        W(0x42, 0x32),
        W(0x41, 0x19),
        W(0x42, 0x0e),
        W(0x41, 0x49),
        W(0x42, 0x0e),
        W(0x41, 0x17),
        W(0x42, 0x72),
        W(0x41, 0x47),
        W(0x42, 0x72),
        W(0x41, 0x26),
        W(0x42, 0x87),
        W(0x41, 0x56),
        W(0x42, 0x87),
        W(0x40, 0x2c),
        W(0x41, 0x3d),
        W(0x42, 0xd5),
        W(0x41, 0x3e),
        W(0x42, 0x15),
        W(0x41, 0x7d),
        W(0x42, 0xd5),
        W(0x41, 0x7e),
        W(0x42, 0x15),
        W(0x41, 0x82),
        W(0x42, 0x01),
        W(0x41, 0x29),
        W(0x42, 0x00),
        W(0x40, 0x10),
        W(0x41, 0x41),
        W(0x42, 0x00),
        W(0x41, 0x42),
        W(0x42, 0x00),
        W(0x40, 0x24),
        W(0x41, 0x20),
        W(0x42, 0x00),
        W(0x41, 0x21),
        W(0x42, 0x00),
        W(0x41, 0x23),
        W(0x42, 0x30),
        W(0x40, 0x10),
        W(0x41, 0x14),
        W(0x42, 0x78),
        W(0x41, 0x35),
        W(0x42, 0x7e),
        W(0x40, 0x6c),
        W(0x41, 0x0d),
        W(0x42, 0x00),
        W(0x40, 0x1c),
        W(0x41, 0x08),
        W(0x42, 0x13),
        W(0x41, 0x28),
        W(0x42, 0x13),
        W(0x40, 0x14),
        W(0x41, 0x62),
        W(0x42, 0x31),
        W(0x41, 0x72),
        W(0x42, 0x31),
        W(0x41, 0x61),
        W(0x42, 0x26),
        W(0x41, 0x71),
        W(0x42, 0x26),
        W(reg::RESET_CTL, 0x01),
        Delay(30),
    ],
);

/// Latch the temperature sensor and point the data port at its result
pub const TEMP_SENSOR: Script = Script::new(
    "des.temp_sensor",
    &[
        W(0x40, 0x6c),
        W(0x41, 0x0d),
        W(0x42, 0x00),
        W(0x41, 0x13),
    ],
);

/// Override the TS code with the eFuse default
pub const TS_CODE_DEFAULT: Script = Script::new(
    "des.ts_code_default",
    &[
        W(0x40, 0x3c),
        W(0x41, 0xf5),
        W(0x42, ((EFUSE_TS_CODE as u8) << 4) + 1),
    ],
);

/// Hold both local display DTGs in reset
pub const HOLD_DTG_RESET: Script = Script::new(
    "des.hold_dtg_reset",
    &[
        W(0x40, 0x50),
        W(0x41, 0x32),
        W(0x42, 0x06),
        W(0x41, 0x62),
        W(0x42, 0x06),
    ],
);

pub const DISABLE_STREAM_MAPPING: Script = Script::new(
    "des.disable_stream_mapping",
    &[W(reg::PORT_SEL, 0x03), W(0xd0, 0x00), W(0xd7, 0x00)],
);

/// 2.7 Gbps, 4 lanes, no SSCG
pub const FORCE_DP_RATE: Script = Script::new(
    "des.force_dp_rate",
    &[
        W(0x40, 0x2c),
        W(0x41, 0x81),
        W(0x42, 0x60),
        W(0x41, 0x82),
        W(0x42, 0x03),
        W(0x40, 0x2c),
        W(0x41, 0x91),
        W(0x42, 0x0c),
        W(0x40, 0x30),
        W(0x41, 0x0f),
        W(0x42, 0x01),
        W(reg::RESET_CTL, 0x40),
    ],
);

/// Disable DP port 1, reset the DP TX PLL
pub const SETUP_PORTS: Script = Script::new(
    "des.setup_ports",
    &[
        W(reg::PORT_SEL, 0x12),
        W(0x46, 0x00),
        W(reg::PORT_SEL, 0x01),
        W(reg::RESET_CTL, 0x40),
    ],
);

/// Stream 0 to output port 0, stream 1 to port 1
pub const MAP_OUTPUT: Script = Script::new(
    "des.map_output",
    &[
        W(reg::PORT_SEL, 0x03),
        W(0xd0, 0x0c),
        W(0xd1, 0x0f),
        W(0xd6, 0x08),
        W(0xd7, 0x00),
        W(reg::PORT_SEL, 0x01),
    ],
);

/// Pixel clock M/N for port 0
pub const PCLK: Script = Script::new(
    "des.pclk",
    &[
        W(reg::PORT_SEL, 0x01),
        W(0xb1, 0x01),
        W(0xb2, 0xb6),
        W(0xb3, 0x30),
        W(0xb4, 0x05),
        W(0xb5, 0xc0),
        W(0xb6, 0x7a),
        W(0xb7, 0x10),
        W(reg::PORT_SEL, 0x01),
    ],
);

/// DTG bpp, sync polarity, hstart and hsync width
pub const DTG: Script = Script::new(
    "des.dtg",
    &[
        W(0x40, 0x50),
        W(0x41, 0x20),
        W(0x42, 0x93),
        W(0x41, 0x29),
        W(0x42, 0x82),
        W(0x41, 0x2a),
        W(0x42, 0x00),
        W(0x41, 0x2f),
        W(0x42, 0x40),
        W(0x41, 0x30),
        W(0x42, 0x20),
    ],
);

/// DP TX parameters through the APB window
pub const DPTX: Script = Script::new(
    "des.dptx",
    &[
        W(0x48, 0x01),
        // Bits per color
        W(0x48, 0x01),
        W(0x49, 0xa4),
        W(0x4a, 0x01),
        W(0x4b, 0x20),
        W(0x4c, 0x00),
        W(0x4d, 0x00),
        W(0x4e, 0x00),
        // Pixel width
        W(0x48, 0x01),
        W(0x49, 0xb8),
        W(0x4a, 0x01),
        W(0x4b, 0x04),
        W(0x4c, 0x00),
        W(0x4d, 0x00),
        W(0x4e, 0x00),
        // Mvid
        W(0x48, 0x01),
        W(0x49, 0xac),
        W(0x4a, 0x01),
        W(0x4b, 0x41),
        W(0x4c, 0xa1),
        W(0x4d, 0x00),
        W(0x4e, 0x00),
        // Nvid
        W(0x48, 0x01),
        W(0x49, 0xb4),
        W(0x4a, 0x01),
        W(0x4b, 0x00),
        W(0x4c, 0x80),
        W(0x4d, 0x00),
        W(0x4e, 0x00),
        // TU mode
        W(0x48, 0x01),
        W(0x49, 0xc8),
        W(0x4a, 0x01),
        W(0x4b, 0x00),
        W(0x4c, 0x00),
        W(0x4d, 0x00),
        W(0x4e, 0x00),
        // TU size
        W(0x48, 0x01),
        W(0x49, 0xb0),
        W(0x4a, 0x01),
        W(0x4b, 0x40),
        W(0x4c, 0x00),
        W(0x4d, 0x3c),
        W(0x4e, 0x08),
        // FIFO size
        W(0x48, 0x01),
        W(0x49, 0xc8),
        W(0x4a, 0x00),
        W(0x4b, 0x04),
        W(0x4c, 0x40),
        W(0x4d, 0x00),
        W(0x4e, 0x00),
        // Data count
        W(0x48, 0x01),
        W(0x49, 0xbc),
        W(0x4a, 0x01),
        W(0x4b, 0x70),
        W(0x4c, 0x08),
        W(0x4d, 0x00),
        W(0x4e, 0x00),
        // Progressive
        W(0x48, 0x01),
        W(0x49, 0xc0),
        W(0x4a, 0x01),
        W(0x4b, 0x00),
        W(0x4c, 0x00),
        W(0x4d, 0x00),
        W(0x4e, 0x00),
        // Sync polarity
        W(0x48, 0x01),
        W(0x49, 0xc4),
        W(0x4a, 0x01),
        W(0x4b, 0x0c),
        W(0x4c, 0x00),
        W(0x4d, 0x00),
        W(0x4e, 0x00),
    ],
);

/// Release both DTGs and set htotal
pub const RELEASE_DTG_RESET: Script = Script::new(
    "des.release_dtg_reset",
    &[
        W(0x40, 0x50),
        W(0x41, 0x32),
        W(0x42, 0x04),
        W(0x41, 0x62),
        W(0x42, 0x04),
        W(0x48, 0x01),
        W(0x49, 0x80),
        W(0x4a, 0x01),
        W(0x4b, 0x70),
        W(0x4c, 0x0d),
        W(0x4d, 0x00),
        W(0x4e, 0x00),
    ],
);

/// DP output on, INTB_IN enabled
pub const ENABLE_OUTPUT: Script = Script::new(
    "des.enable_output",
    &[
        W(0x48, 0x01),
        W(0x49, 0x84),
        W(0x4a, 0x00),
        W(0x4b, 0x01),
        W(0x4c, 0x00),
        W(0x4d, 0x00),
        W(0x4e, 0x00),
        W(0x44, 0x81),
    ],
);

/// Soft reset, status registers read back afterwards
pub const SOFT_RESET: Script = Script::new(
    "des.soft_reset",
    &[
        Delay(20),
        W(reg::RESET_CTL, 0x01),
        Delay(20),
        Read(0x01),
        Read(0x02),
        Read(0x03),
    ],
);

/// Reset only, used on suspend and shutdown
pub const RESET: Script = Script::new("des.reset", &[W(reg::RESET_CTL, 0x01)]);

/// Remote interrupt to INTB, port 0/1 interrupt routing in page 1
pub const INTERRUPT_FORWARDING: Script = Script::new(
    "des.interrupt_forwarding",
    &[
        W(0x44, 0x81),
        W(0x45, 0x80),
        W(0x52, 0x01),
        W(0x40, 0x01 << 2),
        W(0x41, 0x7e),
        W(0x42, 0x03),
        W(0x40, 0x01 << 2),
        W(0x41, 0x7f),
        W(0x42, 0x03),
    ],
);

/// Read the unique id and override the eFuse when needed
pub async fn probe_efuse<B: I2cBus, D: DelayNs>(
    regs: &mut Registers<'_, B>,
    delay: &mut D,
    dev: u8,
) -> Result<EfuseProbe, ScriptError> {
    let readback = regs
        .read(dev, reg::I2C_DEV_ID)
        .await
        .map_err(|error| ScriptError {
            script: EFUSE_PROBE.name,
            step: 0,
            error,
        })?;
    script::apply(regs, delay, dev, &EFUSE_PROBE).await?;
    let unique_id = regs
        .read(dev, reg::APB_DATA0)
        .await
        .map_err(|error| ScriptError {
            script: EFUSE_PROBE.name,
            step: EFUSE_PROBE.len(),
            error,
        })?;

    let overridden = needs_efuse_override(readback, unique_id);
    if overridden {
        script::apply(regs, delay, dev, &EFUSE_OVERRIDE).await?;
    }

    Ok(EfuseProbe {
        readback,
        unique_id,
        overridden,
    })
}

/// Measure die temperature and narrow the ramp range if needed
pub async fn calibrate_temp_ramp<B: I2cBus, D: DelayNs>(
    regs: &mut Registers<'_, B>,
    delay: &mut D,
    dev: u8,
    settle_ms: u32,
) -> Result<RampPlan, TransportError> {
    script::apply(regs, delay, dev, &TEMP_SENSOR)
        .await
        .map_err(|e| e.error)?;
    let raw = regs.read(dev, window::IND_ACC_DATA).await?;
    let plan = RampPlan::from_raw(raw);

    script::apply(regs, delay, dev, &TS_CODE_DEFAULT)
        .await
        .map_err(|e| e.error)?;
    for code in plan.codes() {
        regs.write(dev, window::IND_ACC_ADDR, 0xf5).await?;
        regs.read_modify_write(dev, window::IND_ACC_DATA, 0x70, code << 4)
            .await?;
        regs.read_modify_write(dev, window::IND_ACC_DATA, 0x01, 0x01)
            .await?;
        regs.write(dev, reg::RESET_CTL, 0x01).await?;
        delay.delay_ms(settle_ms).await;
    }

    #[cfg(feature = "defmt")]
    defmt::debug!("deserializer at {}C, ramp {}", plan.temperature_c, plan);

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_efuse_override_decision() {
        assert!(!needs_efuse_override(0x00, 0x19));
        assert!(needs_efuse_override(0x00, 0x18));
        assert!(needs_efuse_override(0x60, 0x19));
    }

    #[test]
    fn test_ramp_room_temperature() {
        // 27C: ramp-up range short, ramp-down fine
        let plan = RampPlan::from_raw(150);
        assert_eq!(plan.temperature_c, 27);
        assert_eq!(plan.up, Some(0));
        assert_eq!(plan.down, None);
    }

    #[test]
    fn test_ramp_hot_die() {
        // 167C: only the ramp-down range needs widening
        let plan = RampPlan::from_raw(220);
        assert_eq!(plan.temperature_c, 167);
        assert_eq!(plan.up, None);
        assert_eq!(plan.down, Some(4));

        // 127C: both ranges cover
        let plan = RampPlan::from_raw(200);
        assert_eq!(plan.codes().count(), 0);
    }

    #[test]
    fn test_ramp_codes_clamped() {
        for raw in 0..=u8::MAX {
            let plan = RampPlan::from_raw(raw);
            assert!(plan.codes().all(|c| c <= 7));
        }
    }

    #[test]
    fn test_efuse_override_ends_with_reset() {
        let steps = EFUSE_OVERRIDE.steps;
        assert_eq!(steps[steps.len() - 2], W(reg::RESET_CTL, 0x01));
        assert_eq!(steps[steps.len() - 1], Delay(30));
        assert_eq!(steps[0], W(reg::PORT_SEL, 0x03));
    }
}
