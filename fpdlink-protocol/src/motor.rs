//! Motor accessory commands
//!
//! Frame format (7 bytes, written to the MCU):
//! - OPCODE (1 byte): 0x23
//! - LENGTH (2 bytes, big-endian): 4
//! - VALUE (3 bytes, big-endian): command value
//! - CHECKSUM (1 byte): XOR of every preceding byte
//!
//! After a command the MCU reports back a 7-byte status block read from
//! register [`MOTOR_STATUS_REG`].

use crate::report::xor_checksum;

/// Opcode of a motor command frame
pub const MOTOR_OPCODE: u8 = 0x23;

/// Bytes in a motor command frame
pub const MOTOR_FRAME_LEN: usize = 7;

/// Register holding the status block
pub const MOTOR_STATUS_REG: u8 = 0x63;

/// Bytes in the status block
pub const MOTOR_STATUS_LEN: usize = 7;

/// Commands understood by the motor controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorCommand {
    Open,
    Close,
}

impl MotorCommand {
    /// 24-bit command value
    pub const fn value(self) -> u32 {
        match self {
            MotorCommand::Open => 0x00_50_ff,
            MotorCommand::Close => 0x00_00_ff,
        }
    }
}

/// Encoded motor command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorFrame {
    bytes: [u8; MOTOR_FRAME_LEN],
}

impl MotorFrame {
    pub fn new(command: MotorCommand) -> Self {
        let [_, v2, v1, v0] = command.value().to_be_bytes();
        let mut bytes = [MOTOR_OPCODE, 0x00, 0x04, v2, v1, v0, 0];
        bytes[MOTOR_FRAME_LEN - 1] = xor_checksum(&bytes[..MOTOR_FRAME_LEN - 1]);
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; MOTOR_FRAME_LEN] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_frame() {
        let frame = MotorFrame::new(MotorCommand::Open);
        let expected_checksum = 0x23 ^ 0x04 ^ 0x50 ^ 0xff;
        assert_eq!(
            frame.as_bytes(),
            &[0x23, 0x00, 0x04, 0x00, 0x50, 0xff, expected_checksum]
        );
    }

    #[test]
    fn test_close_frame() {
        let frame = MotorFrame::new(MotorCommand::Close);
        assert_eq!(
            frame.as_bytes(),
            &[0x23, 0x00, 0x04, 0x00, 0x00, 0xff, 0x23 ^ 0x04 ^ 0xff]
        );
    }

    #[test]
    fn test_frame_checksum_closes_to_zero() {
        for command in [MotorCommand::Open, MotorCommand::Close] {
            assert_eq!(xor_checksum(MotorFrame::new(command).as_bytes()), 0);
        }
    }
}
