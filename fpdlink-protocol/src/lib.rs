//! Touch MCU Protocol
//!
//! This crate defines the I2C protocol spoken by the auxiliary MCU that sits
//! behind the deserializer. The host reaches it through the serializer's
//! I2C pass-through at address 0x78.
//!
//! # Protocol Overview
//!
//! A touch report is fetched with one combined transaction: the host writes
//! a single command byte and reads back a fixed 65-byte frame:
//! ```text
//! ┌─────┬──────────┬────────┬──────────────────────────┬──────────┐
//! │ CMD │ LENGTH   │ POINTS │ 10 × POINT RECORD        │ CHECKSUM │
//! │ 1B  │ 2B (BE)  │ 1B     │ id,status,x_h,x_l,y_h,y_l│ 1B       │
//! └─────┴──────────┴────────┴──────────────────────────┴──────────┘
//! ```
//!
//! The same MCU also drives a motorised accessory through a short
//! checksummed write frame (see [`motor`]).

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod motor;
pub mod report;

pub use motor::{MotorCommand, MotorFrame, MOTOR_FRAME_LEN, MOTOR_STATUS_LEN, MOTOR_STATUS_REG};
pub use report::{
    xor_checksum, ChecksumPolicy, PointRecord, PointStatus, RawReport, ReportError, TouchReport,
    COMMAND_QUERY, COMMAND_TP_REPORT, MAX_POINTS, REPORT_DATA_LENGTH, REPORT_SIZE, STATUS_MOVE,
    STATUS_PRESS, STATUS_RELEASE,
};
