//! Driver implementations for the DS90UB983/DS90UB984 bridge
//!
//! This crate provides the hardware-facing half of the firmware, built on
//! the [`fpdlink_hal::I2cBus`] abstraction and the state kept in
//! `fpdlink-core`:
//!
//! - Register transport (direct, indirect page, read-modify-write)
//! - Register scripts and the serializer/deserializer tables
//! - Bridge sequencer (bring-up, link training, suspend, shutdown)
//! - Touch MCU link (session setup, report fetch, acknowledge, motor)
//! - Touch report sources (interrupt and polling) and the acknowledger

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod mcu;
pub mod script;
pub mod sequencer;
pub mod serdes;
pub mod touch;
pub mod transport;

pub use transport::{Registers, TransportError};
