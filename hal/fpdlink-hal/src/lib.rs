//! fpdlink Hardware Abstraction Layer
//!
//! This crate defines the bus abstraction shared by the bridge sequencer and
//! the touch service. Every device in the system (serializer, deserializer
//! and the MCU behind the pass-through) hangs off one physical I2C bus, so
//! the whole firmware talks to hardware through a single [`I2cBus`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  fpdlink-drivers (transport, scripts)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  fpdlink-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  Retrying<B>  │──────▶│  Embedded<T>  │──▶ embedded-hal-async I2c
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`i2c::I2cBus`] - async I2C master operations
//! - [`i2c::BusError`] - classification of bus failures

#![no_std]
#![deny(unsafe_code)]

pub mod i2c;
pub mod retry;

// Re-export key items at crate root for convenience
pub use i2c::{BusError, BusErrorKind, Embedded, I2cBus, I2cConfig};
pub use retry::Retrying;
