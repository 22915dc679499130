//! Configuration type definitions
//!
//! Defaults match the constants the bridge and touch MCU were qualified
//! with; a config file only needs to name what differs.

use fpdlink_protocol::ChecksumPolicy;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How touch reports are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DeliveryMode {
    /// MCU pulls an interrupt line when a report is pending
    #[default]
    Interrupt,
    /// Fetch on a fixed period, dedup repeated frames
    Polling,
}

/// Touch panel resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PanelGeometry {
    pub width: u16,
    pub height: u16,
}

impl Default for PanelGeometry {
    fn default() -> Self {
        Self {
            width: 2880,
            height: 1620,
        }
    }
}

/// Shared I2C bus settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BusConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
    /// Extra attempts after a transient failure
    pub retries: u8,
    /// Per-transaction response timeout
    pub timeout_ms: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            frequency: 400_000,
            retries: 5,
            timeout_ms: 50,
        }
    }
}

/// Serializer/deserializer bring-up settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BridgeConfig {
    /// 7-bit address of the DS90UB983 serializer
    pub serializer_addr: u8,
    /// 7-bit address of the DS90UB984 deserializer
    pub deserializer_addr: u8,
    /// 7-bit address of the touch/motor MCU behind the pass-through
    pub mcu_addr: u8,
    /// Settle time after resets and PLL changes
    pub settle_ms: u32,
    /// Wait between lock status samples
    pub training_retry_ms: u32,
    /// Drive the motor accessory after the link comes up
    pub motor: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            serializer_addr: 0x14,
            deserializer_addr: 0x30,
            mcu_addr: 0x78,
            settle_ms: 20,
            training_retry_ms: 20,
            motor: true,
        }
    }
}

/// Touch input service settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TouchConfig {
    pub mode: DeliveryMode,
    /// Mirror both axes (panel mounted upside down)
    pub revert: bool,
    /// Periodically re-acknowledge the interrupt source
    pub ack_thread: bool,
    /// Polling period
    pub poll_interval_ms: u32,
    /// Sleep when the link is not ready
    pub not_ready_backoff_ms: u32,
    /// Acknowledger period
    pub ack_interval_ms: u32,
    /// Identical polled frames before a release is synthesized
    pub release_threshold: u16,
    /// Reject frames with a bad XOR checksum
    pub enforce_checksum: bool,
    pub panel: PanelGeometry,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            mode: DeliveryMode::Interrupt,
            revert: true,
            ack_thread: true,
            poll_interval_ms: 10,
            not_ready_backoff_ms: 10,
            ack_interval_ms: 50,
            release_threshold: 50,
            enforce_checksum: false,
            panel: PanelGeometry::default(),
        }
    }
}

impl TouchConfig {
    pub fn checksum_policy(&self) -> ChecksumPolicy {
        if self.enforce_checksum {
            ChecksumPolicy::Enforce
        } else {
            ChecksumPolicy::Ignore
        }
    }
}

/// Complete system configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SystemConfig {
    pub bus: BusConfig,
    pub bridge: BridgeConfig,
    pub touch: TouchConfig,
}

impl SystemConfig {
    /// Create a configuration with all defaults
    pub fn new() -> Self {
        Self::default()
    }
}
