//! Multi-touch input sink trait

use crate::config::PanelGeometry;
use fpdlink_protocol::MAX_POINTS;

/// Largest reported contact pressure
pub const PRESSURE_MAX: u16 = 100;

/// Largest reported touch/width major axis
pub const MAJOR_MAX: u16 = 200;

/// Axis ranges and slot count announced when the sink is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputCapabilities {
    /// X range is `0..=x_max`
    pub x_max: u16,
    /// Y range is `0..=y_max`
    pub y_max: u16,
    pub touch_major_max: u16,
    pub width_major_max: u16,
    pub pressure_max: u16,
    /// Number of contact slots
    pub slots: u8,
    /// Whether the device also reports a touch button
    pub button_touch: bool,
}

impl InputCapabilities {
    /// Capabilities of a panel with the given resolution
    ///
    /// Mirrored coordinates are `width - x`, so with `revert` set the range
    /// reaches `width` itself.
    pub fn for_panel(panel: &PanelGeometry, revert: bool) -> Self {
        let edge = if revert { 0 } else { 1 };
        Self {
            x_max: panel.width.saturating_sub(edge),
            y_max: panel.height.saturating_sub(edge),
            touch_major_max: MAJOR_MAX,
            width_major_max: MAJOR_MAX,
            pressure_max: PRESSURE_MAX,
            slots: MAX_POINTS as u8,
            button_touch: true,
        }
    }
}

/// State of one contact slot within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ContactUpdate {
    pub slot: u8,
    /// Finger present in this slot
    pub active: bool,
    pub x: u16,
    pub y: u16,
    pub touch_major: u16,
    pub width_major: u16,
    pub pressure: u16,
}

/// Trait for multi-touch input consumers
///
/// Contacts are reported one slot at a time; a frame is complete once
/// [`InputSink::sync_frame`] is called.
pub trait InputSink {
    /// Error type for sink operations
    type Error: core::fmt::Debug;

    /// Announce the device and its axis ranges
    fn register(&mut self, caps: &InputCapabilities) -> Result<(), Self::Error>;

    /// Report the state of one slot
    fn report_contact(&mut self, update: &ContactUpdate) -> Result<(), Self::Error>;

    /// Close the current frame
    fn sync_frame(&mut self) -> Result<(), Self::Error>;

    /// Withdraw the device
    fn unregister(&mut self) -> Result<(), Self::Error>;
}
