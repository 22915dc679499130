//! Panel coordinate transform

use crate::config::PanelGeometry;
use fpdlink_protocol::PointRecord;

/// Optional mirroring of both axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisTransform {
    panel: PanelGeometry,
    revert: bool,
}

impl AxisTransform {
    pub fn new(panel: PanelGeometry, revert: bool) -> Self {
        Self { panel, revert }
    }

    /// Transform one coordinate pair
    ///
    /// With `revert` set, `x' = width - x` and `y' = height - y`. Values
    /// beyond the panel clamp to zero instead of wrapping.
    pub fn apply(&self, x: u16, y: u16) -> (u16, u16) {
        if self.revert {
            (
                self.panel.width.saturating_sub(x),
                self.panel.height.saturating_sub(y),
            )
        } else {
            (x, y)
        }
    }

    pub fn apply_point(&self, point: &mut PointRecord) {
        let (x, y) = self.apply(point.x, point.y);
        point.x = x;
        point.y = y;
    }
}
