//! Validation, transform and dedup of fetched frames

use fpdlink_protocol::{ChecksumPolicy, RawReport, ReportError, TouchReport};

use super::history::{Observation, ReportHistory};
use super::transform::AxisTransform;
use crate::config::{DeliveryMode, TouchConfig};

/// Result of running one frame through the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Delivery {
    /// Validated report with transformed coordinates
    Forward(TouchReport),
    /// Every point released at the origin
    SyntheticRelease(TouchReport),
    /// Duplicate of the previous polled frame
    Suppressed,
}

/// Per-mode processing shared by every report source
#[derive(Debug, Clone)]
pub struct ReportPipeline {
    policy: ChecksumPolicy,
    transform: AxisTransform,
    /// Only present in polling mode
    history: Option<ReportHistory>,
}

impl ReportPipeline {
    pub fn new(config: &TouchConfig) -> Self {
        let history = match config.mode {
            DeliveryMode::Polling => Some(ReportHistory::new(config.release_threshold)),
            DeliveryMode::Interrupt => None,
        };
        Self {
            policy: config.checksum_policy(),
            transform: AxisTransform::new(config.panel, config.revert),
            history,
        }
    }

    /// Process one raw frame
    ///
    /// Invalid frames are rejected before dedup and leave the history
    /// untouched.
    pub fn process(&mut self, raw: &RawReport) -> Result<Delivery, ReportError> {
        let mut report = raw.decode(self.policy)?;

        if let Some(history) = self.history.as_mut() {
            match history.observe(raw) {
                Observation::Fresh => {}
                Observation::Repeat => return Ok(Delivery::Suppressed),
                Observation::SynthesizeRelease => {
                    return Ok(Delivery::SyntheticRelease(report.released()))
                }
            }
        }

        for point in report.points.iter_mut() {
            self.transform.apply_point(point);
        }
        Ok(Delivery::Forward(report))
    }

    /// Drop dedup state, e.g. after the link was re-established
    pub fn reset(&mut self) {
        if let Some(history) = self.history.as_mut() {
            history.reset();
        }
    }
}
