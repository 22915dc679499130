//! Duplicate suppression for polled reports
//!
//! A polled MCU keeps returning its last frame when nothing changes. If a
//! finger was down in that frame and the MCU never sends a release, the
//! contact would stick forever, so after a run of identical frames one
//! release is synthesized.

use fpdlink_protocol::RawReport;

/// Identical frames before a release is synthesized
pub const DEFAULT_RELEASE_THRESHOLD: u16 = 50;

/// What to do with an observed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Observation {
    /// Differs from the previous frame, forward it
    Fresh,
    /// Same as the previous frame, drop it
    Repeat,
    /// Repeat run reached the threshold, send one release
    SynthesizeRelease,
}

/// Last frame plus repeat bookkeeping
#[derive(Debug, Clone)]
pub struct ReportHistory {
    last: Option<RawReport>,
    repeats: u16,
    release_sent: bool,
    threshold: u16,
}

impl Default for ReportHistory {
    fn default() -> Self {
        Self::new(DEFAULT_RELEASE_THRESHOLD)
    }
}

impl ReportHistory {
    pub fn new(threshold: u16) -> Self {
        Self {
            last: None,
            repeats: 0,
            release_sent: false,
            threshold,
        }
    }

    /// Compare a frame byte-for-byte with the previous one
    pub fn observe(&mut self, raw: &RawReport) -> Observation {
        if self.last.as_ref() == Some(raw) {
            self.repeats = self.repeats.saturating_add(1);
            if self.repeats >= self.threshold && !self.release_sent {
                self.release_sent = true;
                return Observation::SynthesizeRelease;
            }
            return Observation::Repeat;
        }

        self.last = Some(*raw);
        self.repeats = 0;
        self.release_sent = false;
        Observation::Fresh
    }

    /// Identical frames seen since the last fresh one
    pub fn repeats(&self) -> u16 {
        self.repeats
    }

    pub fn release_sent(&self) -> bool {
        self.release_sent
    }

    /// Forget the previous frame
    pub fn reset(&mut self) {
        self.last = None;
        self.repeats = 0;
        self.release_sent = false;
    }
}
