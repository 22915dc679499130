//! Registered input device plus slot state

use fpdlink_protocol::{PointRecord, TouchReport};

use super::slots::SlotTable;
use crate::traits::input::{ContactUpdate, InputCapabilities, InputSink, PRESSURE_MAX};

/// Contact size reported for a finger that is down
const CONTACT_MAJOR: u16 = 5;

/// Sink state for one touch device
pub struct TouchSession<S: InputSink> {
    sink: S,
    caps: InputCapabilities,
    slots: SlotTable,
    registered: bool,
}

impl<S: InputSink> TouchSession<S> {
    pub fn new(sink: S, caps: InputCapabilities) -> Self {
        Self {
            sink,
            caps,
            slots: SlotTable::new(),
            registered: false,
        }
    }

    /// Register with the sink; does nothing if already registered
    pub fn register(&mut self) -> Result<(), S::Error> {
        if !self.registered {
            self.sink.register(&self.caps)?;
            self.slots.clear();
            self.registered = true;
        }
        Ok(())
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Report every point of a validated report as one frame
    pub fn forward(&mut self, report: &TouchReport) -> Result<usize, S::Error> {
        for point in &report.points {
            self.report_point(point)?;
        }
        self.sink.sync_frame()?;
        Ok(report.points.len())
    }

    /// Report a synthesized release
    ///
    /// Slots still active but missing from the report are released in the
    /// same frame, so the table ends up empty.
    pub fn forward_release(&mut self, report: &TouchReport) -> Result<(), S::Error> {
        for point in &report.points {
            self.report_point(point)?;
        }
        self.release_remaining()?;
        self.sink.sync_frame()
    }

    /// Lift all fingers and unregister
    pub fn shutdown(&mut self) -> Result<(), S::Error> {
        if !self.registered {
            return Ok(());
        }
        if self.slots.active_count() > 0 {
            self.release_remaining()?;
            self.sink.sync_frame()?;
        }
        self.registered = false;
        self.sink.unregister()
    }

    fn report_point(&mut self, point: &PointRecord) -> Result<(), S::Error> {
        let update = contact_for(point);
        self.sink.report_contact(&update)?;
        self.slots.set(update.slot, update.active);
        Ok(())
    }

    fn release_remaining(&mut self) -> Result<(), S::Error> {
        let remaining = self.slots;
        for slot in remaining.active_slots() {
            self.sink.report_contact(&released(slot))?;
            self.slots.set(slot, false);
        }
        Ok(())
    }
}

/// Sink update for one point record
fn contact_for(point: &PointRecord) -> ContactUpdate {
    if point.status.is_release() {
        ContactUpdate {
            x: point.x,
            y: point.y,
            ..released(point.id)
        }
    } else {
        ContactUpdate {
            slot: point.id,
            active: true,
            x: point.x,
            y: point.y,
            touch_major: CONTACT_MAJOR,
            width_major: CONTACT_MAJOR,
            pressure: PRESSURE_MAX,
        }
    }
}

fn released(slot: u8) -> ContactUpdate {
    ContactUpdate {
        slot,
        active: false,
        x: 0,
        y: 0,
        touch_major: 0,
        width_major: 0,
        pressure: 0,
    }
}
