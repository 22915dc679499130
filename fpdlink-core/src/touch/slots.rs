//! Persistent contact slot table

use fpdlink_protocol::MAX_POINTS;

/// Which slots currently hold a finger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotTable {
    active: [bool; MAX_POINTS],
}

impl SlotTable {
    pub const fn new() -> Self {
        Self {
            active: [false; MAX_POINTS],
        }
    }

    /// Record a slot's state; out-of-range slots are ignored
    pub fn set(&mut self, slot: u8, active: bool) {
        if let Some(s) = self.active.get_mut(slot as usize) {
            *s = active;
        }
    }

    pub fn is_active(&self, slot: u8) -> bool {
        self.active.get(slot as usize).copied().unwrap_or(false)
    }

    /// Slots holding a finger, lowest first
    pub fn active_slots(&self) -> impl Iterator<Item = u8> + '_ {
        self.active
            .iter()
            .enumerate()
            .filter(|(_, &a)| a)
            .map(|(i, _)| i as u8)
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|&&a| a).count()
    }

    pub fn clear(&mut self) {
        self.active = [false; MAX_POINTS];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_clear() {
        let mut table = SlotTable::new();
        table.set(2, true);
        table.set(7, true);
        assert_eq!(table.active_count(), 2);
        assert!(table.active_slots().eq([2u8, 7].into_iter()));

        table.set(2, false);
        assert!(!table.is_active(2));
        table.clear();
        assert_eq!(table.active_count(), 0);
    }

    #[test]
    fn test_out_of_range_ignored() {
        let mut table = SlotTable::new();
        table.set(10, true);
        assert_eq!(table.active_count(), 0);
        assert!(!table.is_active(200));
    }
}
