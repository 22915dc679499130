//! Events that trigger link state transitions

/// Events that can trigger link state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    // Lifecycle requests
    /// Initial bring-up requested
    Start,
    /// Bring-up after a suspend
    Resume,
    /// Suspend requested; readiness drops immediately
    Suspend,
    /// Forget everything, back to power-on state
    Reinit,

    // Sequencer progress
    /// Serializer and deserializer scripts completed
    ScriptsApplied,
    /// Status sample showed no video lock
    NotLocked,
    /// Output stages completed after lock
    OutputEnabled,

    // Faults
    /// A mandatory bus transaction failed
    TransportFailed,
}

impl LinkEvent {
    /// Check if this event comes from outside the sequencer
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            LinkEvent::Start | LinkEvent::Resume | LinkEvent::Suspend | LinkEvent::Reinit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_events() {
        assert!(LinkEvent::Start.is_request());
        assert!(LinkEvent::Suspend.is_request());
        assert!(!LinkEvent::NotLocked.is_request());
        assert!(!LinkEvent::TransportFailed.is_request());
    }
}
