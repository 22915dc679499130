//! Link state definition

use super::events::LinkEvent;
use super::training::TrainingAttempt;

/// Bridge link states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// Power-on state, nothing programmed
    #[default]
    Uninitialized,
    /// Reset and configuration scripts running
    BringingUp,
    /// Waiting for the deserializer to lock on the video stream
    TrainingRetry(TrainingAttempt),
    /// Link up, pass-through usable
    Ready,
    /// Both chips held in reset
    Suspended,
    /// Bring-up aborted; terminal until re-init
    Failed(FailureReason),
}

/// Why bring-up ended in [`LinkState::Failed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FailureReason {
    /// A mandatory register access failed
    Transport,
    /// No video lock within the sample budget
    TrainingTimeout,
}

impl LinkState {
    /// Check if the touch side may use the pass-through
    pub fn is_ready(&self) -> bool {
        matches!(self, LinkState::Ready)
    }

    /// Check if a bring-up is in flight
    pub fn is_bringing_up(&self) -> bool {
        matches!(self, LinkState::BringingUp | LinkState::TrainingRetry(_))
    }

    /// Check if this is a failure state
    pub fn is_failed(&self) -> bool {
        matches!(self, LinkState::Failed(_))
    }

    /// Process an event and return the next state
    pub fn transition(self, event: LinkEvent) -> Self {
        use LinkEvent::*;
        use LinkState::*;

        match (self, event) {
            // Bring-up entry
            (Uninitialized, Start) => BringingUp,
            (Suspended, Resume) => BringingUp,

            // Scripts done, start sampling lock status
            (BringingUp, ScriptsApplied) => TrainingRetry(TrainingAttempt::FIRST),

            // Training
            (TrainingRetry(attempt), NotLocked) => match attempt.next() {
                Some(next) => TrainingRetry(next),
                None => Failed(FailureReason::TrainingTimeout),
            },
            (TrainingRetry(_), OutputEnabled) => Ready,

            // Faults during bring-up
            (BringingUp | TrainingRetry(_), TransportFailed) => Failed(FailureReason::Transport),

            // Suspend cancels an in-flight bring-up too
            (BringingUp | TrainingRetry(_) | Ready, Suspend) => Suspended,

            // Re-init from anywhere
            (_, Reinit) => Uninitialized,

            // Default: stay in current state
            _ => self,
        }
    }
}
