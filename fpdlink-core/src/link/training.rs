//! Link training retry policy
//!
//! After the bring-up scripts the deserializer needs time to lock onto the
//! video stream. The sequencer samples the lock status up to
//! [`MAX_TRAINING_SAMPLES`] times, resetting the video input once after the
//! first miss.

/// Upper bound on lock status samples per bring-up
pub const MAX_TRAINING_SAMPLES: u8 = 10;

/// Number of lock samples already found unlocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrainingAttempt(u8);

impl TrainingAttempt {
    /// No samples taken yet
    pub const FIRST: Self = Self(0);

    /// Misses so far
    pub fn misses(self) -> u8 {
        self.0
    }

    /// Samples taken once the next one is read
    pub fn samples(self) -> u8 {
        self.0 + 1
    }

    /// Attempt after another miss, `None` once the budget is spent
    pub fn next(self) -> Option<Self> {
        let misses = self.0 + 1;
        (misses < MAX_TRAINING_SAMPLES).then_some(Self(misses))
    }

    /// Decide what to do with the sample taken at this attempt
    pub fn after_sample(self, locked: bool) -> TrainingAction {
        if locked {
            return TrainingAction::Proceed;
        }
        match self.next() {
            Some(_) => TrainingAction::Retry {
                reset_video_input: self.0 == 0,
            },
            None => TrainingAction::GiveUp,
        }
    }
}

/// What the sequencer does after a lock sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrainingAction {
    /// Video locked, continue with the output stages
    Proceed,
    /// Wait and sample again
    Retry { reset_video_input: bool },
    /// Budget spent without lock
    GiveUp,
}
