//! Link state machine
//!
//! Everything the bridge does is a function of the current link state and
//! an event. The state is owned by the readiness gate and only changes
//! while the bus lock is held.

pub mod events;
pub mod machine;
pub mod training;

pub use events::LinkEvent;
pub use machine::{FailureReason, LinkState};
pub use training::{TrainingAction, TrainingAttempt, MAX_TRAINING_SAMPLES};
