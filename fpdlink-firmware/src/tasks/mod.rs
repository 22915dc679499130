//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.
//! All bus access goes through the shared [`Gate`](crate::board::Gate).

pub mod ack;
pub mod bridge;
pub mod input;
pub mod touch;

pub use ack::ack_task;
pub use bridge::bridge_task;
pub use input::input_task;
pub use touch::{interrupt_touch_task, polling_touch_task};
