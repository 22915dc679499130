//! Hardware abstraction traits
//!
//! These traits define the interface between the touch pipeline and
//! platform-specific implementations.

pub mod input;
pub mod source;

pub use input::{ContactUpdate, InputCapabilities, InputSink};
pub use source::TouchSource;
