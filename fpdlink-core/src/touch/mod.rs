//! Touch report pipeline
//!
//! Raw frames from any [`TouchSource`](crate::traits::TouchSource) go
//! through the same steps: validation, axis transform, duplicate
//! suppression (polling only), then slot-by-slot delivery to an
//! [`InputSink`](crate::traits::InputSink).

pub mod history;
pub mod pipeline;
pub mod service;
pub mod session;
pub mod slots;
pub mod transform;

pub use history::{Observation, ReportHistory};
pub use pipeline::{Delivery, ReportPipeline};
pub use service::{Outcome, ServiceError, TouchService};
pub use session::TouchSession;
pub use slots::SlotTable;
pub use transform::AxisTransform;
