//! Serializer and deserializer register tables

pub mod des984;
pub mod ser983;

pub use des984::{EfuseProbe, RampPlan};
pub use ser983::{StrapProfile, StrapRate};
