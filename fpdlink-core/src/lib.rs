//! Board-agnostic core logic for the bridge firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Link state machine and training policy
//! - Readiness gate (bus lock + lock-free readiness flag)
//! - Touch pipeline (validation, axis transform, dedup, slot tracking)
//! - Input sink and report source traits
//! - Configuration type definitions

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod gate;
pub mod link;
pub mod touch;
pub mod traits;
