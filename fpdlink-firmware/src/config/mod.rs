//! Configuration loading
//!
//! The configuration is compiled in from `fpdlink.toml` and parsed at boot
//! with the no_std parser from `fpdlink-core`.

use defmt::*;

use fpdlink_core::config::{parse_config, SystemConfig};

/// Embedded configuration (compiled into firmware)
/// Edit fpdlink.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../../fpdlink.toml");

/// Parse the embedded configuration, falling back to defaults
///
/// build.rs validates the file, so the fallback only triggers if the
/// on-target parser disagrees with it.
pub fn load() -> SystemConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Parsed embedded configuration successfully");
            config
        }
        Err(e) => {
            error!("Failed to parse embedded config: {}", e);
            error!("Using default configuration");
            SystemConfig::new()
        }
    }
}
