//! Simple TOML parser for bridge configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! `fpdlink.toml`. It does NOT support the full TOML spec.
//!
//! Supported features:
//! - Key = value pairs (string, integer, boolean)
//! - Hexadecimal integers (`0x14`) and `_` digit separators
//! - [section] and [section.subsection] headers
//! - Comments (# ...)
//!
//! NOT supported:
//! - Arrays and inline tables
//! - Multi-line strings
//! - Dotted keys outside section headers

use super::types::{DeliveryMode, SystemConfig};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Invalid value type or out of range
    InvalidValue,
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Bus,
    Bridge,
    Touch,
    TouchPanel,
}

/// Parse TOML configuration into SystemConfig
///
/// Keys that are absent keep their defaults; unknown keys are ignored.
pub fn parse_config(input: &str) -> Result<SystemConfig, ParseError> {
    let mut config = SystemConfig::new();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = parse_section_header(&line[1..line.len() - 1])?;
            continue;
        }

        if let Some((key, value)) = parse_key_value(line) {
            apply_value(section, key, value, &mut config)?;
        }
    }

    Ok(config)
}

/// Parse section header like "bridge" or "touch.panel"
fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header.trim() {
        "bus" => Ok(Section::Bus),
        "bridge" => Ok(Section::Bridge),
        "touch" => Ok(Section::Touch),
        "touch.panel" => Ok(Section::TouchPanel),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Split "key = value", dropping a trailing comment
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    let value = match value.find('#') {
        // Keep '#' that sits inside a string
        Some(hash_pos) if value[..hash_pos].matches('"').count() % 2 == 0 => {
            value[..hash_pos].trim()
        }
        _ => value,
    };

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a string value (removes quotes)
fn parse_string(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Parse a decimal or `0x` hexadecimal integer
fn parse_int<T: TryFrom<u32>>(value: &str) -> Result<T, ParseError> {
    let (digits, radix) = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (value, 10),
    };

    let mut result: u32 = 0;
    let mut seen_digit = false;
    for c in digits.chars() {
        if c == '_' && seen_digit {
            continue;
        }
        let d = c.to_digit(radix).ok_or(ParseError::InvalidValue)?;
        result = result
            .checked_mul(radix)
            .and_then(|r| r.checked_add(d))
            .ok_or(ParseError::InvalidValue)?;
        seen_digit = true;
    }
    if !seen_digit {
        return Err(ParseError::InvalidValue);
    }

    T::try_from(result).map_err(|_| ParseError::InvalidValue)
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

fn parse_mode(value: &str) -> Result<DeliveryMode, ParseError> {
    match parse_string(value) {
        "interrupt" | "irq" => Ok(DeliveryMode::Interrupt),
        "polling" | "poll" => Ok(DeliveryMode::Polling),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Only 7-bit addresses are valid on the bus
fn parse_address(value: &str) -> Result<u8, ParseError> {
    let addr: u8 = parse_int(value)?;
    if addr > 0x7f {
        return Err(ParseError::InvalidValue);
    }
    Ok(addr)
}

/// Apply a key-value pair to the current section
fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut SystemConfig,
) -> Result<(), ParseError> {
    match section {
        Section::Bus => {
            let b = &mut config.bus;
            match key {
                "frequency" => b.frequency = parse_int(value)?,
                "retries" => b.retries = parse_int(value)?,
                "timeout_ms" => b.timeout_ms = parse_int(value)?,
                _ => {}
            }
        }
        Section::Bridge => {
            let b = &mut config.bridge;
            match key {
                "serializer_addr" => b.serializer_addr = parse_address(value)?,
                "deserializer_addr" => b.deserializer_addr = parse_address(value)?,
                "mcu_addr" => b.mcu_addr = parse_address(value)?,
                "settle_ms" => b.settle_ms = parse_int(value)?,
                "training_retry_ms" => b.training_retry_ms = parse_int(value)?,
                "motor" => b.motor = parse_bool(value)?,
                _ => {}
            }
        }
        Section::Touch => {
            let t = &mut config.touch;
            match key {
                "mode" => t.mode = parse_mode(value)?,
                "revert" => t.revert = parse_bool(value)?,
                "ack_thread" => t.ack_thread = parse_bool(value)?,
                "poll_interval_ms" => t.poll_interval_ms = parse_int(value)?,
                "not_ready_backoff_ms" => t.not_ready_backoff_ms = parse_int(value)?,
                "ack_interval_ms" => t.ack_interval_ms = parse_int(value)?,
                "release_threshold" => t.release_threshold = parse_int(value)?,
                "enforce_checksum" => t.enforce_checksum = parse_bool(value)?,
                _ => {}
            }
        }
        Section::TouchPanel => {
            let p = &mut config.touch.panel;
            match key {
                "width" => p.width = parse_int(value)?,
                "height" => p.height = parse_int(value)?,
                _ => {}
            }
        }
        Section::Root => {
            // No root-level keys
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int_forms() {
        assert_eq!(parse_int::<u8>("0x14"), Ok(0x14));
        assert_eq!(parse_int::<u8>("0X30"), Ok(0x30));
        assert_eq!(parse_int::<u32>("400_000"), Ok(400_000));
        assert_eq!(parse_int::<u8>("300"), Err(ParseError::InvalidValue));
        assert_eq!(parse_int::<u8>("0x"), Err(ParseError::InvalidValue));
        assert_eq!(parse_int::<u8>("_1"), Err(ParseError::InvalidValue));
        assert_eq!(parse_int::<u16>("-1"), Err(ParseError::InvalidValue));
    }

    #[test]
    fn test_parse_key_value_strips_comment() {
        assert_eq!(
            parse_key_value("mode = \"polling\" # fallback"),
            Some(("mode", "\"polling\""))
        );
        assert_eq!(parse_key_value("mode ="), None);
    }

    #[test]
    fn test_parse_section_header() {
        assert_eq!(parse_section_header("bridge"), Ok(Section::Bridge));
        assert_eq!(parse_section_header(" touch.panel "), Ok(Section::TouchPanel));
        assert_eq!(
            parse_section_header("stepper"),
            Err(ParseError::InvalidSection)
        );
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(parse_config("# nothing\n"), Ok(SystemConfig::new()));
    }

    #[test]
    fn test_parse_full_config() {
        let config_str = r#"
[bus]
frequency = 100_000
retries = 3

[bridge]
serializer_addr = 0x12
motor = false

[touch]
mode = "polling"
revert = false
ack_thread = false
release_threshold = 20
enforce_checksum = true

[touch.panel]
width = 1920
height = 1080
"#;

        let config = parse_config(config_str).unwrap();
        assert_eq!(config.bus.frequency, 100_000);
        assert_eq!(config.bus.retries, 3);
        assert_eq!(config.bus.timeout_ms, 50);
        assert_eq!(config.bridge.serializer_addr, 0x12);
        assert_eq!(config.bridge.deserializer_addr, 0x30);
        assert!(!config.bridge.motor);
        assert_eq!(config.touch.mode, DeliveryMode::Polling);
        assert!(!config.touch.revert);
        assert!(!config.touch.ack_thread);
        assert_eq!(config.touch.release_threshold, 20);
        assert!(config.touch.enforce_checksum);
        assert_eq!(config.touch.panel.width, 1920);
        assert_eq!(config.touch.panel.height, 1080);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert_eq!(
            parse_config("[touch]\nmode = \"sometimes\"\n"),
            Err(ParseError::InvalidValue)
        );
        assert_eq!(
            parse_config("[bridge]\nmcu_addr = 0xf0\n"),
            Err(ParseError::InvalidValue)
        );
        assert_eq!(
            parse_config("[display]\n"),
            Err(ParseError::InvalidSection)
        );
    }
}
