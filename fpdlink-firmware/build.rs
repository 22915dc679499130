//! Build script for fpdlink-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates fpdlink.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate fpdlink.toml at compile time
///
/// Stricter than the on-target parser, which skips unknown keys.
fn validate_config() {
    println!("cargo:rerun-if-changed=fpdlink.toml");

    let config_path = Path::new("fpdlink.toml");
    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: fpdlink.toml not found!                                  ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds fpdlink.toml at build time.                 ║\n\
            ║  Please create one in the fpdlink-firmware directory.            ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read fpdlink.toml                              ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in fpdlink.toml                      ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_sections(&config, &mut errors);
    validate_bus(&config, &mut errors);
    validate_bridge(&config, &mut errors);
    validate_touch(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid fpdlink.toml                                     ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=fpdlink.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

const SECTIONS: &[(&str, &[&str])] = &[
    ("bus", &["frequency", "retries", "timeout_ms"]),
    (
        "bridge",
        &[
            "serializer_addr",
            "deserializer_addr",
            "mcu_addr",
            "settle_ms",
            "training_retry_ms",
            "motor",
        ],
    ),
    (
        "touch",
        &[
            "mode",
            "revert",
            "ack_thread",
            "poll_interval_ms",
            "not_ready_backoff_ms",
            "ack_interval_ms",
            "release_threshold",
            "enforce_checksum",
            "panel",
        ],
    ),
];

fn table<'a>(config: &'a toml::Value, name: &str) -> Option<&'a toml::value::Table> {
    match config.get(name) {
        Some(toml::Value::Table(t)) => Some(t),
        _ => None,
    }
}

fn int(table: &toml::value::Table, key: &str) -> Option<i64> {
    match table.get(key) {
        Some(toml::Value::Integer(v)) => Some(*v),
        _ => None,
    }
}

/// Reject unknown sections and keys
fn validate_sections(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(root) = config.as_table() else {
        return;
    };

    for (name, value) in root {
        let Some((_, keys)) = SECTIONS.iter().find(|(section, _)| section == name) else {
            errors.push(format!("unknown section [{}]", name));
            continue;
        };
        let toml::Value::Table(entries) = value else {
            errors.push(format!("[{}] must be a table", name));
            continue;
        };
        for key in entries.keys() {
            if !keys.contains(&key.as_str()) {
                errors.push(format!("[{}] unknown key '{}'", name, key));
            }
        }
    }

    if let Some(panel) = table(config, "touch").and_then(|t| t.get("panel")) {
        if let toml::Value::Table(panel) = panel {
            for key in panel.keys() {
                if !["width", "height"].contains(&key.as_str()) {
                    errors.push(format!("[touch.panel] unknown key '{}'", key));
                }
            }
        } else {
            errors.push("[touch.panel] must be a table".to_string());
        }
    }
}

fn validate_bus(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(bus) = table(config, "bus") else {
        return;
    };

    if let Some(freq) = int(bus, "frequency") {
        if !(10_000..=1_000_000).contains(&freq) {
            errors.push("[bus] frequency must be 10000-1000000 Hz".to_string());
        }
    }
    if let Some(retries) = int(bus, "retries") {
        if !(0..=255).contains(&retries) {
            errors.push("[bus] retries must be 0-255".to_string());
        }
    }
    if int(bus, "timeout_ms") == Some(0) {
        errors.push("[bus] timeout_ms must be non-zero".to_string());
    }
}

fn validate_bridge(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(bridge) = table(config, "bridge") else {
        return;
    };

    let mut addresses = Vec::new();
    for key in ["serializer_addr", "deserializer_addr", "mcu_addr"] {
        if let Some(addr) = int(bridge, key) {
            if !(0x01..=0x7f).contains(&addr) {
                errors.push(format!("[bridge] {} 0x{:02x} is not a 7-bit address", key, addr));
            }
            if addresses.contains(&addr) {
                errors.push(format!("[bridge] {} 0x{:02x} collides", key, addr));
            }
            addresses.push(addr);
        }
    }

    for key in ["settle_ms", "training_retry_ms"] {
        if let Some(ms) = int(bridge, key) {
            if !(0..=1000).contains(&ms) {
                errors.push(format!("[bridge] {} must be 0-1000", key));
            }
        }
    }
}

fn validate_touch(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(touch) = table(config, "touch") else {
        return;
    };

    if let Some(toml::Value::String(mode)) = touch.get("mode") {
        if !["interrupt", "irq", "polling", "poll"].contains(&mode.as_str()) {
            errors.push("[touch] mode must be 'interrupt' or 'polling'".to_string());
        }
    }

    for key in ["poll_interval_ms", "ack_interval_ms"] {
        if int(touch, key) == Some(0) {
            errors.push(format!("[touch] {} must be non-zero", key));
        }
    }

    if let Some(threshold) = int(touch, "release_threshold") {
        if !(1..=u16::MAX as i64).contains(&threshold) {
            errors.push("[touch] release_threshold must be 1-65535".to_string());
        }
    }

    if let Some(toml::Value::Table(panel)) = touch.get("panel") {
        for key in ["width", "height"] {
            if let Some(v) = int(panel, key) {
                if !(1..=4096).contains(&v) {
                    errors.push(format!("[touch.panel] {} must be 1-4096", key));
                }
            }
        }
    }
}
