//! Build script for songlink-device
//!
//! Validates link.toml at compile time so a broken configuration fails the
//! build instead of falling back to defaults on the device.

use std::fs;
use std::path::Path;

/// Keys accepted per section, with their expected type
const LINK_KEYS: &[(&str, Kind)] = &[
    ("preference", Kind::String),
    ("hello_interval_ms", Kind::Integer),
    ("handshake_timeout_ms", Kind::Integer),
    ("wired_stale_ms", Kind::Integer),
    ("now_playing_timeout_ms", Kind::Integer),
    ("live_heartbeat", Kind::Boolean),
    ("live_interval_ms", Kind::Integer),
];

const BLE_KEYS: &[(&str, Kind)] = &[
    ("enabled", Kind::Boolean),
    ("device_name", Kind::String),
    ("preferred_mtu", Kind::Integer),
];

/// Longest name that fits the advertising packet
const MAX_DEVICE_NAME_LEN: usize = 29;

#[derive(Clone, Copy)]
enum Kind {
    String,
    Integer,
    Boolean,
}

impl Kind {
    fn matches(self, value: &toml::Value) -> bool {
        matches!(
            (self, value),
            (Kind::String, toml::Value::String(_))
                | (Kind::Integer, toml::Value::Integer(_))
                | (Kind::Boolean, toml::Value::Boolean(_))
        )
    }

    fn name(self) -> &'static str {
        match self {
            Kind::String => "a string",
            Kind::Integer => "an integer",
            Kind::Boolean => "a boolean",
        }
    }
}

fn main() {
    validate_config();
}

/// Validate link.toml configuration at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=link.toml");
    println!("cargo:rerun-if-changed=build.rs");

    let config_path = Path::new("link.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: link.toml not found!                                     ║\n\
            ║                                                                  ║\n\
            ║  The device embeds link.toml as its default configuration.      ║\n\
            ║  Please create one in the songlink-device directory.            ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read link.toml                                 ║\n\
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
                ║  ERROR: Invalid TOML syntax in link.toml                         ║\n\
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
    validate_section(&config, "link", LINK_KEYS, &mut errors);
    validate_section(&config, "ble", BLE_KEYS, &mut errors);
    validate_values(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid configuration in link.toml                       ║\n\
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

    println!("cargo:warning=link.toml validated successfully");
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

/// Only [link] and [ble] are understood by the device parser
fn validate_sections(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(table) = config.as_table() else {
        return;
    };

    for (name, value) in table {
        if !value.is_table() {
            errors.push(format!("'{}' must be inside [link] or [ble]", name));
        } else if name != "link" && name != "ble" {
            errors.push(format!("Unknown section [{}]", name));
        }
    }
}

/// Check keys and value types of one section
fn validate_section(
    config: &toml::Value,
    section: &str,
    keys: &[(&str, Kind)],
    errors: &mut Vec<String>,
) {
    let Some(table) = config.get(section).and_then(|s| s.as_table()) else {
        return;
    };

    for (key, value) in table {
        match keys.iter().find(|(name, _)| name == key) {
            Some((_, kind)) if !kind.matches(value) => {
                errors.push(format!("[{}] {} must be {}", section, key, kind.name()));
            }
            Some(_) => {}
            None => errors.push(format!("[{}] unknown key '{}'", section, key)),
        }
    }
}

/// Check value ranges
fn validate_values(config: &toml::Value, errors: &mut Vec<String>) {
    if let Some(toml::Value::String(preference)) =
        config.get("link").and_then(|link| link.get("preference"))
    {
        if !["wired", "usb", "ble", "auto"].contains(&preference.as_str()) {
            errors.push("[link] preference must be 'wired', 'ble' or 'auto'".to_string());
        }
    }

    if let Some(link) = config.get("link").and_then(|link| link.as_table()) {
        for (key, value) in link {
            if let toml::Value::Integer(ms) = value {
                if *ms <= 0 || *ms > i64::from(u32::MAX) {
                    errors.push(format!("[link] {} must be a positive u32", key));
                }
            }
        }
    }

    if let Some(ble) = config.get("ble").and_then(|ble| ble.as_table()) {
        if let Some(toml::Value::String(name)) = ble.get("device_name") {
            if name.is_empty() || name.len() > MAX_DEVICE_NAME_LEN {
                errors.push(format!(
                    "[ble] device_name must be 1-{} bytes",
                    MAX_DEVICE_NAME_LEN
                ));
            }
        }
        if let Some(toml::Value::Integer(mtu)) = ble.get("preferred_mtu") {
            if !(23..=517).contains(mtu) {
                errors.push("[ble] preferred_mtu must be 23-517".to_string());
            }
        }
    }
}
