//! Minimal TOML parser for the link configuration
//!
//! Handles only the subset used by `link.toml`, not the full TOML spec.
//!
//! Supported:
//! - `[link]` and `[ble]` section headers
//! - Key = value pairs (string, integer, boolean)
//! - Comments (# ...), including trailing ones
//!
//! NOT supported:
//! - Arrays and inline tables
//! - Multi-line strings
//! - Escape sequences inside strings

use heapless::String;

use super::types::LinkConfig;
use crate::error::ConfigError;
use crate::link::arbiter::LinkPreference;

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Link,
    Ble,
}

impl LinkConfig {
    /// Parse `link.toml` on top of the defaults
    ///
    /// Keys that are absent keep their default value. The result is
    /// validated before it is returned.
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let mut config = LinkConfig::default();
        let mut section = Section::Root;

        for (index, line) in input.lines().enumerate() {
            let line_no = index + 1;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                section = parse_section_header(&line[1..line.len() - 1])
                    .ok_or(ConfigError::Parse { line: line_no })?;
                continue;
            }

            let (key, value) = parse_key_value(line).ok_or(ConfigError::Parse { line: line_no })?;
            apply_value(&mut config, section, key, value)?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_section_header(header: &str) -> Option<Section> {
    match header.trim() {
        "link" => Some(Section::Link),
        "ble" => Some(Section::Ble),
        _ => None,
    }
}

fn apply_value(
    config: &mut LinkConfig,
    section: Section,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    match (section, key) {
        (Section::Link, "preference") => {
            config.preference = LinkPreference::from_name(parse_string(value)?)
                .ok_or(ConfigError::InvalidValue)?;
        }
        (Section::Link, "hello_interval_ms") => config.hello_interval_ms = parse_int(value)?,
        (Section::Link, "handshake_timeout_ms") => config.handshake_timeout_ms = parse_int(value)?,
        (Section::Link, "wired_stale_ms") => config.wired_stale_ms = parse_int(value)?,
        (Section::Link, "now_playing_timeout_ms") => {
            config.now_playing_timeout_ms = parse_int(value)?
        }
        (Section::Link, "live_heartbeat") => config.live_heartbeat = parse_bool(value)?,
        (Section::Link, "live_interval_ms") => config.live_interval_ms = parse_int(value)?,
        (Section::Ble, "enabled") => config.ble_enabled = parse_bool(value)?,
        (Section::Ble, "device_name") => {
            config.device_name =
                String::try_from(parse_string(value)?).map_err(|_| ConfigError::InvalidValue)?;
        }
        (Section::Ble, "preferred_mtu") => config.preferred_mtu = parse_int(value)?,
        _ => return Err(ConfigError::UnknownKey),
    }
    Ok(())
}

/// Split `key = value`, dropping a trailing comment outside quotes
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = strip_comment(line[eq_pos + 1..].trim());

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

fn strip_comment(value: &str) -> &str {
    let mut in_string = false;
    for (pos, c) in value.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '#' if !in_string => return value[..pos].trim(),
            _ => {}
        }
    }
    value
}

/// Strip surrounding quotes
fn parse_string(value: &str) -> Result<&str, ConfigError> {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        Ok(&value[1..value.len() - 1])
    } else {
        // Unquoted strings are accepted for simple values
        Ok(value)
    }
}

fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue)
}

fn parse_bool(value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::InvalidValue),
    }
}
