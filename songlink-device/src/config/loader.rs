//! Configuration selection
//!
//! Tries the settings store first, then the `link.toml` embedded at build
//! time, then built-in defaults. Loading never fails: a bad source is logged
//! and skipped.

use songlink_core::config::LinkConfig;
use songlink_core::ConfigError;

/// `link.toml`, validated by the build script
pub const EMBEDDED_CONFIG: &str = include_str!("../../link.toml");

/// Maximum serialized config size (binary)
pub const MAX_CONFIG_SIZE: usize = 128;

/// Where the active configuration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigSource {
    /// Saved by the settings menu
    Stored,
    /// `link.toml`
    Embedded,
    /// Compiled-in defaults
    Defaults,
}

/// Pick the active configuration
///
/// `stored` is the raw record from the settings store, if there is one.
pub fn load_config(stored: Option<&[u8]>) -> (LinkConfig, ConfigSource) {
    load_from(stored, EMBEDDED_CONFIG)
}

fn load_from(stored: Option<&[u8]>, embedded: &str) -> (LinkConfig, ConfigSource) {
    info!("Loading link configuration...");

    if let Some(bytes) = stored {
        debug!("Read {} bytes of stored config", bytes.len());
        match LinkConfig::from_postcard(bytes) {
            Ok(config) => {
                log_config_summary(&config, ConfigSource::Stored);
                return (config, ConfigSource::Stored);
            }
            Err(e) => warn!("Stored config rejected: {:?}, using link.toml", e),
        }
    }

    match LinkConfig::from_toml(embedded) {
        Ok(config) => {
            log_config_summary(&config, ConfigSource::Embedded);
            (config, ConfigSource::Embedded)
        }
        Err(e) => {
            error!("link.toml rejected: {:?}, using defaults", e);
            (LinkConfig::default(), ConfigSource::Defaults)
        }
    }
}

/// Serialize `config` for the settings store
pub fn encode_config<'b>(
    config: &LinkConfig,
    buffer: &'b mut [u8],
) -> Result<&'b mut [u8], ConfigError> {
    config.validate()?;
    config.to_postcard(buffer)
}

/// Log a summary of the loaded configuration
fn log_config_summary(config: &LinkConfig, source: ConfigSource) {
    info!("Configuration loaded from {:?}", source);
    debug!("  preference: {:?}", config.preference);
    debug!("  BLE enabled: {}", config.ble_enabled);
    debug!("  hello every {} ms", config.hello_interval_ms);
    debug!("  handshake timeout {} ms", config.handshake_timeout_ms);
}

#[cfg(test)]
mod tests {
    use super::*;
    use songlink_core::link::LinkPreference;

    #[test]
    fn test_embedded_config_parses() {
        let config = LinkConfig::from_toml(EMBEDDED_CONFIG).unwrap();
        assert_eq!(config, LinkConfig::default());
    }

    #[test]
    fn test_no_stored_config_uses_embedded() {
        let (config, source) = load_config(None);
        assert_eq!(source, ConfigSource::Embedded);
        assert_eq!(config.device_name, "SongLed");
    }

    #[test]
    fn test_stored_config_wins() {
        let saved = LinkConfig {
            preference: LinkPreference::Ble,
            ..LinkConfig::default()
        };
        let mut buffer = [0u8; MAX_CONFIG_SIZE];
        let bytes = encode_config(&saved, &mut buffer).unwrap();

        let (config, source) = load_config(Some(bytes));
        assert_eq!(source, ConfigSource::Stored);
        assert_eq!(config.preference, LinkPreference::Ble);
    }

    #[test]
    fn test_corrupt_stored_config_falls_back() {
        let (config, source) = load_config(Some(&[0xFF, 0xFF, 0xFF]));
        assert_eq!(source, ConfigSource::Embedded);
        assert_eq!(config.preference, LinkPreference::Auto);
    }

    #[test]
    fn test_broken_toml_uses_defaults() {
        let (config, source) = load_from(None, "[link]\nbaud = 9600\n");
        assert_eq!(source, ConfigSource::Defaults);
        assert_eq!(config, LinkConfig::default());
    }

    #[test]
    fn test_encode_rejects_invalid() {
        let config = LinkConfig {
            live_interval_ms: 0,
            ..LinkConfig::default()
        };
        let mut buffer = [0u8; MAX_CONFIG_SIZE];
        assert_eq!(
            encode_config(&config, &mut buffer).err(),
            Some(ConfigError::InvalidValue)
        );
    }
}
