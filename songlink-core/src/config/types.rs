//! Configuration type definitions
//!
//! The link configuration ships as `link.toml` with the device and can be
//! overridden by the settings store, which keeps it as postcard binary data.

use heapless::String;

use crate::ble::gatt::{DEFAULT_MTU, MAX_DEVICE_NAME_LEN, PREFERRED_MTU};
use crate::error::ConfigError;
use crate::link::arbiter::LinkPreference;
use crate::link::handshake::{HANDSHAKE_TIMEOUT_MS, HELLO_INTERVAL_MS, WIRED_STALE_MS};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Current configuration layout version
pub const CONFIG_VERSION: u8 = 1;

/// Default advertised name
pub const DEFAULT_DEVICE_NAME: &str = "SongLed";

/// Default now-playing inactivity timeout
pub const NOW_PLAYING_TIMEOUT_MS: u32 = 8000;

/// Default `APP LIVE` interval
pub const LIVE_INTERVAL_MS: u32 = 1000;

/// Largest MTU a BLE stack may negotiate
const MAX_MTU: u16 = 517;

/// Link configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkConfig {
    /// Layout version, checked when loading binary data
    pub version: u8,
    /// BLE advertised name
    pub device_name: String<MAX_DEVICE_NAME_LEN>,
    /// Transport preference for outgoing commands
    pub preference: LinkPreference,
    /// Bring up the BLE transport
    pub ble_enabled: bool,
    /// `HELLO` probe interval while unacked
    pub hello_interval_ms: u32,
    /// Silence before an acked handshake goes stale
    pub handshake_timeout_ms: u32,
    /// Recency window for the wired transport to count as ready
    pub wired_stale_ms: u32,
    /// Silence before now playing is cleared
    pub now_playing_timeout_ms: u32,
    /// Send `APP LIVE` heartbeats
    pub live_heartbeat: bool,
    /// `APP LIVE` interval
    pub live_interval_ms: u32,
    /// MTU requested after connecting
    pub preferred_mtu: u16,
}

impl Default for LinkConfig {
    fn default() -> Self {
        let mut device_name = String::new();
        // Cannot fail: the default name is shorter than the capacity
        let _ = device_name.push_str(DEFAULT_DEVICE_NAME);

        Self {
            version: CONFIG_VERSION,
            device_name,
            preference: LinkPreference::Auto,
            ble_enabled: true,
            hello_interval_ms: HELLO_INTERVAL_MS,
            handshake_timeout_ms: HANDSHAKE_TIMEOUT_MS,
            wired_stale_ms: WIRED_STALE_MS,
            now_playing_timeout_ms: NOW_PLAYING_TIMEOUT_MS,
            live_heartbeat: true,
            live_interval_ms: LIVE_INTERVAL_MS,
            preferred_mtu: PREFERRED_MTU,
        }
    }
}

impl LinkConfig {
    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        let intervals = [
            self.hello_interval_ms,
            self.handshake_timeout_ms,
            self.wired_stale_ms,
            self.now_playing_timeout_ms,
            self.live_interval_ms,
        ];
        if intervals.contains(&0) {
            return Err(ConfigError::InvalidValue);
        }
        if !(DEFAULT_MTU..=MAX_MTU).contains(&self.preferred_mtu) {
            return Err(ConfigError::InvalidValue);
        }
        if self.device_name.is_empty() {
            return Err(ConfigError::InvalidValue);
        }
        Ok(())
    }

    /// Serialize for the settings store
    #[cfg(feature = "serde")]
    pub fn to_postcard<'b>(&self, buffer: &'b mut [u8]) -> Result<&'b mut [u8], ConfigError> {
        postcard::to_slice(self, buffer).map_err(|_| ConfigError::BufferTooSmall)
    }

    /// Deserialize from the settings store
    ///
    /// Rejects data written by another layout version.
    #[cfg(feature = "serde")]
    pub fn from_postcard(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: LinkConfig =
            postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;
        if config.version != CONFIG_VERSION {
            return Err(ConfigError::VersionMismatch);
        }
        config.validate()?;
        Ok(config)
    }
}
