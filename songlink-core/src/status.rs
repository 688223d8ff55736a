//! Link status snapshot
//!
//! A small `Copy` value the main loop publishes after every poll so other
//! contexts (ready indicator, UI) can read link health without touching the
//! link itself.

use crate::link::arbiter::{LinkPreference, Route};

/// Health of one transport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransportStatus {
    /// Physically connected (cable host open, BLE central connected)
    pub connected: bool,
    /// Handshake acknowledged
    pub acked: bool,
    /// Usable for outgoing commands
    pub ready: bool,
}

/// Snapshot of the whole link
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStatus {
    pub wired: TransportStatus,
    pub ble: TransportStatus,
    /// Transport currently chosen for application commands
    pub route: Option<Route>,
    pub preference: LinkPreference,
    /// Bytes received during the last full second
    pub rx_bytes_per_sec: u32,
    /// Bytes sent during the last full second
    pub tx_bytes_per_sec: u32,
}

impl TransportStatus {
    /// Disconnected transport
    pub const fn new() -> Self {
        Self {
            connected: false,
            acked: false,
            ready: false,
        }
    }
}

impl LinkStatus {
    /// Nothing connected, automatic preference
    pub const fn new() -> Self {
        Self {
            wired: TransportStatus::new(),
            ble: TransportStatus::new(),
            route: None,
            preference: LinkPreference::Auto,
            rx_bytes_per_sec: 0,
            tx_bytes_per_sec: 0,
        }
    }

    /// The ready indicator: some transport can carry commands
    pub fn is_ready(&self) -> bool {
        self.route.is_some()
    }

    /// Status of the transport behind `route`
    pub fn transport(&self, route: Route) -> &TransportStatus {
        match route {
            Route::Wired => &self.wired,
            Route::Ble => &self.ble,
        }
    }
}
