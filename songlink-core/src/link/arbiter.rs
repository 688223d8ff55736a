//! Transport selection
//!
//! Picks the transport that carries outgoing commands from the readiness of
//! each transport and the user preference:
//!
//! | preference | wired ready | BLE ready | route          |
//! |------------|-------------|-----------|----------------|
//! | Wired      | yes         | any       | Wired          |
//! | Wired      | no          | yes       | BLE (fallback) |
//! | BLE        | any         | yes       | BLE            |
//! | BLE        | yes         | no        | Wired (fallback)|
//! | Auto       | yes         | any       | Wired          |
//! | Auto       | no          | yes       | BLE            |
//! | any        | no          | no        | none           |

use songlink_protocol::Command;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// User transport preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LinkPreference {
    /// Prefer the wired serial link
    Wired,
    /// Prefer BLE
    Ble,
    /// Wired when available, otherwise BLE
    #[default]
    Auto,
}

impl LinkPreference {
    /// Parse the configuration spelling (`wired`, `ble`, `auto`)
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "wired" | "usb" => Some(LinkPreference::Wired),
            "ble" => Some(LinkPreference::Ble),
            "auto" => Some(LinkPreference::Auto),
            _ => None,
        }
    }
}

/// Transport chosen for a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Route {
    Wired,
    Ble,
}

/// Apply the decision table
pub fn choose_route(preference: LinkPreference, wired_ready: bool, ble_ready: bool) -> Option<Route> {
    match (preference, wired_ready, ble_ready) {
        (LinkPreference::Ble, _, true) => Some(Route::Ble),
        (_, true, _) => Some(Route::Wired),
        (_, false, true) => Some(Route::Ble),
        (_, false, false) => None,
    }
}

/// Transport arbiter holding the current preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkArbiter {
    preference: LinkPreference,
}

impl LinkArbiter {
    /// Create an arbiter with the given preference
    pub const fn new(preference: LinkPreference) -> Self {
        Self { preference }
    }

    /// Current preference
    pub fn preference(&self) -> LinkPreference {
        self.preference
    }

    /// Change the preference (from the settings menu)
    pub fn set_preference(&mut self, preference: LinkPreference) {
        self.preference = preference;
    }

    /// Route for application commands
    pub fn route(&self, wired_ready: bool, ble_ready: bool) -> Option<Route> {
        choose_route(self.preference, wired_ready, ble_ready)
    }

    /// Route for a specific command
    ///
    /// `HELLO` falls back to the wired transport when nothing is ready, so
    /// the device stays discoverable over the cable.
    pub fn route_for(&self, command: &Command<'_>, wired_ready: bool, ble_ready: bool) -> Option<Route> {
        match self.route(wired_ready, ble_ready) {
            None if matches!(command, Command::Hello) => Some(Route::Wired),
            route => route,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_decision_table() {
        use LinkPreference::*;
        let table = [
            (Wired, true, true, Some(Route::Wired)),
            (Wired, true, false, Some(Route::Wired)),
            (Wired, false, true, Some(Route::Ble)),
            (Wired, false, false, None),
            (Ble, true, true, Some(Route::Ble)),
            (Ble, false, true, Some(Route::Ble)),
            (Ble, true, false, Some(Route::Wired)),
            (Ble, false, false, None),
            (Auto, true, true, Some(Route::Wired)),
            (Auto, true, false, Some(Route::Wired)),
            (Auto, false, true, Some(Route::Ble)),
            (Auto, false, false, None),
        ];

        for (preference, wired, ble, expected) in table {
            assert_eq!(choose_route(preference, wired, ble), expected);
        }
    }

    #[test]
    fn test_hello_falls_back_to_wired() {
        let arbiter = LinkArbiter::new(LinkPreference::Ble);
        assert_eq!(
            arbiter.route_for(&Command::Hello, false, false),
            Some(Route::Wired)
        );
        assert_eq!(arbiter.route_for(&Command::VolumeGet, false, false), None);
    }

    #[test]
    fn test_preference_change() {
        let mut arbiter = LinkArbiter::default();
        assert_eq!(arbiter.preference(), LinkPreference::Auto);
        arbiter.set_preference(LinkPreference::Ble);
        assert_eq!(arbiter.route(true, true), Some(Route::Ble));
    }

    #[test]
    fn test_preference_names() {
        assert_eq!(LinkPreference::from_name("ble"), Some(LinkPreference::Ble));
        assert_eq!(LinkPreference::from_name("wired"), Some(LinkPreference::Wired));
        assert_eq!(LinkPreference::from_name("BLE"), None);
    }
}
