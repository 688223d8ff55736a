//! BLE stack events
//!
//! Platform callbacks translate stack notifications into these events and
//! post them to the main loop. Nothing else crosses the callback boundary.

use heapless::Vec;

use super::gatt::{cccd_value, Characteristic};

/// Largest attribute write carried by an event
pub const MAX_WRITE_LEN: usize = 512;

/// Payload of a characteristic write
pub type WriteData = Vec<u8, MAX_WRITE_LEN>;

/// Events reported by the BLE stack
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleEvent {
    /// Service registered and advertising data configured
    StackReady,
    /// Controller or host stack failed to initialize
    InitFailed,
    /// Advertising is running
    AdvertisingStarted,
    /// Advertising could not start
    AdvertisingFailed,
    /// A central connected
    Connected { conn_id: u16 },
    /// The central disconnected
    Disconnected,
    /// The central wrote the command-out CCCD
    SubscriptionChanged { cccd: u16 },
    /// ATT MTU negotiated
    MtuChanged { mtu: u16 },
    /// The central wrote command-in or cover-in
    Write {
        characteristic: Characteristic,
        data: WriteData,
    },
    /// The BLE transport is being shut down
    Shutdown,
}

impl BleEvent {
    /// Build a write event, truncating oversized payloads
    pub fn write(characteristic: Characteristic, bytes: &[u8]) -> Self {
        let len = bytes.len().min(MAX_WRITE_LEN);
        let mut data = WriteData::new();
        // Cannot fail: len is bounded by capacity
        let _ = data.extend_from_slice(&bytes[..len]);
        BleEvent::Write {
            characteristic,
            data,
        }
    }

    /// Build a subscription event from a raw CCCD write
    pub fn subscription(bytes: &[u8]) -> Option<Self> {
        cccd_value(bytes).map(|cccd| BleEvent::SubscriptionChanged { cccd })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_event_truncates() {
        let bytes = [b'A'; MAX_WRITE_LEN + 10];
        match BleEvent::write(Characteristic::CoverIn, &bytes) {
            BleEvent::Write {
                characteristic,
                data,
            } => {
                assert_eq!(characteristic, Characteristic::CoverIn);
                assert_eq!(data.len(), MAX_WRITE_LEN);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_subscription_event() {
        assert_eq!(
            BleEvent::subscription(&[0x01, 0x00]),
            Some(BleEvent::SubscriptionChanged { cccd: 1 })
        );
        assert_eq!(BleEvent::subscription(&[]), None);
    }
}
