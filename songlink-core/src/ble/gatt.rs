//! GATT profile of the link service
//!
//! One primary service with three characteristics:
//!
//! | Characteristic | UUID suffix | Properties         | Direction     |
//! |----------------|-------------|--------------------|---------------|
//! | command-out    | `…def1`     | read, notify       | device → host |
//! | command-in     | `…def2`     | write, write-no-rsp| host → device |
//! | cover-in       | `…def3`     | write, write-no-rsp| host → device |
//!
//! The CCCD of command-out gates the notification path.

/// Primary service UUID
pub const SERVICE_UUID: u128 = 0x12345678_1234_5678_1234_56789abcdef0;

/// Command-out characteristic UUID
pub const COMMAND_OUT_UUID: u128 = 0x12345678_1234_5678_1234_56789abcdef1;

/// Command-in characteristic UUID
pub const COMMAND_IN_UUID: u128 = 0x12345678_1234_5678_1234_56789abcdef2;

/// Cover-in characteristic UUID
pub const COVER_IN_UUID: u128 = 0x12345678_1234_5678_1234_56789abcdef3;

/// MTU requested after a connection is established
pub const PREFERRED_MTU: u16 = 517;

/// ATT default MTU before negotiation
pub const DEFAULT_MTU: u16 = 23;

/// Longest advertised device name
pub const MAX_DEVICE_NAME_LEN: usize = 29;

/// CCCD bit enabling notifications
const CCCD_NOTIFY: u16 = 0x0001;

/// Characteristics of the link service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Characteristic {
    CommandOut,
    CommandIn,
    CoverIn,
}

/// Characteristic properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Properties {
    pub read: bool,
    pub write: bool,
    pub write_without_response: bool,
    pub notify: bool,
}

impl Characteristic {
    /// All characteristics in registration order
    pub const ALL: [Characteristic; 3] = [
        Characteristic::CommandOut,
        Characteristic::CommandIn,
        Characteristic::CoverIn,
    ];

    /// 128-bit UUID
    pub const fn uuid(self) -> u128 {
        match self {
            Characteristic::CommandOut => COMMAND_OUT_UUID,
            Characteristic::CommandIn => COMMAND_IN_UUID,
            Characteristic::CoverIn => COVER_IN_UUID,
        }
    }

    /// UUID in the little-endian byte order BLE stacks expect
    pub const fn uuid_bytes(self) -> [u8; 16] {
        self.uuid().to_le_bytes()
    }

    /// Look up a characteristic by UUID
    pub fn from_uuid(uuid: u128) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.uuid() == uuid)
    }

    /// Declared properties
    pub const fn properties(self) -> Properties {
        match self {
            Characteristic::CommandOut => Properties {
                read: true,
                write: false,
                write_without_response: false,
                notify: true,
            },
            Characteristic::CommandIn | Characteristic::CoverIn => Properties {
                read: false,
                write: true,
                write_without_response: true,
                notify: false,
            },
        }
    }
}

/// Decode a CCCD write (little-endian u16)
///
/// Returns `None` for payloads shorter than two bytes.
pub fn cccd_value(data: &[u8]) -> Option<u16> {
    match data {
        [low, high, ..] => Some(u16::from_le_bytes([*low, *high])),
        _ => None,
    }
}

/// Whether a CCCD value enables notifications
pub const fn notifications_enabled(cccd: u16) -> bool {
    cccd & CCCD_NOTIFY != 0
}
