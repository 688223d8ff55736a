//! BLE GATT peripheral abstractions
//!
//! Operations the link runtime issues to the platform BLE stack. The stack
//! reports connections, subscriptions and writes back as events; only the
//! calls below go from the runtime to the stack.

/// Advertising parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdvertisingParams {
    /// Minimum advertising interval (units of 0.625 ms)
    pub interval_min: u16,
    /// Maximum advertising interval (units of 0.625 ms)
    pub interval_max: u16,
    /// Connectable undirected advertising
    pub connectable: bool,
}

impl Default for AdvertisingParams {
    fn default() -> Self {
        Self {
            interval_min: 0x20,
            interval_max: 0x40,
            connectable: true,
        }
    }
}

/// GATT server operations
pub trait GattServer {
    /// Error type reported by the stack
    type Error;

    /// Set the advertised device name
    fn set_device_name(&mut self, name: &str) -> Result<(), Self::Error>;

    /// Start advertising the link service
    fn start_advertising(&mut self, params: &AdvertisingParams) -> Result<(), Self::Error>;

    /// Ask the peer to raise the ATT MTU
    fn request_mtu(&mut self, conn_id: u16, mtu: u16) -> Result<(), Self::Error>;

    /// Send a notification on the command-out characteristic
    ///
    /// Returns once the stack has accepted the payload; transmission
    /// completes asynchronously.
    fn notify(&mut self, conn_id: u16, data: &[u8]) -> Result<(), Self::Error>;
}
