//! Wired serial abstractions
//!
//! The link polls the wired transport from its main loop, so both halves are
//! non-blocking: reads return what is already buffered and writes hand bytes
//! to the driver without waiting for them to leave the wire.

/// Serial transmitter
pub trait UartTx {
    /// Error type for transmit operations
    type Error;

    /// Queue `data` for transmission
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Whether a peer holds the port open
    ///
    /// Drivers without line-state detection report `true`.
    fn is_connected(&self) -> bool {
        true
    }
}

/// Serial receiver
pub trait UartRx {
    /// Error type for receive operations
    type Error;

    /// Copy already-received bytes into `buf`
    ///
    /// Returns the number of bytes copied; `0` when nothing is pending.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// Combined serial interface
///
/// For drivers that provide both directions on a single peripheral.
pub trait Uart: UartTx + UartRx {}

// Blanket implementation
impl<T: UartTx + UartRx> Uart for T {}
