//! Outbound line transport

use heapless::Vec;
use songlink_hal::UartTx;
use songlink_protocol::{CodecError, Command, MAX_LINE_LEN, WIRED_RX_CAPACITY};

/// Longest line the host sends
///
/// Holds a full `NP COV DATA` chunk of 100 pixels. Device replies stay
/// within [`MAX_LINE_LEN`]; host lines are bounded by the device receive
/// buffers instead.
pub const HOST_LINE_LEN: usize = 512;

const _: () = assert!(HOST_LINE_LEN >= MAX_LINE_LEN && HOST_LINE_LEN < WIRED_RX_CAPACITY);

/// Anything that can carry one protocol line to the device
pub trait LineSink {
    type Error;

    /// Send `line`; the sink adds the terminator
    fn send_line(&mut self, line: &str) -> Result<(), Self::Error>;
}

/// Host-side failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostError<E> {
    /// The sink refused the line
    Sink(E),
    /// The line did not fit the protocol limit
    Codec(CodecError),
}

impl<E> From<CodecError> for HostError<E> {
    fn from(error: CodecError) -> Self {
        HostError::Codec(error)
    }
}

/// Encode `command` and hand it to `sink`
pub(crate) fn send<S: LineSink>(sink: &mut S, command: &Command<'_>) -> Result<(), HostError<S::Error>> {
    let line = command.encode::<HOST_LINE_LEN>()?;
    trace!("TX: {}", line.as_str());
    sink.send_line(&line).map_err(HostError::Sink)
}

/// [`LineSink`] over a serial port
///
/// Lines are written with a trailing `\n` in a single write.
pub struct SerialSink<T> {
    port: T,
}

impl<T: UartTx> SerialSink<T> {
    pub fn new(port: T) -> Self {
        Self { port }
    }

    pub fn port(&self) -> &T {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut T {
        &mut self.port
    }

    pub fn into_inner(self) -> T {
        self.port
    }
}

impl<T: UartTx> LineSink for SerialSink<T> {
    type Error = T::Error;

    fn send_line(&mut self, line: &str) -> Result<(), T::Error> {
        let mut payload: Vec<u8, { HOST_LINE_LEN + 1 }> = Vec::new();
        let len = line.len().min(HOST_LINE_LEN);
        // Cannot fail: one byte of room is left for the terminator
        let _ = payload.extend_from_slice(&line.as_bytes()[..len]);
        let _ = payload.push(b'\n');
        self.port.write(&payload)
    }
}
