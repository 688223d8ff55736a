//! Error taxonomy
//!
//! Link failures are always handled locally. They are reported to callers
//! for logging and counted in [`LinkStats`], never escalated.

/// Link failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// No transport is ready; the command was dropped
    TransportUnavailable,
    /// The oldest queued outbound line was evicted
    QueueOverflow,
    /// A handshake went stale and was demoted to unacked
    HandshakeTimeout,
    /// Oversized or undecodable input was discarded by a framer, or an
    /// outbound command could not be encoded
    MalformedFrame,
    /// A cover transfer ended before all pixels arrived
    CoverTransferIncomplete,
    /// The BLE stack failed to come up; BLE is disabled
    InitFailure,
}

/// Per-kind failure counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    pub transport_unavailable: u32,
    pub queue_overflow: u32,
    pub handshake_timeout: u32,
    pub malformed_frame: u32,
    pub cover_incomplete: u32,
    pub init_failure: u32,
}

impl LinkStats {
    /// Create zeroed counters
    pub const fn new() -> Self {
        Self {
            transport_unavailable: 0,
            queue_overflow: 0,
            handshake_timeout: 0,
            malformed_frame: 0,
            cover_incomplete: 0,
            init_failure: 0,
        }
    }

    /// Count one occurrence of `error`
    pub fn record(&mut self, error: LinkError) {
        let counter = match error {
            LinkError::TransportUnavailable => &mut self.transport_unavailable,
            LinkError::QueueOverflow => &mut self.queue_overflow,
            LinkError::HandshakeTimeout => &mut self.handshake_timeout,
            LinkError::MalformedFrame => &mut self.malformed_frame,
            LinkError::CoverTransferIncomplete => &mut self.cover_incomplete,
            LinkError::InitFailure => &mut self.init_failure,
        };
        *counter = counter.saturating_add(1);
    }

    /// Occurrences of `error` so far
    pub fn count(&self, error: LinkError) -> u32 {
        match error {
            LinkError::TransportUnavailable => self.transport_unavailable,
            LinkError::QueueOverflow => self.queue_overflow,
            LinkError::HandshakeTimeout => self.handshake_timeout,
            LinkError::MalformedFrame => self.malformed_frame,
            LinkError::CoverTransferIncomplete => self.cover_incomplete,
            LinkError::InitFailure => self.init_failure,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Malformed TOML at the given 1-based line
    Parse { line: usize },
    /// Key not recognized in the `[link]` section
    UnknownKey,
    /// Value has the wrong type or is out of range
    InvalidValue,
    /// Binary config could not be decoded
    Deserialize,
    /// Binary config was written by an incompatible version
    VersionMismatch,
    /// Output buffer too small for the serialized config
    BufferTooSmall,
}
