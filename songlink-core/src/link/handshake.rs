//! Per-transport handshake and liveness tracking
//!
//! Each transport runs its own handshake:
//!
//! ```text
//!            HELLO / HELLO OK / NP *
//! Unacked ─────────────────────────────► Acked
//!    ▲                                     │
//!    └──── no traffic for timeout_ms ──────┘
//! ```
//!
//! While unacked, a `HELLO` probe goes out every `hello_interval_ms`. The first
//! acknowledgement of a session requests exactly one volume sync.
//!
//! All timestamps are milliseconds from a free-running wrapping counter.

use crate::config::LinkConfig;

/// Probe interval while unacked
pub const HELLO_INTERVAL_MS: u32 = 3000;

/// Silence after which an acked handshake goes stale
pub const HANDSHAKE_TIMEOUT_MS: u32 = 30_000;

/// Recency window for the wired transport to count as ready
pub const WIRED_STALE_MS: u32 = 3500;

/// Handshake timing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HandshakeTimings {
    pub hello_interval_ms: u32,
    pub timeout_ms: u32,
}

impl Default for HandshakeTimings {
    fn default() -> Self {
        Self {
            hello_interval_ms: HELLO_INTERVAL_MS,
            timeout_ms: HANDSHAKE_TIMEOUT_MS,
        }
    }
}

impl From<&LinkConfig> for HandshakeTimings {
    fn from(config: &LinkConfig) -> Self {
        Self {
            hello_interval_ms: config.hello_interval_ms,
            timeout_ms: config.handshake_timeout_ms,
        }
    }
}

/// Handshake states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HandshakeState {
    /// Probing with `HELLO`
    Unacked,
    /// Peer confirmed
    Acked,
}

/// What an acknowledging message changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Acknowledged {
    /// The handshake moved from unacked to acked
    pub newly_acked: bool,
    /// First acknowledgement of this session: request the volume once
    pub sync_volume: bool,
}

/// Result of [`HandshakeManager::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HandshakePoll {
    /// The acked handshake went stale during this poll
    pub timed_out: bool,
    /// A `HELLO` probe is due now
    pub send_probe: bool,
}

/// Liveness tracker for one transport
#[derive(Debug, Clone)]
pub struct HandshakeManager {
    timings: HandshakeTimings,
    acked: bool,
    /// Volume sync already requested in this session
    synced: bool,
    last_probe_ms: Option<u32>,
    last_traffic_ms: Option<u32>,
}

impl Default for HandshakeManager {
    fn default() -> Self {
        Self::new(HandshakeTimings::default())
    }
}

impl HandshakeManager {
    /// Create an unacked tracker
    pub const fn new(timings: HandshakeTimings) -> Self {
        Self {
            timings,
            acked: false,
            synced: false,
            last_probe_ms: None,
            last_traffic_ms: None,
        }
    }

    /// Current state
    pub fn state(&self) -> HandshakeState {
        if self.acked {
            HandshakeState::Acked
        } else {
            HandshakeState::Unacked
        }
    }

    /// True once the peer has acknowledged
    pub fn is_acked(&self) -> bool {
        self.acked
    }

    /// Timestamp of the last received line, if any
    pub fn last_traffic_ms(&self) -> Option<u32> {
        self.last_traffic_ms
    }

    /// Record any received line
    pub fn on_traffic(&mut self, now_ms: u32) {
        self.last_traffic_ms = Some(now_ms);
    }

    /// Peer sent `HELLO`; the caller answers `HELLO OK`
    ///
    /// A peer speaking first completes our handshake too.
    pub fn on_hello(&mut self, now_ms: u32) -> Acknowledged {
        self.on_traffic(now_ms);
        self.acknowledge()
    }

    /// Peer sent `HELLO OK` / `HELLO ACK`
    pub fn on_ack(&mut self, now_ms: u32) -> Acknowledged {
        self.on_traffic(now_ms);
        self.acknowledge()
    }

    /// Peer sent now-playing traffic, which implies it is alive
    pub fn on_proof_of_life(&mut self, now_ms: u32) -> Acknowledged {
        self.on_traffic(now_ms);
        self.acknowledge()
    }

    fn acknowledge(&mut self) -> Acknowledged {
        let newly_acked = !self.acked;
        let sync_volume = !self.synced;
        self.acked = true;
        self.synced = true;
        Acknowledged {
            newly_acked,
            sync_volume,
        }
    }

    /// Advance timers
    ///
    /// Demotes a stale handshake and reports whether a probe is due. A
    /// demotion schedules the next probe immediately. With `can_probe`
    /// unset the probe timer is left alone, so the first poll that can
    /// send goes out at once.
    pub fn poll(&mut self, now_ms: u32, can_probe: bool) -> HandshakePoll {
        let mut result = HandshakePoll::default();

        if self.acked {
            let silent_ms = self
                .last_traffic_ms
                .map_or(u32::MAX, |at| now_ms.wrapping_sub(at));
            if silent_ms > self.timings.timeout_ms {
                self.acked = false;
                self.synced = false;
                self.last_probe_ms = None;
                result.timed_out = true;
            }
        }

        if !self.acked {
            let due = self.last_probe_ms.map_or(true, |at| {
                now_ms.wrapping_sub(at) >= self.timings.hello_interval_ms
            });
            if due && can_probe {
                self.last_probe_ms = Some(now_ms);
                result.send_probe = true;
            }
        }

        result
    }

    /// Acked and heard from within `stale_ms`
    pub fn is_fresh(&self, now_ms: u32, stale_ms: u32) -> bool {
        self.acked
            && self
                .last_traffic_ms
                .is_some_and(|at| now_ms.wrapping_sub(at) < stale_ms)
    }

    /// Forget the session (transport disconnected)
    pub fn reset(&mut self) {
        self.acked = false;
        self.synced = false;
        self.last_probe_ms = None;
        self.last_traffic_ms = None;
    }
}
