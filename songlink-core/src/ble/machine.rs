//! BLE connection state machine
//!
//! All BLE link state is a function of the current state and a stack event.
//! [`BleLink::handle`] applies an event and returns the actions the runtime
//! must carry out against the platform stack.

use heapless::Vec;
use songlink_protocol::MAX_LINE_LEN;

use super::events::BleEvent;
use super::gatt::{notifications_enabled, Characteristic, DEFAULT_MTU, PREFERRED_MTU};
use crate::error::LinkError;
use crate::link::queue::{FlushOutcome, OutboundQueue, PushOutcome};
use crate::text::truncate;

/// An established connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Connection {
    /// Stack connection handle
    pub conn_id: u16,
    /// Peer enabled notifications on command-out
    pub notify: bool,
    /// Negotiated ATT MTU
    pub mtu: u16,
}

/// BLE transport states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleState {
    /// Turned off, failed to initialize, or shut down
    Disabled,
    /// Stack coming up; advertising not yet running
    Starting,
    /// Connectable advertising running
    Advertising,
    /// Stack up but advertising failed
    Idle,
    /// A central is connected
    Connected(Connection),
}

/// Work for the runtime after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleAction {
    /// Start connectable advertising
    StartAdvertising,
    /// Ask the peer for a larger MTU
    RequestMtu { conn_id: u16, mtu: u16 },
    /// Flush the outbound queue
    Flush,
    /// Feed the event's write payload to this characteristic's framer
    Deliver(Characteristic),
    /// Connection established
    LinkUp,
    /// Connection lost; inbound assembly must be reset
    LinkDown,
    /// BLE is off for the rest of the session
    Disabled,
}

/// Actions produced by one event
pub type BleActions = Vec<BleAction, 4>;

/// Result of [`BleLink::send`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendOutcome {
    /// Handed to the stack as a notification
    Sent,
    /// Queued until notifications are possible
    Queued,
    /// Queued, and the oldest queued line was evicted
    QueuedEvicted,
}

/// BLE transport: connection state plus outbound queue
#[derive(Debug)]
pub struct BleLink {
    state: BleState,
    queue: OutboundQueue,
    preferred_mtu: u16,
}

impl Default for BleLink {
    fn default() -> Self {
        Self::new(true, PREFERRED_MTU)
    }
}

impl BleLink {
    /// Create the transport, `Starting` when enabled
    pub const fn new(enabled: bool, preferred_mtu: u16) -> Self {
        Self {
            state: if enabled {
                BleState::Starting
            } else {
                BleState::Disabled
            },
            queue: OutboundQueue::new(),
            preferred_mtu,
        }
    }

    /// Current state
    pub fn state(&self) -> BleState {
        self.state
    }

    /// The connection, if a central is connected
    pub fn connection(&self) -> Option<Connection> {
        match self.state {
            BleState::Connected(connection) => Some(connection),
            _ => None,
        }
    }

    /// A central is connected
    pub fn is_connected(&self) -> bool {
        self.connection().is_some()
    }

    /// Connected with notifications enabled
    pub fn is_ready(&self) -> bool {
        self.connection().is_some_and(|c| c.notify)
    }

    /// Lines waiting for the notification path
    pub fn queue(&self) -> &OutboundQueue {
        &self.queue
    }

    /// Apply a stack event
    pub fn handle(&mut self, event: &BleEvent) -> BleActions {
        let mut actions = BleActions::new();
        // At most three actions per event; capacity is four
        let mut act = |action| {
            let _ = actions.push(action);
        };

        match (self.state, event) {
            (BleState::Disabled, _) => {}

            (_, BleEvent::InitFailed) => {
                self.state = BleState::Disabled;
                self.queue.clear();
                act(BleAction::Disabled);
            }

            (state, BleEvent::Shutdown) => {
                self.state = BleState::Disabled;
                self.queue.clear();
                if matches!(state, BleState::Connected(_)) {
                    act(BleAction::LinkDown);
                }
            }

            (BleState::Starting | BleState::Idle, BleEvent::StackReady) => {
                act(BleAction::StartAdvertising);
            }

            (BleState::Starting | BleState::Idle, BleEvent::AdvertisingStarted) => {
                self.state = BleState::Advertising;
            }

            (BleState::Starting | BleState::Advertising, BleEvent::AdvertisingFailed) => {
                self.state = BleState::Idle;
            }

            (_, BleEvent::Connected { conn_id }) => {
                self.state = BleState::Connected(Connection {
                    conn_id: *conn_id,
                    notify: false,
                    mtu: DEFAULT_MTU,
                });
                act(BleAction::LinkUp);
                act(BleAction::RequestMtu {
                    conn_id: *conn_id,
                    mtu: self.preferred_mtu,
                });
            }

            (BleState::Connected(_), BleEvent::Disconnected) => {
                self.state = BleState::Starting;
                act(BleAction::LinkDown);
                act(BleAction::StartAdvertising);
            }

            (BleState::Connected(mut connection), BleEvent::SubscriptionChanged { cccd }) => {
                connection.notify = notifications_enabled(*cccd);
                self.state = BleState::Connected(connection);
                if connection.notify {
                    act(BleAction::Flush);
                }
            }

            (BleState::Connected(mut connection), BleEvent::MtuChanged { mtu }) => {
                connection.mtu = *mtu;
                self.state = BleState::Connected(connection);
            }

            (BleState::Connected(_), BleEvent::Write { characteristic, .. }) => {
                act(BleAction::Deliver(*characteristic));
                if *characteristic == Characteristic::CommandIn {
                    act(BleAction::Flush);
                }
            }

            // Everything else is ignored in the current state
            _ => {}
        }

        actions
    }

    /// Send a line as a notification on command-out
    ///
    /// - not connected: `TransportUnavailable`, nothing queued
    /// - notifications off: queued
    /// - stack refuses the notification: queued
    ///
    /// `notify` receives the connection id and the line with its `\n`, and
    /// returns whether the stack accepted it.
    pub fn send<F>(&mut self, line: &str, mut notify: F) -> Result<SendOutcome, LinkError>
    where
        F: FnMut(u16, &[u8]) -> bool,
    {
        let connection = self.connection().ok_or(LinkError::TransportUnavailable)?;
        if !connection.notify {
            return Ok(self.enqueue(line));
        }

        // Keep FIFO order with lines already waiting
        if !self.queue.is_empty() {
            self.flush(&mut notify);
            if !self.queue.is_empty() {
                return Ok(self.enqueue(line));
            }
        }

        if notify_line(connection.conn_id, line, &mut notify) {
            Ok(SendOutcome::Sent)
        } else {
            Ok(self.enqueue(line))
        }
    }

    /// Drain the queue through `notify` if notifications are enabled
    pub fn flush<F>(&mut self, mut notify: F) -> FlushOutcome
    where
        F: FnMut(u16, &[u8]) -> bool,
    {
        match self.connection() {
            Some(connection) if connection.notify => self
                .queue
                .flush(|line| notify_line(connection.conn_id, line, &mut notify)),
            _ => FlushOutcome {
                sent: 0,
                stalled: false,
            },
        }
    }

    fn enqueue(&mut self, line: &str) -> SendOutcome {
        match self.queue.push(line) {
            PushOutcome::Evicted => SendOutcome::QueuedEvicted,
            PushOutcome::Queued | PushOutcome::Ignored => SendOutcome::Queued,
        }
    }
}

/// Append `\n` to a (truncated) line and hand it to the stack
fn notify_line<F>(conn_id: u16, line: &str, notify: &mut F) -> bool
where
    F: FnMut(u16, &[u8]) -> bool,
{
    let mut payload: Vec<u8, MAX_LINE_LEN> = Vec::new();
    // Cannot fail: truncated to leave room for the terminator
    let _ = payload.extend_from_slice(truncate(line, MAX_LINE_LEN - 1).as_bytes());
    let _ = payload.push(b'\n');
    notify(conn_id, &payload)
}
