//! Cross-context communication
//!
//! The BLE stack callbacks run outside the main loop. They only post events
//! to [`BLE_EVENTS`] and count bytes in [`THROUGHPUT`]; all link state stays
//! owned by the main loop. The loop publishes a [`LinkStatus`] snapshot for
//! the ready indicator and the UI.
//!
//! Connection lifecycle events and write payloads travel on separate
//! channels. A burst of writes (a cover is 18 of them) can fill the write
//! channel but never takes a slot a `Disconnected` needs.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;

use songlink_core::ble::BleEvent;
use songlink_core::LinkStatus;

use crate::throughput::ByteCounters;

/// Capacity for lifecycle events (connect, CCCD, MTU, ...)
pub const BLE_CONTROL_CHANNEL_SIZE: usize = 8;

/// Capacity for characteristic writes
pub const BLE_WRITE_CHANNEL_SIZE: usize = 8;

/// BLE stack events on their way to the main loop
///
/// The loop applies every pending lifecycle event before any pending write,
/// so a write never reaches a connection the loop has not seen yet.
pub struct BleEvents<M: RawMutex, const C: usize, const W: usize> {
    control: Channel<M, BleEvent, C>,
    writes: Channel<M, BleEvent, W>,
}

impl<M: RawMutex, const C: usize, const W: usize> BleEvents<M, C, W> {
    pub const fn new() -> Self {
        Self {
            control: Channel::new(),
            writes: Channel::new(),
        }
    }

    /// Post an event without blocking
    ///
    /// Write payloads are counted in `counters` even when dropped. Returns
    /// false when the event's channel is full and the event was dropped.
    pub fn post(&self, event: BleEvent, counters: &ByteCounters) -> bool {
        let is_write = if let BleEvent::Write { data, .. } = &event {
            counters.add_rx(data.len());
            true
        } else {
            false
        };
        if is_write {
            self.writes.try_send(event).is_ok()
        } else {
            self.control.try_send(event).is_ok()
        }
    }

    /// Lifecycle events
    pub fn control(&self) -> &Channel<M, BleEvent, C> {
        &self.control
    }

    /// Characteristic writes
    pub fn writes(&self) -> &Channel<M, BleEvent, W> {
        &self.writes
    }
}

impl<M: RawMutex, const C: usize, const W: usize> Default for BleEvents<M, C, W> {
    fn default() -> Self {
        Self::new()
    }
}

/// Event channels used by the firmware
pub type DeviceBleEvents =
    BleEvents<CriticalSectionRawMutex, BLE_CONTROL_CHANNEL_SIZE, BLE_WRITE_CHANNEL_SIZE>;

/// BLE stack events, posted from the callback context
pub static BLE_EVENTS: DeviceBleEvents = BleEvents::new();

/// Byte totals for both transports
pub static THROUGHPUT: ByteCounters = ByteCounters::new();

/// Latest link status published by the main loop
static LINK_STATUS: Mutex<CriticalSectionRawMutex, Cell<LinkStatus>> =
    Mutex::new(Cell::new(LinkStatus::new()));

/// Post a stack event from the callback context
///
/// Returns false when the event was dropped (see [`BleEvents::post`]).
pub fn post_ble_event(event: BleEvent) -> bool {
    BLE_EVENTS.post(event, &THROUGHPUT)
}

/// Replace the published status
pub fn publish_status(status: LinkStatus) {
    LINK_STATUS.lock(|cell| cell.set(status));
}

/// Read the published status
pub fn link_status() -> LinkStatus {
    LINK_STATUS.lock(|cell| cell.get())
}
