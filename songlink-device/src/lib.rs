//! Device runtime for the SongLed display link
//!
//! Ties the board-agnostic link logic to a UART and a GATT server:
//!
//! ```text
//!   BLE stack callbacks ──► BLE_EVENTS ──┐  (lifecycle + writes)
//!                                        ▼
//!   UART ◄──────────────────────────► DeviceLink ──► LinkObserver (UI)
//!                                        │
//!                                        └──► LINK_STATUS (indicator)
//! ```
//!
//! Everything runs in one main loop ([`tasks::link_task`]). The BLE callback
//! context only posts [`BleEvent`](songlink_core::ble::BleEvent)s to the
//! channels and bumps the byte counters.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

// Must come first so the macros are visible in the other modules
mod fmt;

pub mod channels;
pub mod config;
pub mod link;
pub mod tasks;
pub mod throughput;

pub use link::{DeviceLink, LinkObserver};
pub use throughput::{ByteCounters, RateMeter};
