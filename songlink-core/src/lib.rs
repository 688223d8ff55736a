//! Board-agnostic link logic for the SongLed display
//!
//! This crate contains everything about the display/host link that does not
//! depend on a specific chip or BLE stack:
//!
//! - Outbound queue with drop-oldest backpressure
//! - Per-transport handshake and liveness tracking
//! - Transport arbitration (wired, BLE, auto)
//! - BLE connection state machine driven by stack events
//! - Cover-art transfer with front/back buffers
//! - Decoded media state (now playing, lyrics, volume, device lists)
//! - Link configuration and error taxonomy

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod ble;
pub mod config;
pub mod cover;
pub mod error;
pub mod link;
pub mod state;
pub mod status;
mod text;

pub use error::{ConfigError, LinkError, LinkStats};
pub use status::{LinkStatus, TransportStatus};
