//! SongLink Platform Abstraction Layer
//!
//! This crate defines the traits a platform implements so the link runtime
//! can drive its two transports without knowing the chip or BLE stack.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  songlink-device (link runtime)         │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  songlink-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  USB CDC /    │       │  BLE stack    │
//! │  UART driver  │       │  GATT server  │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::UartTx`], [`uart::UartRx`] - Non-blocking wired serial
//! - [`gatt::GattServer`] - BLE peripheral operations issued by the runtime
//!
//! BLE stack callbacks flow the other way: the platform turns them into
//! events and posts them to the runtime's event channel.

#![no_std]
#![deny(unsafe_code)]

pub mod gatt;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use gatt::{AdvertisingParams, GattServer};
pub use uart::{UartRx, UartTx};
