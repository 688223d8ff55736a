//! SongLed Link Protocol
//!
//! This crate defines the line protocol spoken between the SongLed display
//! (device) and the host application (PC). The same lines travel over both
//! transports: the wired serial port and the BLE GATT service.
//!
//! # Protocol Overview
//!
//! Every message is a single ASCII line:
//! ```text
//! ┌──────────┬───────────┬──────────────────────────┬────┐
//! │ FAMILY   │ VERB      │ ARGUMENTS                │ LF │
//! │ NP       │ COV DATA  │ 1F3A0000FFFF...          │ \n │
//! └──────────┴───────────┴──────────────────────────┴────┘
//! ```
//!
//! An optional `\r` before the terminator is stripped on receipt. There is no
//! checksum; the transports are trusted to deliver bytes in order.
//!
//! The crate is split into:
//! - [`framer`]: byte stream to line reassembly, one instance per transport
//! - [`command`]: typed decode/encode of the command vocabulary
//! - [`pixel`]: hex encoding of cover-art pixels

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod command;
pub mod framer;
pub mod pixel;

pub use command::{CodecError, Command, DeviceKind, MAX_LINE_LEN};
pub use framer::{FrameEvent, LineFramer, Lines, BLE_RX_CAPACITY, WIRED_RX_CAPACITY};
pub use pixel::{COVER_HEIGHT, COVER_PIXELS, COVER_WIDTH, PIXELS_PER_CHUNK};
