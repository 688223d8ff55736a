//! Host side of the SongLed display link
//!
//! The PC application answers device commands and pushes what is playing:
//!
//! ```text
//!   device lines ──► HostResponder ──► AudioControl (system mixer)
//!                          │
//!                          ▼
//!   NowPlayingPublisher ──► LineSink ──► serial port / BLE command-in
//! ```
//!
//! Both halves write through a [`LineSink`], so the same code serves the
//! wired and the BLE transport. Timestamps are passed in by the caller.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

// Must come first so the macros are visible in the other modules
mod fmt;

pub mod audio;
pub mod publisher;
pub mod responder;
pub mod sink;
pub mod text;

pub use audio::{AudioControl, VolumeState};
pub use publisher::{NowPlayingPublisher, Track};
pub use responder::{FeedOutcome, HostEvent, HostResponder, HELLO_DEBOUNCE_MS};
pub use sink::{HostError, LineSink, SerialSink, HOST_LINE_LEN};
