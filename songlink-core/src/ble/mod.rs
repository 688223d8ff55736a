//! BLE transport
//!
//! The platform BLE stack runs its callbacks in its own context. Those
//! callbacks only translate stack events into [`BleEvent`]s and post them to
//! a channel; the main loop feeds them to [`BleLink::handle`], which owns all
//! connection state and the outbound queue.

pub mod events;
pub mod gatt;
pub mod machine;

pub use events::{BleEvent, WriteData, MAX_WRITE_LEN};
pub use gatt::Characteristic;
pub use machine::{BleAction, BleActions, BleLink, BleState, Connection, SendOutcome};
