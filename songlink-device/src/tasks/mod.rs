//! Async tasks
//!
//! Board crates wrap these in `#[embassy_executor::task]` functions with
//! their concrete UART and GATT types.

pub mod link;

pub use link::{link_task, TICK_INTERVAL_MS};
