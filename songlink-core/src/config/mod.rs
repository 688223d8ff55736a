//! Link configuration
//!
//! Board-agnostic settings, loaded from the embedded TOML file or from the
//! settings store as postcard binary data.

pub mod toml;
pub mod types;

pub use types::*;
