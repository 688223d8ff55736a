//! Configuration loading
//!
//! The settings store may hold a postcard-encoded [`LinkConfig`]; otherwise
//! the embedded `link.toml` applies.
//!
//! [`LinkConfig`]: songlink_core::config::LinkConfig

pub mod loader;

pub use loader::{encode_config, load_config, ConfigSource, EMBEDDED_CONFIG};
