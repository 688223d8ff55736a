//! Cover-art reception

pub mod transfer;

pub use transfer::{CoverOutcome, CoverPhase, CoverTransfer};
