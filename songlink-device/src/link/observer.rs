//! Application hooks
//!
//! The UI layer learns about decoded host traffic through this trait. Every
//! method has an empty default, and `()` ignores everything.

use songlink_core::cover::CoverOutcome;
use songlink_core::link::Route;
use songlink_core::state::MediaChange;
use songlink_protocol::Command;

/// Receives link events from the main loop
pub trait LinkObserver {
    /// A host line was decoded and applied to the media state
    fn on_command(&mut self, _route: Route, _command: &Command<'_>, _change: MediaChange) {}

    /// A cover transfer ended
    fn on_cover(&mut self, _outcome: CoverOutcome) {}

    /// Now playing and the cover were dropped by a timeout or a lost host
    fn on_now_playing_cleared(&mut self) {}
}

impl LinkObserver for () {}
