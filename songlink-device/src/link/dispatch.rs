//! Inbound line handling
//!
//! Every received line counts as traffic for its transport. `HELLO` is
//! answered on the transport it came from, and any `HELLO`, `HELLO OK` or
//! `NP` line completes that transport's handshake. Telemetry replies
//! (`APP RX ...`) also go back on the originating transport.

use core::fmt::Write;

use heapless::String;

use songlink_core::cover::CoverOutcome;
use songlink_core::link::Route;
use songlink_core::state::MediaChange;
use songlink_core::LinkError;
use songlink_hal::{GattServer, UartRx, UartTx};
use songlink_protocol::{Command, FrameEvent};

use super::{LinkCore, LinkObserver};

impl<U, G> LinkCore<'_, U, G>
where
    U: UartTx + UartRx,
    G: GattServer,
{
    pub(super) fn on_frame<O: LinkObserver>(
        &mut self,
        route: Route,
        frame: FrameEvent<'_>,
        now_ms: u32,
        observer: &mut O,
    ) {
        match frame {
            FrameEvent::Line(line) => self.on_line(route, line, now_ms, observer),
            FrameEvent::Truncated { dropped } => {
                warn!("{:?}: oversized line discarded ({} bytes)", route, dropped);
                self.stats.record(LinkError::MalformedFrame);
            }
            FrameEvent::InvalidUtf8 => {
                warn!("{:?}: non-UTF-8 line discarded", route);
                self.stats.record(LinkError::MalformedFrame);
            }
        }
    }

    fn on_line<O: LinkObserver>(&mut self, route: Route, line: &str, now_ms: u32, observer: &mut O) {
        self.handshake_mut(route).on_traffic(now_ms);

        let Some(command) = Command::decode(line) else {
            trace!("{:?}: ignoring unknown line", route);
            return;
        };
        trace!("RX {:?}: {}", route, line);

        let acknowledged = match command {
            Command::Hello => {
                let _ = self.transmit(route, &Command::HelloAck);
                Some(self.handshake_mut(route).on_hello(now_ms))
            }
            Command::HelloAck => Some(self.handshake_mut(route).on_ack(now_ms)),
            ref np if np.is_now_playing() => {
                Some(self.handshake_mut(route).on_proof_of_life(now_ms))
            }
            _ => None,
        };

        if let Some(ack) = acknowledged {
            if ack.newly_acked {
                info!("{:?} handshake acked", route);
            }
            if ack.sync_volume {
                let _ = self.transmit(route, &Command::VolumeGet);
            }
        }

        let change = self.media.apply(&command, now_ms);
        self.apply_now_playing(route, &command, change, observer);
        observer.on_command(route, &command, change);
    }

    /// Cover transfer and telemetry for `NP` lines
    fn apply_now_playing<O: LinkObserver>(
        &mut self,
        route: Route,
        command: &Command<'_>,
        change: MediaChange,
        observer: &mut O,
    ) {
        match *command {
            Command::NowPlayingMeta { .. } => {
                if matches!(change, MediaChange::Meta { changed: true }) {
                    debug!("Track changed, dropping cover");
                    self.cover.clear();
                }
                let _ = self.transmit(route, &Command::AppRx("NP META"));
            }
            Command::NowPlayingClear => self.cover.clear(),
            Command::CoverBegin { width, height } => {
                self.cover.begin(width, height);
                debug!("Cover transfer started, {} pixels", self.cover.expected());
                let _ = self.transmit(route, &Command::AppRx("NP COV BEGIN"));
            }
            Command::CoverData(hex) => {
                self.cover.data(hex);
            }
            Command::CoverEnd => {
                // END outside a transfer is ignored
                let Some(outcome) = self.cover.end() else {
                    return;
                };
                match outcome {
                    CoverOutcome::Committed { count } => info!("Cover committed, {} pixels", count),
                    CoverOutcome::Discarded { count, expected } => {
                        warn!("Cover discarded, {} of {} pixels", count, expected);
                        self.stats.record(LinkError::CoverTransferIncomplete);
                    }
                }

                let mut text: String<32> = String::new();
                // Cannot fail: "NP COV END " plus at most twenty digits
                let _ = write!(text, "NP COV END {}", outcome.count());
                let _ = self.transmit(route, &Command::AppRx(&text));
                observer.on_cover(outcome);
            }
            _ => {}
        }
    }
}
