//! Answers commands sent by the device
//!
//! | Device sends | Host answers |
//! |---|---|
//! | `HELLO` / `HELLO OK` | `HELLO OK`, `VOL n`, `MUTE m` (at most every 500 ms) |
//! | `VOL GET` | `VOL n`, `MUTE m` |
//! | `VOL SET n` | applies, then `VOL n`, `MUTE m` |
//! | `MUTE` | toggles, then `VOL n`, `MUTE m` |
//! | `SPK LIST` / `MIC LIST` | `BEGIN`, one `ITEM i name` per endpoint, `END`, `CUR i` |
//! | `SPK SET i` / `MIC SET i` | selects, then `CUR i` |
//! | `APP ...` | nothing; logged as telemetry |

use heapless::String;
use songlink_protocol::{Command, DeviceKind, FrameEvent, LineFramer, MAX_LINE_LEN, WIRED_RX_CAPACITY};

use crate::audio::AudioControl;
use crate::sink::{send, HostError, LineSink};
use crate::text::sanitize;

/// Minimum spacing between two `HELLO OK` replies
pub const HELLO_DEBOUNCE_MS: u32 = 500;

/// Room left for an endpoint name in `SPK ITEM <id> <name>`
const DEVICE_NAME_LEN: usize = MAX_LINE_LEN - 24;

/// Something the application should react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostEvent {
    /// First `HELLO` since start or [`HostResponder::reset`]; resend now playing
    FirstHello,
    /// `APP START`: the device (re)booted
    DeviceStarted,
}

/// Summary of one [`HostResponder::feed`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FeedOutcome {
    /// Complete lines seen
    pub lines: usize,
    /// Oversized or non-UTF-8 lines dropped
    pub malformed: usize,
    pub first_hello: bool,
    pub device_started: bool,
}

/// Device command handler over an [`AudioControl`]
pub struct HostResponder<A> {
    audio: A,
    framer: LineFramer<WIRED_RX_CAPACITY>,
    last_hello_reply_ms: Option<u32>,
    hello_seen: bool,
}

impl<A: AudioControl> HostResponder<A> {
    pub fn new(audio: A) -> Self {
        Self {
            audio,
            framer: LineFramer::new(),
            last_hello_reply_ms: None,
            hello_seen: false,
        }
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    /// Forget the session, e.g. when the port closes
    pub fn reset(&mut self) {
        self.framer.reset();
        self.last_hello_reply_ms = None;
        self.hello_seen = false;
    }

    /// Feed received bytes and answer every completed line
    ///
    /// Stops at the first sink error; bytes of later lines in this chunk are
    /// dropped with it.
    pub fn feed<S: LineSink>(
        &mut self,
        bytes: &[u8],
        now_ms: u32,
        sink: &mut S,
    ) -> Result<FeedOutcome, HostError<S::Error>> {
        let mut outcome = FeedOutcome::default();
        let Self {
            audio,
            framer,
            last_hello_reply_ms,
            hello_seen,
        } = self;
        let mut session = Session {
            audio,
            last_hello_reply_ms,
            hello_seen,
        };

        let mut lines = framer.feed(bytes);
        while let Some(frame) = lines.next_event() {
            let FrameEvent::Line(line) = frame else {
                debug!("Dropping malformed device line");
                outcome.malformed += 1;
                continue;
            };
            outcome.lines += 1;
            match session.handle_line(line, now_ms, sink)? {
                Some(HostEvent::FirstHello) => outcome.first_hello = true,
                Some(HostEvent::DeviceStarted) => outcome.device_started = true,
                None => {}
            }
        }
        Ok(outcome)
    }

    /// Answer one line (terminator already stripped)
    pub fn handle_line<S: LineSink>(
        &mut self,
        line: &str,
        now_ms: u32,
        sink: &mut S,
    ) -> Result<Option<HostEvent>, HostError<S::Error>> {
        Session {
            audio: &mut self.audio,
            last_hello_reply_ms: &mut self.last_hello_reply_ms,
            hello_seen: &mut self.hello_seen,
        }
        .handle_line(line, now_ms, sink)
    }
}

/// Responder state without the framer, so lines can borrow it
struct Session<'a, A> {
    audio: &'a mut A,
    last_hello_reply_ms: &'a mut Option<u32>,
    hello_seen: &'a mut bool,
}

impl<A: AudioControl> Session<'_, A> {
    fn handle_line<S: LineSink>(
        &mut self,
        line: &str,
        now_ms: u32,
        sink: &mut S,
    ) -> Result<Option<HostEvent>, HostError<S::Error>> {
        let Some(command) = Command::decode(line) else {
            trace!("Ignoring device line");
            return Ok(None);
        };

        match command {
            Command::Hello | Command::HelloAck => return self.on_hello(now_ms, sink),
            Command::VolumeGet => self.send_volume_state(sink)?,
            Command::VolumeSet(volume) => {
                self.audio.set_volume(volume);
                self.send_volume_state(sink)?;
            }
            Command::MuteToggle => {
                self.audio.toggle_mute();
                self.send_volume_state(sink)?;
            }
            Command::DeviceList(kind) => self.send_device_list(kind, sink)?,
            Command::DeviceSelect { kind, id } => {
                let selected = usize::try_from(id)
                    .map(|index| self.audio.select_device(kind, index))
                    .unwrap_or(false);
                if !selected {
                    warn!("{} SET {}: no such device", kind.keyword(), id);
                }
                self.send_current_device(kind, sink)?;
            }
            Command::AppStart => {
                info!("Device started");
                return Ok(Some(HostEvent::DeviceStarted));
            }
            Command::AppLive => trace!("Device alive"),
            Command::AppRx(text) => debug!("Device received: {}", text),
            _ => trace!("Ignoring device line"),
        }
        Ok(None)
    }

    fn on_hello<S: LineSink>(
        &mut self,
        now_ms: u32,
        sink: &mut S,
    ) -> Result<Option<HostEvent>, HostError<S::Error>> {
        let due = self
            .last_hello_reply_ms
            .map_or(true, |at| now_ms.wrapping_sub(at) > HELLO_DEBOUNCE_MS);
        if due {
            *self.last_hello_reply_ms = Some(now_ms);
            send(sink, &Command::HelloAck)?;
            self.send_volume_state(sink)?;
        }

        if *self.hello_seen {
            Ok(None)
        } else {
            info!("Device said hello");
            *self.hello_seen = true;
            Ok(Some(HostEvent::FirstHello))
        }
    }

    /// `VOL n` + `MUTE m`; nothing without a default output
    fn send_volume_state<S: LineSink>(&mut self, sink: &mut S) -> Result<(), HostError<S::Error>> {
        let Some(state) = self.audio.volume_state() else {
            debug!("No default output, volume not reported");
            return Ok(());
        };
        send(sink, &Command::Volume(state.volume))?;
        send(sink, &Command::Mute(state.muted))
    }

    fn send_device_list<S: LineSink>(
        &mut self,
        kind: DeviceKind,
        sink: &mut S,
    ) -> Result<(), HostError<S::Error>> {
        let count = self.audio.refresh_devices(kind);
        debug!("Sending {} {} devices", count, kind.keyword());

        send(sink, &Command::DeviceBegin(kind))?;
        for index in 0..count {
            let Some(raw) = self.audio.device_name(kind, index) else {
                continue;
            };
            let name: String<DEVICE_NAME_LEN> = sanitize(raw, false);
            let id = i32::try_from(index).unwrap_or(i32::MAX);
            send(sink, &Command::DeviceItem { kind, id, name: &name })?;
        }
        send(sink, &Command::DeviceEnd(kind))?;
        self.send_current_device(kind, sink)
    }

    /// `CUR i`; nothing when no endpoint is the default
    fn send_current_device<S: LineSink>(
        &mut self,
        kind: DeviceKind,
        sink: &mut S,
    ) -> Result<(), HostError<S::Error>> {
        let Some(index) = self.audio.current_device(kind) else {
            return Ok(());
        };
        let id = i32::try_from(index).unwrap_or(i32::MAX);
        send(sink, &Command::DeviceCurrent { kind, id })
    }
}
