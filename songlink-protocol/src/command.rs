//! Command vocabulary of the link
//!
//! Commands are grouped into families selected by the first token of a line:
//! - `HELLO`: handshake probe and acknowledgement (either direction)
//! - `VOL`, `MUTE`: volume state
//! - `SPK`, `MIC`: output/input device enumeration and selection
//! - `LRC`: lyric lines (host → device)
//! - `NP`: now-playing metadata, progress and cover chunks (host → device)
//! - `APP`: device telemetry (device → host)
//!
//! Decoding is token based and case-sensitive. Numeric arguments are parsed
//! leniently (leading decimal digits, trailing garbage ignored) and clamped to
//! their domain. Unknown lines decode to `None`.

use core::fmt::{self, Write};
use heapless::String;

/// Outbound line capacity in bytes, terminator included
pub const MAX_LINE_LEN: usize = 256;

/// Upper bound of the volume domain
pub const VOLUME_MAX: u8 = 100;

/// Errors that can occur while encoding a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// Encoded line does not fit the destination buffer
    LineTooLong,
    /// A text field contains a line terminator (or a tab in a title)
    InvalidText,
}

/// Audio endpoint class addressed by `SPK` and `MIC` commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceKind {
    /// Output device (`SPK`)
    Speaker,
    /// Input device (`MIC`)
    Microphone,
}

impl DeviceKind {
    /// Family keyword on the wire
    pub const fn keyword(self) -> &'static str {
        match self {
            DeviceKind::Speaker => "SPK",
            DeviceKind::Microphone => "MIC",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A decoded line
///
/// Text fields borrow from the line they were decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command<'a> {
    /// `HELLO`: liveness probe
    Hello,
    /// `HELLO OK` / `HELLO ACK`: handshake acknowledgement
    HelloAck,
    /// `VOL GET`: request the current volume
    VolumeGet,
    /// `VOL SET <0-100>`: set the host volume
    VolumeSet(u8),
    /// `VOL <0-100>`: report the host volume
    Volume(u8),
    /// `MUTE`: toggle mute
    MuteToggle,
    /// `MUTE <0|1>`: report mute state
    Mute(bool),
    /// `SPK LIST` / `MIC LIST`: request enumeration
    DeviceList(DeviceKind),
    /// `SPK BEGIN` / `MIC BEGIN`: enumeration starts
    DeviceBegin(DeviceKind),
    /// `SPK ITEM <id> <name>` / `MIC ITEM <id> <name>`
    DeviceItem {
        kind: DeviceKind,
        id: i32,
        name: &'a str,
    },
    /// `SPK END` / `MIC END`: enumeration complete
    DeviceEnd(DeviceKind),
    /// `SPK CUR <id>` / `MIC CUR <id>`: active device report
    DeviceCurrent { kind: DeviceKind, id: i32 },
    /// `SPK SET <id>` / `MIC SET <id>`: select a device
    DeviceSelect { kind: DeviceKind, id: i32 },
    /// `LRC CUR <text>`
    LyricCurrent(&'a str),
    /// `LRC NXT <text>`
    LyricNext(&'a str),
    /// `LRC CLR`
    LyricClear,
    /// `NP META <title>\t<artist>`
    NowPlayingMeta { title: &'a str, artist: &'a str },
    /// `NP PROG <posMs> <durMs>`
    NowPlayingProgress { position_ms: u32, duration_ms: u32 },
    /// `NP CLR`
    NowPlayingClear,
    /// `NP COV BEGIN <w> <h>`; missing dimensions decode as zero
    CoverBegin { width: u16, height: u16 },
    /// `NP COV DATA <hex>`
    CoverData(&'a str),
    /// `NP COV END`
    CoverEnd,
    /// `APP START`: device booted
    AppStart,
    /// `APP LIVE`: device heartbeat
    AppLive,
    /// `APP RX <text>`: device acknowledgement telemetry
    AppRx(&'a str),
}

impl<'a> Command<'a> {
    /// Decode a line (terminator already stripped)
    pub fn decode(line: &'a str) -> Option<Self> {
        let (family, rest) = split_token(line);
        match family {
            "HELLO" => Some(match rest {
                Some("OK") | Some("ACK") => Command::HelloAck,
                _ => Command::Hello,
            }),
            "VOL" => decode_volume(rest?),
            "MUTE" => match rest {
                None => Some(Command::MuteToggle),
                Some(arg) => parse_int(arg).map(|value| Command::Mute(value != 0)),
            },
            "SPK" => decode_device(DeviceKind::Speaker, rest?),
            "MIC" => decode_device(DeviceKind::Microphone, rest?),
            "LRC" => decode_lyric(rest?),
            "NP" => decode_now_playing(rest?),
            "APP" => decode_app(rest?),
            _ => None,
        }
    }

    /// Encode into a canonical line without terminator
    pub fn encode<const N: usize>(&self) -> Result<String<N>, CodecError> {
        self.validate()?;
        let mut line = String::new();
        write!(line, "{}", self).map_err(|_| CodecError::LineTooLong)?;
        Ok(line)
    }

    /// Whether this command belongs to the `NP` family
    ///
    /// Now-playing traffic doubles as proof of life for the handshake.
    pub fn is_now_playing(&self) -> bool {
        matches!(
            self,
            Command::NowPlayingMeta { .. }
                | Command::NowPlayingProgress { .. }
                | Command::NowPlayingClear
                | Command::CoverBegin { .. }
                | Command::CoverData(_)
                | Command::CoverEnd
        )
    }

    /// Whether this command belongs to the `HELLO` family
    pub fn is_handshake(&self) -> bool {
        matches!(self, Command::Hello | Command::HelloAck)
    }

    fn validate(&self) -> Result<(), CodecError> {
        let single_line = |text: &str| !text.contains(['\n', '\r']);
        let ok = match self {
            Command::DeviceItem { name, .. } => single_line(name),
            Command::LyricCurrent(text)
            | Command::LyricNext(text)
            | Command::CoverData(text)
            | Command::AppRx(text) => single_line(text),
            Command::NowPlayingMeta { title, artist } => {
                single_line(title) && single_line(artist) && !title.contains('\t')
            }
            _ => true,
        };
        if ok {
            Ok(())
        } else {
            Err(CodecError::InvalidText)
        }
    }
}

impl fmt::Display for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Hello => f.write_str("HELLO"),
            Command::HelloAck => f.write_str("HELLO OK"),
            Command::VolumeGet => f.write_str("VOL GET"),
            Command::VolumeSet(volume) => write!(f, "VOL SET {}", volume),
            Command::Volume(volume) => write!(f, "VOL {}", volume),
            Command::MuteToggle => f.write_str("MUTE"),
            Command::Mute(muted) => write!(f, "MUTE {}", u8::from(*muted)),
            Command::DeviceList(kind) => write!(f, "{} LIST", kind),
            Command::DeviceBegin(kind) => write!(f, "{} BEGIN", kind),
            Command::DeviceItem { kind, id, name } => {
                if name.is_empty() {
                    write!(f, "{} ITEM {}", kind, id)
                } else {
                    write!(f, "{} ITEM {} {}", kind, id, name)
                }
            }
            Command::DeviceEnd(kind) => write!(f, "{} END", kind),
            Command::DeviceCurrent { kind, id } => write!(f, "{} CUR {}", kind, id),
            Command::DeviceSelect { kind, id } => write!(f, "{} SET {}", kind, id),
            Command::LyricCurrent(text) => write!(f, "LRC CUR {}", text),
            Command::LyricNext(text) => write!(f, "LRC NXT {}", text),
            Command::LyricClear => f.write_str("LRC CLR"),
            Command::NowPlayingMeta { title, artist } => {
                write!(f, "NP META {}\t{}", title, artist)
            }
            Command::NowPlayingProgress {
                position_ms,
                duration_ms,
            } => write!(f, "NP PROG {} {}", position_ms, duration_ms),
            Command::NowPlayingClear => f.write_str("NP CLR"),
            Command::CoverBegin { width, height } => {
                write!(f, "NP COV BEGIN {} {}", width, height)
            }
            Command::CoverData(hex) => write!(f, "NP COV DATA {}", hex),
            Command::CoverEnd => f.write_str("NP COV END"),
            Command::AppStart => f.write_str("APP START"),
            Command::AppLive => f.write_str("APP LIVE"),
            Command::AppRx(text) => write!(f, "APP RX {}", text),
        }
    }
}

fn decode_volume(rest: &str) -> Option<Command<'_>> {
    match split_token(rest) {
        ("GET", None) => Some(Command::VolumeGet),
        ("SET", Some(arg)) => parse_int(arg).map(|v| Command::VolumeSet(clamp_volume(v))),
        _ => parse_int(rest).map(|v| Command::Volume(clamp_volume(v))),
    }
}

fn decode_device(kind: DeviceKind, rest: &str) -> Option<Command<'_>> {
    match split_token(rest) {
        ("LIST", None) => Some(Command::DeviceList(kind)),
        ("BEGIN", None) => Some(Command::DeviceBegin(kind)),
        ("END", None) => Some(Command::DeviceEnd(kind)),
        ("ITEM", Some(args)) => {
            let (id, name) = split_token(args);
            Some(Command::DeviceItem {
                kind,
                id: clamp_i32(parse_int(id)?),
                name: name.unwrap_or(""),
            })
        }
        ("CUR", Some(arg)) => Some(Command::DeviceCurrent {
            kind,
            id: clamp_i32(parse_int(arg)?),
        }),
        ("SET", Some(arg)) => Some(Command::DeviceSelect {
            kind,
            id: clamp_i32(parse_int(arg)?),
        }),
        _ => None,
    }
}

fn decode_lyric(rest: &str) -> Option<Command<'_>> {
    match split_token(rest) {
        ("CUR", text) => Some(Command::LyricCurrent(text.unwrap_or(""))),
        ("NXT", text) => Some(Command::LyricNext(text.unwrap_or(""))),
        ("CLR", None) => Some(Command::LyricClear),
        _ => None,
    }
}

fn decode_now_playing(rest: &str) -> Option<Command<'_>> {
    match split_token(rest) {
        ("META", fields) => {
            let (title, artist) = split_meta(fields.unwrap_or(""));
            Some(Command::NowPlayingMeta { title, artist })
        }
        ("PROG", Some(args)) => {
            let (position, duration) = split_token(args);
            Some(Command::NowPlayingProgress {
                position_ms: clamp_u32(parse_int(position)?),
                duration_ms: clamp_u32(parse_int(duration?)?),
            })
        }
        ("CLR", None) => Some(Command::NowPlayingClear),
        ("COV", Some(args)) => decode_cover(args),
        _ => None,
    }
}

fn decode_cover(args: &str) -> Option<Command<'_>> {
    match split_token(args) {
        ("BEGIN", dims) => {
            let (width, height) = match dims {
                Some(dims) => {
                    let (width, height) = split_token(dims);
                    (
                        parse_int(width).map_or(0, clamp_u16),
                        height.and_then(parse_int).map_or(0, clamp_u16),
                    )
                }
                None => (0, 0),
            };
            Some(Command::CoverBegin { width, height })
        }
        ("DATA", hex) => Some(Command::CoverData(hex.unwrap_or(""))),
        ("END", None) => Some(Command::CoverEnd),
        _ => None,
    }
}

fn decode_app(rest: &str) -> Option<Command<'_>> {
    match split_token(rest) {
        ("START", None) => Some(Command::AppStart),
        ("LIVE", None) => Some(Command::AppLive),
        ("RX", text) => Some(Command::AppRx(text.unwrap_or(""))),
        _ => None,
    }
}

/// Split at the first space; the remainder keeps any further spaces
fn split_token(text: &str) -> (&str, Option<&str>) {
    match text.split_once(' ') {
        Some((head, rest)) => (head, Some(rest)),
        None => (text, None),
    }
}

/// Split `title<TAB>artist`, accepting `|` as the legacy separator
fn split_meta(fields: &str) -> (&str, &str) {
    fields
        .split_once('\t')
        .or_else(|| fields.split_once('|'))
        .unwrap_or((fields, ""))
}

/// Parse a leading signed decimal, ignoring trailing garbage
///
/// Returns `None` when no digit is present. Saturates instead of overflowing.
fn parse_int(text: &str) -> Option<i64> {
    let bytes = text.trim_start().as_bytes();
    let (negative, digits) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    };

    let mut value: i64 = 0;
    let mut seen = false;
    for &byte in digits {
        if !byte.is_ascii_digit() {
            break;
        }
        seen = true;
        value = value
            .saturating_mul(10)
            .saturating_add(i64::from(byte - b'0'));
    }

    if !seen {
        return None;
    }
    Some(if negative { -value } else { value })
}

fn clamp_volume(value: i64) -> u8 {
    value.clamp(0, i64::from(VOLUME_MAX)) as u8
}

fn clamp_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn clamp_u32(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}

fn clamp_u16(value: i64) -> u16 {
    value.clamp(0, i64::from(u16::MAX)) as u16
}
