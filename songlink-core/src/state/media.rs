//! Media state model
//!
//! Text fields are bounded and truncated on a character boundary when the
//! host sends more than fits.

use heapless::{String, Vec};
use songlink_protocol::{Command, DeviceKind};

use crate::text::bounded;

/// Title and artist capacity
pub const MAX_TITLE_LEN: usize = 63;

/// Lyric line capacity
pub const MAX_LYRIC_LEN: usize = 127;

/// Entries per device list
pub const MAX_DEVICES: usize = 16;

/// Device name capacity
pub const MAX_DEVICE_NAME_LEN: usize = 47;

/// Now-playing track
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NowPlaying {
    pub title: String<MAX_TITLE_LEN>,
    pub artist: String<MAX_TITLE_LEN>,
    pub position_ms: u32,
    pub duration_ms: u32,
    /// Something is playing
    pub active: bool,
    /// Last `NP` line, for the inactivity timeout
    pub last_update_ms: u32,
}

/// Current and upcoming lyric line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Lyrics {
    pub current: String<MAX_LYRIC_LEN>,
    pub next: String<MAX_LYRIC_LEN>,
}

impl Lyrics {
    /// True when no lyric is shown
    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.next.is_empty()
    }
}

/// One audio endpoint offered by the host
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceEntry {
    pub id: i32,
    pub name: String<MAX_DEVICE_NAME_LEN>,
}

/// Enumerated speakers or microphones
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceList {
    pub entries: Vec<DeviceEntry, MAX_DEVICES>,
    /// Active device id reported by the host
    pub current: Option<i32>,
    /// Between `BEGIN` and `END`
    pub loading: bool,
}

impl DeviceList {
    /// Look up an entry by id
    pub fn find(&self, id: i32) -> Option<&DeviceEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Name of the active device
    pub fn current_name(&self) -> Option<&str> {
        self.current
            .and_then(|id| self.find(id))
            .map(|entry| entry.name.as_str())
    }
}

/// What a command changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MediaChange {
    /// Nothing media-related changed
    None,
    Volume,
    /// `VOL` ignored while the local adjuster holds the value
    VolumeHeld,
    Mute,
    Devices(DeviceKind),
    CurrentDevice(DeviceKind),
    Lyrics,
    /// Metadata stored; `changed` is false when title and artist repeat
    Meta { changed: bool },
    Progress,
    /// Now playing cleared by `NP CLR`
    Cleared,
}

/// Everything the display shows about the host's audio
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MediaState {
    pub now_playing: NowPlaying,
    pub lyrics: Lyrics,
    pub volume: u8,
    pub muted: bool,
    pub speakers: DeviceList,
    pub microphones: DeviceList,
    /// The local volume adjuster owns the value
    pub hold_volume: bool,
}

impl MediaState {
    /// Empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Device list for `kind`
    pub fn devices(&self, kind: DeviceKind) -> &DeviceList {
        match kind {
            DeviceKind::Speaker => &self.speakers,
            DeviceKind::Microphone => &self.microphones,
        }
    }

    fn devices_mut(&mut self, kind: DeviceKind) -> &mut DeviceList {
        match kind {
            DeviceKind::Speaker => &mut self.speakers,
            DeviceKind::Microphone => &mut self.microphones,
        }
    }

    /// Apply a decoded host command
    ///
    /// Any `NP` command refreshes the now-playing inactivity timer.
    pub fn apply(&mut self, command: &Command<'_>, now_ms: u32) -> MediaChange {
        if command.is_now_playing() {
            self.now_playing.last_update_ms = now_ms;
        }

        match *command {
            Command::Volume(volume) => {
                if self.hold_volume {
                    MediaChange::VolumeHeld
                } else {
                    self.volume = volume;
                    MediaChange::Volume
                }
            }
            Command::Mute(muted) => {
                self.muted = muted;
                MediaChange::Mute
            }
            Command::DeviceBegin(kind) => {
                let list = self.devices_mut(kind);
                list.entries.clear();
                list.loading = true;
                MediaChange::Devices(kind)
            }
            Command::DeviceItem { kind, id, name } => {
                let list = self.devices_mut(kind);
                // Entries past the capacity are dropped
                let _ = list.entries.push(DeviceEntry {
                    id,
                    name: bounded(name),
                });
                MediaChange::Devices(kind)
            }
            Command::DeviceEnd(kind) => {
                self.devices_mut(kind).loading = false;
                MediaChange::Devices(kind)
            }
            Command::DeviceCurrent { kind, id } => {
                self.devices_mut(kind).current = Some(id);
                MediaChange::CurrentDevice(kind)
            }
            Command::LyricCurrent(text) => {
                self.lyrics.current = bounded(text);
                MediaChange::Lyrics
            }
            Command::LyricNext(text) => {
                self.lyrics.next = bounded(text);
                MediaChange::Lyrics
            }
            Command::LyricClear => {
                self.lyrics = Lyrics::default();
                MediaChange::Lyrics
            }
            Command::NowPlayingMeta { title, artist } => {
                let title: String<MAX_TITLE_LEN> = bounded(title);
                let artist: String<MAX_TITLE_LEN> = bounded(artist);
                let changed = title != self.now_playing.title || artist != self.now_playing.artist;
                self.now_playing.title = title;
                self.now_playing.artist = artist;
                self.now_playing.active = true;
                MediaChange::Meta { changed }
            }
            Command::NowPlayingProgress {
                position_ms,
                duration_ms,
            } => {
                self.now_playing.position_ms = position_ms;
                self.now_playing.duration_ms = duration_ms;
                self.now_playing.active = true;
                MediaChange::Progress
            }
            Command::NowPlayingClear => {
                self.clear_now_playing();
                MediaChange::Cleared
            }
            _ => MediaChange::None,
        }
    }

    /// Forget the current track
    pub fn clear_now_playing(&mut self) {
        self.now_playing = NowPlaying {
            last_update_ms: self.now_playing.last_update_ms,
            ..NowPlaying::default()
        };
    }

    /// Clear now playing after `timeout_ms` without `NP` traffic
    ///
    /// Returns true if it was cleared by this call.
    pub fn expire_now_playing(&mut self, now_ms: u32, timeout_ms: u32) -> bool {
        let idle_ms = now_ms.wrapping_sub(self.now_playing.last_update_ms);
        if self.now_playing.active && idle_ms > timeout_ms {
            self.clear_now_playing();
            true
        } else {
            false
        }
    }
}
