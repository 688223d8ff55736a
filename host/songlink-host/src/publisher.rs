//! Pushes what is playing to the device
//!
//! The publisher remembers the last track, progress and cover so a device
//! that (re)connects can be brought up to date with [`resend`]. Metadata and
//! progress repeats are suppressed; the device clears its cover whenever the
//! metadata changes, so the cover follows the metadata.
//!
//! [`resend`]: NowPlayingPublisher::resend

use heapless::String;
use songlink_protocol::pixel::{encode_hex, HEX_DIGITS_PER_PIXEL};
use songlink_protocol::{Command, COVER_HEIGHT, COVER_PIXELS, COVER_WIDTH, MAX_LINE_LEN, PIXELS_PER_CHUNK};

use crate::sink::{send, HostError, LineSink};
use crate::text::sanitize;

/// Title or artist, sized so `NP META <title>\t<artist>` fits one line
pub const META_FIELD_LEN: usize = (MAX_LINE_LEN - 9) / 2;

/// Lyric text, sized so `LRC CUR <text>` fits one line
pub const LYRIC_LEN: usize = MAX_LINE_LEN - 8;

/// Same progress is not repeated within this window
const PROGRESS_REPEAT_MS: u32 = 500;

/// Positions closer than this count as the same progress
const PROGRESS_JITTER_MS: u32 = 250;

/// Sanitized track metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Track {
    pub title: String<META_FIELD_LEN>,
    pub artist: String<META_FIELD_LEN>,
}

impl Track {
    /// Clean up raw metadata from the media session
    pub fn new(title: &str, artist: &str) -> Self {
        Self {
            title: sanitize(title, true),
            artist: sanitize(artist, true),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.artist.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Progress {
    position_ms: u32,
    duration_ms: u32,
    sent_ms: u32,
}

/// Now-playing, cover and lyric sender
pub struct NowPlayingPublisher {
    track: Option<Track>,
    progress: Option<Progress>,
    cover: Option<[u16; COVER_PIXELS]>,
}

impl Default for NowPlayingPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl NowPlayingPublisher {
    pub const fn new() -> Self {
        Self {
            track: None,
            progress: None,
            cover: None,
        }
    }

    /// Last published track
    pub fn track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    /// Last published cover
    pub fn cover(&self) -> Option<&[u16; COVER_PIXELS]> {
        self.cover.as_ref()
    }

    /// `NP META`, unless the track is unchanged
    ///
    /// A new track forgets the stored cover; the device drops it too.
    /// Returns whether a line was sent.
    pub fn publish_track<S: LineSink>(
        &mut self,
        track: Track,
        sink: &mut S,
    ) -> Result<bool, HostError<S::Error>> {
        if self.track.as_ref() == Some(&track) {
            return Ok(false);
        }
        info!("NP META: {} - {}", track.title.as_str(), track.artist.as_str());
        send_meta(&track, sink)?;
        self.track = Some(track);
        self.cover = None;
        Ok(true)
    }

    /// `NP PROG`, unless nearly identical progress went out recently
    ///
    /// Returns whether a line was sent.
    pub fn publish_progress<S: LineSink>(
        &mut self,
        position_ms: u32,
        duration_ms: u32,
        now_ms: u32,
        sink: &mut S,
    ) -> Result<bool, HostError<S::Error>> {
        if let Some(last) = self.progress {
            let repeat = last.duration_ms == duration_ms
                && last.position_ms.abs_diff(position_ms) < PROGRESS_JITTER_MS
                && now_ms.wrapping_sub(last.sent_ms) < PROGRESS_REPEAT_MS;
            if repeat {
                return Ok(false);
            }
        }
        send(
            sink,
            &Command::NowPlayingProgress {
                position_ms,
                duration_ms,
            },
        )?;
        self.progress = Some(Progress {
            position_ms,
            duration_ms,
            sent_ms: now_ms,
        });
        Ok(true)
    }

    /// Send a 40x40 RGB565 cover and keep it for [`resend`](Self::resend)
    pub fn publish_cover<S: LineSink>(
        &mut self,
        pixels: &[u16; COVER_PIXELS],
        sink: &mut S,
    ) -> Result<(), HostError<S::Error>> {
        self.cover = Some(*pixels);
        send_cover(pixels, sink)
    }

    /// `NP CLR`; forgets everything stored
    pub fn clear<S: LineSink>(&mut self, sink: &mut S) -> Result<(), HostError<S::Error>> {
        self.track = None;
        self.progress = None;
        self.cover = None;
        send(sink, &Command::NowPlayingClear)
    }

    /// Show `current`, with `next` below it
    ///
    /// Without a next line an empty `LRC NXT` clears the second row.
    pub fn publish_lyric<S: LineSink>(
        &mut self,
        current: &str,
        next: Option<&str>,
        sink: &mut S,
    ) -> Result<(), HostError<S::Error>> {
        let current: String<LYRIC_LEN> = sanitize(current, false);
        send(sink, &Command::LyricCurrent(&current))?;

        let next: String<LYRIC_LEN> = next.map(|text| sanitize(text, false)).unwrap_or_default();
        send(sink, &Command::LyricNext(&next))
    }

    /// `LRC CLR`
    pub fn clear_lyrics<S: LineSink>(&mut self, sink: &mut S) -> Result<(), HostError<S::Error>> {
        send(sink, &Command::LyricClear)
    }

    /// Send the stored track, progress and cover again
    ///
    /// Used after the device says hello. Repeat suppression does not apply.
    pub fn resend<S: LineSink>(&mut self, now_ms: u32, sink: &mut S) -> Result<(), HostError<S::Error>> {
        debug!("Resending now playing");
        if let Some(track) = self.track.as_ref().filter(|track| !track.is_empty()) {
            send_meta(track, sink)?;
        }
        if let Some(progress) = self.progress.as_mut().filter(|p| p.duration_ms > 0) {
            send(
                sink,
                &Command::NowPlayingProgress {
                    position_ms: progress.position_ms,
                    duration_ms: progress.duration_ms,
                },
            )?;
            progress.sent_ms = now_ms;
        }
        if let Some(cover) = &self.cover {
            send_cover(cover, sink)?;
        }
        Ok(())
    }
}

fn send_meta<S: LineSink>(track: &Track, sink: &mut S) -> Result<(), HostError<S::Error>> {
    send(
        sink,
        &Command::NowPlayingMeta {
            title: &track.title,
            artist: &track.artist,
        },
    )
}

/// `NP COV BEGIN`, `DATA` chunks of 100 pixels, `END`
fn send_cover<S: LineSink>(pixels: &[u16], sink: &mut S) -> Result<(), HostError<S::Error>> {
    send(
        sink,
        &Command::CoverBegin {
            width: COVER_WIDTH,
            height: COVER_HEIGHT,
        },
    )?;
    for chunk in pixels.chunks(PIXELS_PER_CHUNK) {
        let hex: String<{ PIXELS_PER_CHUNK * HEX_DIGITS_PER_PIXEL }> = encode_hex(chunk)?;
        send(sink, &Command::CoverData(&hex))?;
    }
    send(sink, &Command::CoverEnd)?;
    debug!("Cover sent, {} pixels", pixels.len());
    Ok(())
}
