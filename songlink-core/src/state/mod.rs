//! Decoded media state
//!
//! What the display shows, built from host commands. The UI layer reads it;
//! the link runtime is the only writer.

pub mod media;

pub use media::{
    DeviceEntry, DeviceList, Lyrics, MediaChange, MediaState, NowPlaying, MAX_DEVICES,
    MAX_DEVICE_NAME_LEN, MAX_LYRIC_LEN, MAX_TITLE_LEN,
};
