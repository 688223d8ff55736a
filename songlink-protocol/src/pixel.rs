//! Cover-art pixel encoding
//!
//! Covers are RGB565 thumbnails sent as `NP COV DATA` lines. Each pixel is a
//! quartet of hex digits holding the big-endian 16-bit value:
//! ```text
//! "F800" -> 0xF800 (pure red)
//! ```
//! The host sends [`PIXELS_PER_CHUNK`] pixels per line.

use core::fmt::Write;
use heapless::String;

use crate::command::CodecError;

/// Cover width in pixels
pub const COVER_WIDTH: u16 = 40;

/// Cover height in pixels
pub const COVER_HEIGHT: u16 = 40;

/// Maximum pixels in one cover
pub const COVER_PIXELS: usize = COVER_WIDTH as usize * COVER_HEIGHT as usize;

/// Pixels carried by a single `NP COV DATA` line
pub const PIXELS_PER_CHUNK: usize = 100;

/// Hex digits per pixel
pub const HEX_DIGITS_PER_PIXEL: usize = 4;

/// Decode one hex quartet into its 16-bit value
///
/// Returns `None` if the slice is not exactly four hex digits.
pub fn decode_quartet(quartet: &[u8]) -> Option<u16> {
    if quartet.len() != HEX_DIGITS_PER_PIXEL {
        return None;
    }
    quartet.iter().try_fold(0u16, |value, &digit| {
        let nibble = (digit as char).to_digit(16)?;
        Some((value << 4) | nibble as u16)
    })
}

/// Iterate the quartets of a hex string
///
/// Yields one item per complete quartet: `Some(value)` for valid hex,
/// `None` for a quartet containing a non-hex character. A trailing partial
/// quartet is ignored.
pub fn quartets(hex: &str) -> impl Iterator<Item = Option<u16>> + '_ {
    hex.as_bytes()
        .chunks_exact(HEX_DIGITS_PER_PIXEL)
        .map(decode_quartet)
}

/// Encode pixels as uppercase hex quartets
pub fn encode_hex<const N: usize>(pixels: &[u16]) -> Result<String<N>, CodecError> {
    let mut hex = String::new();
    for pixel in pixels {
        write!(hex, "{:04X}", pixel).map_err(|_| CodecError::LineTooLong)?;
    }
    Ok(hex)
}

/// Pack 8-bit RGB into RGB565
pub fn rgb565(red: u8, green: u8, blue: u8) -> u16 {
    ((red as u16 & 0xF8) << 8) | ((green as u16 & 0xFC) << 3) | (blue as u16 >> 3)
}
