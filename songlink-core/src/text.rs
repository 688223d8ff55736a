//! Bounded text helpers

use heapless::String;

/// Longest prefix of `text` that fits in `max` bytes on a char boundary
pub(crate) fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Copy `text` into a fixed-capacity string, truncating if needed
pub(crate) fn bounded<const N: usize>(text: &str) -> String<N> {
    let mut out = String::new();
    // Cannot fail: the slice fits by construction
    let _ = out.push_str(truncate(text, N));
    out
}
