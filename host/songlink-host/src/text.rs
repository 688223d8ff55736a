//! Text cleanup for outbound fields

use heapless::String;

/// Make `text` safe for a single protocol line
///
/// Line breaks become spaces, as do tabs when `fold_tabs` is set (titles and
/// artists, where a tab separates the fields). The result is trimmed and cut
/// to `N` bytes on a char boundary.
pub fn sanitize<const N: usize>(text: &str, fold_tabs: bool) -> String<N> {
    let mut out = String::new();
    for c in text.trim().chars() {
        let c = match c {
            '\r' | '\n' => ' ',
            '\t' if fold_tabs => ' ',
            c => c,
        };
        if out.push(c).is_err() {
            break;
        }
    }
    // Folding can expose new trailing whitespace
    while out.ends_with(char::is_whitespace) {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_breaks_become_spaces() {
        let s: String<32> = sanitize("  Left\r\nRight\t", false);
        assert_eq!(s, "Left  Right");
    }

    #[test]
    fn test_tabs_folded_for_meta() {
        let s: String<32> = sanitize("A\tB", true);
        assert_eq!(s, "A B");
        let kept: String<32> = sanitize("A\tB", false);
        assert_eq!(kept, "A\tB");
    }

    #[test]
    fn test_truncates_on_char_boundary() {
        // 'é' is two bytes
        let s: String<4> = sanitize("abcé", true);
        assert_eq!(s, "abc");
    }

    #[test]
    fn test_trailing_break_is_trimmed() {
        let s: String<32> = sanitize("Song\n\r", true);
        assert_eq!(s, "Song");
    }

    proptest::proptest! {
        #[test]
        fn test_sanitized_text_is_one_field(text in "[a-zé \\t\\r\\n]{0,80}") {
            let s: String<48> = sanitize(&text, true);
            proptest::prop_assert!(!s.contains(['\r', '\n', '\t']));
            proptest::prop_assert!(s.len() <= 48);
            proptest::prop_assert_eq!(s.as_str(), s.trim_end());
        }
    }
}
