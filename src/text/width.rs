//! Terminal column width of characters and strings.

use unicode_width::UnicodeWidthChar;

/// Display width of a character: 2 for East-Asian Wide/Fullwidth, else 1.
///
/// Zero-width and control characters count as one column so that a string
/// is never narrower than its character count.
#[must_use]
pub fn char_width(ch: char) -> usize {
    match ch.width() {
        Some(2) => 2,
        _ => 1,
    }
}

/// Display width of a string.
#[must_use]
pub fn str_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Pad `s` with trailing spaces to exactly `width` columns.
///
/// Strings already at or beyond `width` are returned unchanged.
#[must_use]
pub fn pad_right(s: &str, width: usize) -> String {
    let current = str_width(s);
    if current >= width {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + width - current);
    out.push_str(s);
    out.extend(std::iter::repeat_n(' ', width - current));
    out
}
