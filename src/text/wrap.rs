//! Greedy word wrapping measured in terminal columns.

use super::str_width;

const BULLET: &str = "- ";
const ARROW: &str = "→ ";

/// Wrap `text` to `width` columns, never splitting a word.
///
/// Continuation lines of a `- ` bullet are indented by two spaces; lines of
/// an `→ ` item are indented to align just past the arrow. A word wider than
/// `width` occupies a line of its own.
#[must_use]
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut words = text.split_whitespace();
    let Some(first) = words.next() else {
        return vec![String::new()];
    };

    let indent = continuation_indent(text);

    let mut lines = Vec::new();
    let mut current = first.to_string();
    for word in words {
        if str_width(&current) + 1 + str_width(word) <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(&indent);
            current.push_str(word);
        }
    }
    lines.push(current);
    lines
}

fn continuation_indent(text: &str) -> String {
    if text.starts_with(BULLET) {
        return "  ".to_string();
    }
    let trimmed = text.trim_start();
    if trimmed.starts_with(ARROW) {
        let leading = text.chars().count() - trimmed.chars().count();
        return " ".repeat(leading + 2);
    }
    String::new()
}
