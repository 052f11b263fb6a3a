//! Wrapping and dimensions for the prompt editor.

/// Border (2) + padding (2) consumed horizontally by the bordered block
pub(super) const HORIZONTAL_OVERHEAD: u16 = 4;
/// Top + bottom borders consumed vertically
pub(super) const VERTICAL_OVERHEAD: u16 = 2;
/// Rows shown before the editor scrolls internally
pub(super) const MAX_VISIBLE_LINES: u16 = 5;
/// Border (1) + padding (1) before the first text column
pub(super) const TEXT_OFFSET_X: u16 = 2;

pub(super) fn wrap_options(width: u16) -> textwrap::Options<'static> {
    textwrap::Options::new(width as usize)
        .break_words(true)
        .word_separator(textwrap::WordSeparator::AsciiSpace)
}

pub(super) fn inner_width(area_width: u16) -> u16 {
    area_width.saturating_sub(HORIZONTAL_OVERHEAD)
}

/// Screen rows for `text` at `width`. Always at least one row; a trailing
/// newline opens an empty row for the cursor.
pub(super) fn wrapped_rows(text: &str, width: u16) -> Vec<String> {
    if width == 0 {
        return vec![String::new()];
    }
    let mut rows: Vec<String> = textwrap::wrap(text, wrap_options(width))
        .into_iter()
        .map(|row| row.into_owned())
        .collect();
    if rows.is_empty() || (text.ends_with('\n') && !rows.last().is_some_and(|r| r.is_empty())) {
        rows.push(String::new());
    }
    rows
}

pub(super) fn prev_char_boundary(text: &str, pos: usize) -> usize {
    text[..pos]
        .chars()
        .next_back()
        .map_or(0, |c| pos - c.len_utf8())
}

pub(super) fn next_char_boundary(text: &str, pos: usize) -> usize {
    text[pos..]
        .chars()
        .next()
        .map_or(text.len(), |c| pos + c.len_utf8())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_for_empty_text() {
        assert_eq!(wrapped_rows("", 80).len(), 1);
        assert_eq!(wrapped_rows("hello", 0).len(), 1);
    }

    #[test]
    fn rows_wrap_long_words() {
        assert_eq!(wrapped_rows("aaaaaaaaaa", 5), vec!["aaaaa", "aaaaa"]);
    }

    #[test]
    fn rows_follow_newlines() {
        assert_eq!(wrapped_rows("a\nb\nc", 80).len(), 3);
        assert_eq!(wrapped_rows("hello\n", 80).len(), 2);
        assert_eq!(wrapped_rows("aaaaaaaaaa\n", 5).len(), 3);
    }

    #[test]
    fn char_boundaries_respect_multibyte() {
        let s = "a🔥é";
        assert_eq!(next_char_boundary(s, 0), 1);
        assert_eq!(next_char_boundary(s, 1), 5);
        assert_eq!(next_char_boundary(s, 7), 7);
        assert_eq!(prev_char_boundary(s, 7), 5);
        assert_eq!(prev_char_boundary(s, 5), 1);
        assert_eq!(prev_char_boundary(s, 0), 0);
    }
}
