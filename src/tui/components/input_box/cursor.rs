//! Cursor tracking for the prompt editor.
//!
//! The buffer itself lives in `InputBox`; every method takes it explicitly.

use unicode_width::UnicodeWidthStr;

use super::text_wrap::{MAX_VISIBLE_LINES, wrap_options, wrapped_rows};

pub(super) struct CursorState {
    /// Byte offset into the buffer (0..=buffer.len())
    pub pos: usize,
    /// First visible row when the text is taller than the editor
    pub scroll_offset: u16,
}

impl CursorState {
    pub fn new() -> Self {
        Self {
            pos: 0,
            scroll_offset: 0,
        }
    }

    pub fn reset(&mut self) {
        self.pos = 0;
        self.scroll_offset = 0;
    }

    /// Move to the same column on the previous or next logical line.
    /// Returns `false` at the first or last line.
    pub fn move_vertically(&mut self, buffer: &str, down: bool) -> bool {
        let line_start = buffer[..self.pos].rfind('\n').map_or(0, |i| i + 1);
        let column = buffer[line_start..self.pos].chars().count();

        let target_start = if down {
            match buffer[self.pos..].find('\n') {
                Some(i) => self.pos + i + 1,
                None => return false,
            }
        } else {
            if line_start == 0 {
                return false;
            }
            buffer[..line_start - 1].rfind('\n').map_or(0, |i| i + 1)
        };
        let target_end = buffer[target_start..]
            .find('\n')
            .map_or(buffer.len(), |i| target_start + i);
        let line = &buffer[target_start..target_end];

        self.pos = target_start
            + line
                .char_indices()
                .nth(column)
                .map_or(line.len(), |(i, _)| i);
        true
    }

    /// Wrapped (row, column) of the cursor within the text.
    pub fn row_col(&self, buffer: &str, width: u16) -> (u16, u16) {
        if width == 0 {
            return (0, 0);
        }
        let before = &buffer[..self.pos];
        let row = wrapped_rows(before, width).len().saturating_sub(1) as u16;

        // Column from the current logical line; wrapped rows drop trailing spaces
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let logical = &before[line_start..];
        let segments = textwrap::wrap(logical, wrap_options(width));
        let consumed: usize = segments
            .iter()
            .take(segments.len().saturating_sub(1))
            .map(|s| s.width())
            .sum();
        let column = logical.width().saturating_sub(consumed) as u16;
        (row, column.min(width))
    }

    /// Keep the cursor row inside the visible window.
    pub fn update_scroll_offset(&mut self, cursor_row: u16, total_rows: u16) {
        if total_rows <= MAX_VISIBLE_LINES {
            self.scroll_offset = 0;
        } else if cursor_row < self.scroll_offset {
            self.scroll_offset = cursor_row;
        } else if cursor_row >= self.scroll_offset + MAX_VISIBLE_LINES {
            self.scroll_offset = cursor_row + 1 - MAX_VISIBLE_LINES;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertical_moves_keep_column() {
        let buffer = "hello\nhi\nworld";
        let mut cursor = CursorState { pos: 4, scroll_offset: 0 };

        assert!(cursor.move_vertically(buffer, true));
        // "hi" is shorter: clamp to its end
        assert_eq!(cursor.pos, 8);
        assert!(cursor.move_vertically(buffer, true));
        assert_eq!(cursor.pos, 11);
        assert!(!cursor.move_vertically(buffer, true));

        assert!(cursor.move_vertically(buffer, false));
        assert!(cursor.move_vertically(buffer, false));
        assert_eq!(cursor.pos, 2);
        assert!(!cursor.move_vertically(buffer, false));
    }

    #[test]
    fn row_col_after_newline() {
        let buffer = "ab\n";
        let cursor = CursorState { pos: 3, scroll_offset: 0 };
        assert_eq!(cursor.row_col(buffer, 20), (1, 0));
    }

    #[test]
    fn row_col_on_wrapped_row() {
        let buffer = "aaaaaaa";
        let cursor = CursorState { pos: 7, scroll_offset: 0 };
        assert_eq!(cursor.row_col(buffer, 5), (1, 2));
    }

    #[test]
    fn scroll_follows_cursor() {
        let mut cursor = CursorState::new();
        cursor.update_scroll_offset(7, 10);
        assert_eq!(cursor.scroll_offset, 3);
        cursor.update_scroll_offset(1, 10);
        assert_eq!(cursor.scroll_offset, 1);
        cursor.update_scroll_offset(0, 3);
        assert_eq!(cursor.scroll_offset, 0);
    }
}
