//! # InputBox Component
//!
//! Multi-line prompt editor at the bottom of the chat pane.
//!
//! - Enter submits, Ctrl+J (or Shift+Enter) inserts a newline
//! - Grows up to five rows, then scrolls internally
//! - `disabled` while the active chat waits for a reply: edits and submits
//!   are ignored and the title says how to cancel

mod cursor;
mod text_wrap;

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{
    Block, BorderType, Padding, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
};

use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

use cursor::CursorState;
use text_wrap::{
    MAX_VISIBLE_LINES, TEXT_OFFSET_X, VERTICAL_OVERHEAD, inner_width, next_char_boundary,
    prev_char_boundary, wrapped_rows,
};

const TITLE: &str = "Message (Enter send · Ctrl+J newline)";
const BUSY_TITLE: &str = "Waiting for reply (Esc to cancel)";

/// High-level events emitted by the InputBox
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// User submitted the text (Enter pressed)
    Submit(String),
    ContentChanged,
}

pub struct InputBox {
    pub buffer: String,
    /// Active chat is waiting on a reply (Prop)
    pub disabled: bool,
    /// Keyboard focus is elsewhere (Prop)
    pub dimmed: bool,
    cursor: CursorState,
}

impl Default for InputBox {
    fn default() -> Self {
        Self::new()
    }
}

impl InputBox {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            disabled: false,
            dimmed: false,
            cursor: CursorState::new(),
        }
    }

    /// Height for the current buffer, between 1 and `MAX_VISIBLE_LINES` rows
    /// plus borders.
    pub fn calculate_height(&self, area_width: u16) -> u16 {
        let rows = wrapped_rows(&self.buffer, inner_width(area_width)).len() as u16;
        rows.min(MAX_VISIBLE_LINES) + VERTICAL_OVERHEAD
    }

    fn insert(&mut self, text: &str) -> Option<InputEvent> {
        self.buffer.insert_str(self.cursor.pos, text);
        self.cursor.pos += text.len();
        Some(InputEvent::ContentChanged)
    }

    fn move_to(&mut self, pos: usize) -> Option<InputEvent> {
        (pos != self.cursor.pos).then(|| {
            self.cursor.pos = pos;
            InputEvent::ContentChanged
        })
    }

    fn render_scrollbar(&self, frame: &mut Frame, area: Rect, total_rows: u16) {
        if total_rows <= MAX_VISIBLE_LINES {
            return;
        }
        let mut state = ScrollbarState::default()
            .content_length((total_rows - MAX_VISIBLE_LINES) as usize)
            .position(self.cursor.scroll_offset as usize);
        let scrollbar_area = Rect {
            x: area.x + area.width.saturating_sub(1),
            y: area.y + 1,
            width: 1,
            height: area.height.saturating_sub(2),
        };
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            scrollbar_area,
            &mut state,
        );
    }
}

impl Component for InputBox {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let width = inner_width(area.width);
        let rows = wrapped_rows(&self.buffer, width);
        let total_rows = rows.len() as u16;
        let (cursor_row, cursor_col) = self.cursor.row_col(&self.buffer, width);
        self.cursor.update_scroll_offset(cursor_row, total_rows);

        let visible: Vec<Line> = rows
            .into_iter()
            .skip(self.cursor.scroll_offset as usize)
            .take(MAX_VISIBLE_LINES as usize)
            .map(Line::from)
            .collect();

        let mut style = Style::default().fg(Color::Green);
        if self.disabled || self.dimmed {
            style = style.add_modifier(Modifier::DIM);
        }
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .title(if self.disabled { BUSY_TITLE } else { TITLE })
            .padding(Padding::horizontal(1));

        frame.render_widget(Paragraph::new(visible).block(block).style(style), area);
        self.render_scrollbar(frame, area, total_rows);

        if !self.disabled && !self.dimmed {
            let row = cursor_row.saturating_sub(self.cursor.scroll_offset);
            frame.set_cursor_position((
                area.x + TEXT_OFFSET_X + cursor_col,
                area.y + 1 + row,
            ));
        }
    }
}

impl EventHandler for InputBox {
    type Event = InputEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        if self.disabled {
            return None;
        }
        match event {
            TuiEvent::InputChar(c) => self.insert(c.encode_utf8(&mut [0; 4])),
            TuiEvent::Paste(text) => self.insert(text),
            TuiEvent::Backspace => {
                if self.cursor.pos == 0 {
                    return None;
                }
                let prev = prev_char_boundary(&self.buffer, self.cursor.pos);
                self.buffer.drain(prev..self.cursor.pos);
                self.cursor.pos = prev;
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Delete => {
                if self.cursor.pos >= self.buffer.len() {
                    return None;
                }
                let next = next_char_boundary(&self.buffer, self.cursor.pos);
                self.buffer.drain(self.cursor.pos..next);
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::CursorLeft => self.move_to(prev_char_boundary(&self.buffer, self.cursor.pos)),
            TuiEvent::CursorRight => {
                self.move_to(next_char_boundary(&self.buffer, self.cursor.pos))
            }
            TuiEvent::CursorHome => {
                let start = self.buffer[..self.cursor.pos]
                    .rfind('\n')
                    .map_or(0, |i| i + 1);
                self.move_to(start)
            }
            TuiEvent::CursorEnd => {
                let end = self.buffer[self.cursor.pos..]
                    .find('\n')
                    .map_or(self.buffer.len(), |i| self.cursor.pos + i);
                self.move_to(end)
            }
            TuiEvent::CursorUp => self
                .cursor
                .move_vertically(&self.buffer, false)
                .then_some(InputEvent::ContentChanged),
            TuiEvent::CursorDown => self
                .cursor
                .move_vertically(&self.buffer, true)
                .then_some(InputEvent::ContentChanged),
            TuiEvent::Submit => {
                if self.buffer.trim().is_empty() {
                    return None;
                }
                let text = std::mem::take(&mut self.buffer);
                self.cursor.reset();
                Some(InputEvent::Submit(text))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn type_text(input: &mut InputBox, text: &str) {
        for c in text.chars() {
            input.handle_event(&TuiEvent::InputChar(c));
        }
    }

    fn rendered(input: &mut InputBox, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                input.render(f, area)
            })
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_typing_and_backspace() {
        let mut input = InputBox::new();
        type_text(&mut input, "ab");
        assert_eq!(input.buffer, "ab");

        let res = input.handle_event(&TuiEvent::Backspace);
        assert_eq!(res, Some(InputEvent::ContentChanged));
        assert_eq!(input.buffer, "a");
    }

    #[test]
    fn test_backspace_removes_whole_multibyte_char() {
        let mut input = InputBox::new();
        type_text(&mut input, "café");
        input.handle_event(&TuiEvent::Backspace);
        assert_eq!(input.buffer, "caf");
    }

    #[test]
    fn test_insert_in_middle() {
        let mut input = InputBox::new();
        type_text(&mut input, "ac");
        input.handle_event(&TuiEvent::CursorLeft);
        type_text(&mut input, "b");
        assert_eq!(input.buffer, "abc");
    }

    #[test]
    fn test_submit_clears_buffer() {
        let mut input = InputBox::new();
        type_text(&mut input, "hello");

        let res = input.handle_event(&TuiEvent::Submit);
        assert_eq!(res, Some(InputEvent::Submit("hello".to_string())));
        assert!(input.buffer.is_empty());
    }

    #[test]
    fn test_blank_submit_is_ignored() {
        let mut input = InputBox::new();
        type_text(&mut input, "  \n ");
        assert_eq!(input.handle_event(&TuiEvent::Submit), None);
        assert_eq!(input.buffer, "  \n ");
    }

    #[test]
    fn test_disabled_ignores_edits_and_submit() {
        let mut input = InputBox::new();
        type_text(&mut input, "draft");
        input.disabled = true;

        assert_eq!(input.handle_event(&TuiEvent::Submit), None);
        assert_eq!(input.handle_event(&TuiEvent::InputChar('x')), None);
        assert_eq!(input.buffer, "draft");
    }

    #[test]
    fn test_height_grows_then_caps() {
        let mut input = InputBox::new();
        assert_eq!(input.calculate_height(40), 1 + VERTICAL_OVERHEAD);
        input.handle_event(&TuiEvent::Paste("1\n2\n3".into()));
        assert_eq!(input.calculate_height(40), 3 + VERTICAL_OVERHEAD);
        input.handle_event(&TuiEvent::Paste("\n4\n5\n6\n7".into()));
        assert_eq!(input.calculate_height(40), MAX_VISIBLE_LINES + VERTICAL_OVERHEAD);
    }

    #[test]
    fn test_render_titles() {
        let mut input = InputBox::new();
        assert!(rendered(&mut input, 60, 3).contains("Enter send"));
        input.disabled = true;
        assert!(rendered(&mut input, 60, 3).contains("Esc to cancel"));
    }
}
