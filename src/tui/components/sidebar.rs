//! # Sidebar Component
//!
//! Left-hand list of chats, newest first. The active chat is marked, chats
//! with a request in flight show a spinner.
//!
//! Follows the persistent state + transient wrapper pattern:
//! - `SidebarState` lives in `TuiState`
//! - `Sidebar` is created each frame with borrowed state and props
//!
//! Ctrl+O focuses the list; Up/Down move, Enter opens, `n` starts a new chat,
//! Esc hands focus back to the input box.

use std::collections::HashMap;

use chrono::{DateTime, Local, Utc};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, List, ListItem, ListState, Padding};
use unicode_width::UnicodeWidthChar;

use crate::core::session::ChatSession;
use crate::core::state::Pending;
use crate::tui::component::Component;
use crate::tui::event::TuiEvent;

/// Sidebar width including borders.
pub const SIDEBAR_WIDTH: u16 = 30;
/// Each entry is a title line and a date line.
const ITEM_HEIGHT: u16 = 2;

const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];

/// Events emitted by the sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarEvent {
    Select(String),
    CreateNew,
    Dismiss,
}

#[derive(Default)]
pub struct SidebarState {
    /// Keyboard focus is on the list
    pub focused: bool,
    pub selected: usize,
    list_state: ListState,
}

impl SidebarState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take keyboard focus with the highlight on the active chat.
    pub fn focus(&mut self, ids: &[&str], active_id: Option<&str>) {
        self.focused = true;
        self.selected = active_id
            .and_then(|active| ids.iter().position(|id| *id == active))
            .unwrap_or(0);
    }

    /// Handle a key while focused. `ids` is the display order.
    pub fn handle_event(&mut self, event: &TuiEvent, ids: &[&str]) -> Option<SidebarEvent> {
        match event {
            TuiEvent::Escape | TuiEvent::FocusSidebar => Some(SidebarEvent::Dismiss),
            TuiEvent::CursorUp => {
                self.selected = self.selected.saturating_sub(1);
                None
            }
            TuiEvent::CursorDown => {
                if !ids.is_empty() {
                    self.selected = (self.selected + 1).min(ids.len() - 1);
                }
                None
            }
            TuiEvent::Submit => ids
                .get(self.selected)
                .map(|id| SidebarEvent::Select(id.to_string())),
            TuiEvent::InputChar('n') => Some(SidebarEvent::CreateNew),
            _ => None,
        }
    }

    /// Index of the chat drawn at `row` (relative to the list's first row).
    pub fn hit_test(&self, row: u16, len: usize) -> Option<usize> {
        let index = self.list_state.offset() + (row / ITEM_HEIGHT) as usize;
        (index < len).then_some(index)
    }
}

pub struct Sidebar<'a> {
    pub state: &'a mut SidebarState,
    /// Newest first
    pub sessions: &'a [&'a ChatSession],
    pub active_id: Option<&'a str>,
    pub pending: &'a HashMap<String, Pending>,
    pub spinner_frame: usize,
}

impl<'a> Sidebar<'a> {
    fn item(&self, index: usize, session: &ChatSession, text_width: usize) -> ListItem<'static> {
        let is_active = self.active_id == Some(session.id.as_str());
        let is_highlighted = self.state.focused && index == self.state.selected;

        let marker = if self.pending.contains_key(&session.id) {
            SPINNER[self.spinner_frame % SPINNER.len()]
        } else if is_active {
            "●"
        } else {
            " "
        };

        let mut title_style = if is_active {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        if is_highlighted {
            title_style = title_style.add_modifier(Modifier::REVERSED);
        }

        let title = truncate_to_width(&session.title, text_width.saturating_sub(2));
        ListItem::new(Text::from(vec![
            Line::from(vec![
                Span::styled(format!("{} ", marker), Style::default().fg(Color::Cyan)),
                Span::styled(title, title_style),
            ]),
            Line::from(Span::styled(
                format!("  {}", format_created(session.created_at)),
                Style::default().fg(Color::DarkGray),
            )),
        ]))
    }
}

impl Component for Sidebar<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let border = if self.state.focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let help = if self.state.focused {
            " Enter open · n new · Esc "
        } else {
            " Ctrl+N new · Ctrl+O "
        };
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(border)
            .title(" Chats ")
            .title_bottom(Line::from(help).centered())
            .padding(Padding::horizontal(1));

        let text_width = block.inner(area).width as usize;
        let items: Vec<ListItem> = self
            .sessions
            .iter()
            .enumerate()
            .map(|(i, session)| self.item(i, session, text_width))
            .collect();

        self.state.list_state.select(if self.state.focused {
            Some(self.state.selected)
        } else {
            self.sessions
                .iter()
                .position(|s| Some(s.id.as_str()) == self.active_id)
        });

        let list = List::new(items).block(block);
        frame.render_stateful_widget(list, area, &mut self.state.list_state);
    }
}

/// Format epoch milliseconds as a short local date, e.g. "Oct 16 14:03".
fn format_created(millis: i64) -> String {
    let dt: DateTime<Local> = DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_default()
        .with_timezone(&Local);
    dt.format("%b %d %H:%M").to_string()
}

/// Cut `text` to at most `max_width` columns, ending in "…" when cut.
fn truncate_to_width(text: &str, max_width: usize) -> String {
    let total: usize = text.chars().map(|c| c.width().unwrap_or(0)).sum();
    if total <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn session(title: &str, created_at: i64) -> ChatSession {
        ChatSession {
            title: title.to_string(),
            created_at,
            ..ChatSession::new()
        }
    }

    #[test]
    fn test_focus_highlights_active() {
        let mut state = SidebarState::new();
        state.focus(&["a", "b", "c"], Some("b"));
        assert!(state.focused);
        assert_eq!(state.selected, 1);
    }

    #[test]
    fn test_navigation_is_clamped() {
        let mut state = SidebarState::new();
        let ids = ["a", "b"];
        state.focus(&ids, None);
        state.handle_event(&TuiEvent::CursorUp, &ids);
        assert_eq!(state.selected, 0);
        state.handle_event(&TuiEvent::CursorDown, &ids);
        state.handle_event(&TuiEvent::CursorDown, &ids);
        assert_eq!(state.selected, 1);
    }

    #[test]
    fn test_events() {
        let mut state = SidebarState::new();
        let ids = ["a", "b"];
        state.focus(&ids, Some("b"));
        assert_eq!(
            state.handle_event(&TuiEvent::Submit, &ids),
            Some(SidebarEvent::Select("b".into()))
        );
        assert_eq!(
            state.handle_event(&TuiEvent::InputChar('n'), &ids),
            Some(SidebarEvent::CreateNew)
        );
        assert_eq!(
            state.handle_event(&TuiEvent::Escape, &ids),
            Some(SidebarEvent::Dismiss)
        );
        assert_eq!(state.handle_event(&TuiEvent::Submit, &[]), None);
    }

    #[test]
    fn test_hit_test_uses_two_row_items() {
        let state = SidebarState::new();
        assert_eq!(state.hit_test(0, 3), Some(0));
        assert_eq!(state.hit_test(3, 3), Some(1));
        assert_eq!(state.hit_test(6, 3), None);
    }

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdefghij", 5), "abcd…");
        assert_eq!(truncate_to_width("日本語のタイトル", 7), "日本語…");
    }

    #[test]
    fn test_render_lists_titles_and_marks_busy() {
        let older = session("Older chat", 1_000);
        let newer = session("Newer chat", 2_000);
        let sessions = vec![&newer, &older];
        let mut pending = HashMap::new();
        pending.insert(older.id.clone(), Pending::Image);
        let mut state = SidebarState::new();

        let mut terminal = Terminal::new(TestBackend::new(SIDEBAR_WIDTH, 10)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                Sidebar {
                    state: &mut state,
                    sessions: &sessions,
                    active_id: Some(&newer.id),
                    pending: &pending,
                    spinner_frame: 0,
                }
                .render(f, area)
            })
            .unwrap();

        let buffer = terminal.backend().buffer();
        let rows: Vec<String> = (0..10)
            .map(|y| (0..SIDEBAR_WIDTH).map(|x| buffer[(x, y)].symbol()).collect())
            .collect();
        let newer_row = rows.iter().position(|r| r.contains("Newer chat")).unwrap();
        let older_row = rows.iter().position(|r| r.contains("Older chat")).unwrap();
        assert!(newer_row < older_row);
        assert!(rows[newer_row].contains('●'));
        assert!(rows[older_row].contains('◐'));
    }
}
