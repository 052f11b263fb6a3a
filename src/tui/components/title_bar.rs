//! # TitleBar Component
//!
//! One-line status bar above the chat pane:
//!
//! ```text
//! Parley (model: gemini-2.5-flash) | Trip ideas | Thinking... | ↓ New
//! ```
//!
//! Purely presentational. The chat title is omitted while it is still the
//! default, the status when empty, and the "↓ New" marker unless there is
//! content below the scroll position.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::Span;

use crate::tui::component::Component;

pub struct TitleBar<'a> {
    pub model_name: &'a str,
    /// Active chat title, `None` for an untitled chat
    pub chat_title: Option<&'a str>,
    pub status_message: &'a str,
    pub has_unseen_content: bool,
}

impl TitleBar<'_> {
    pub fn text(&self) -> String {
        let mut parts = vec![format!("Parley (model: {})", self.model_name)];
        if let Some(title) = self.chat_title {
            parts.push(title.to_string());
        }
        if !self.status_message.is_empty() {
            parts.push(self.status_message.to_string());
        }
        if self.has_unseen_content {
            parts.push("↓ New".to_string());
        }
        parts.join(" | ")
    }
}

impl Component for TitleBar<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(
            Span::styled(self.text(), Style::default().fg(Color::Gray)),
            area,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn bar<'a>(status: &'a str, title: Option<&'a str>, unseen: bool) -> TitleBar<'a> {
        TitleBar {
            model_name: "gemini-2.5-flash",
            chat_title: title,
            status_message: status,
            has_unseen_content: unseen,
        }
    }

    #[test]
    fn test_model_only() {
        assert_eq!(bar("", None, false).text(), "Parley (model: gemini-2.5-flash)");
    }

    #[test]
    fn test_all_parts_in_order() {
        assert_eq!(
            bar("Thinking...", Some("Trip ideas"), true).text(),
            "Parley (model: gemini-2.5-flash) | Trip ideas | Thinking... | ↓ New"
        );
    }

    #[test]
    fn test_render_writes_text() {
        let mut terminal = Terminal::new(TestBackend::new(80, 1)).unwrap();
        let mut title_bar = bar("Generating image...", None, false);
        terminal
            .draw(|f| {
                let area = f.area();
                title_bar.render(f, area)
            })
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("Parley (model: gemini-2.5-flash)"));
        assert!(text.contains("Generating image..."));
    }
}
