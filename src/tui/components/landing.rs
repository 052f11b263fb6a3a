//! # Landing Page Component
//!
//! Shown in the chat pane while the active chat has no messages.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};

use crate::tui::component::Component;

pub const WELCOME_TEXT: &str = "Ask me anything, or try generating an image!";
pub const EXAMPLE_PROMPT: &str = "e.g., \"generate an image of a robot on a skateboard\"";

pub struct LandingPage {
    /// Animation frame; the heading pulses between two shades
    frame_index: usize,
}

impl LandingPage {
    pub fn new(frame_index: usize) -> Self {
        Self { frame_index }
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let heading = if (self.frame_index / 6) % 2 == 0 {
            Color::Cyan
        } else {
            Color::LightCyan
        };
        vec![
            Line::from(Span::styled(
                "Parley",
                Style::default().fg(heading).add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            Line::from(Span::styled(WELCOME_TEXT, Style::default().fg(Color::White))),
            Line::from(Span::styled(
                EXAMPLE_PROMPT,
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )),
            Line::default(),
            Line::from(Span::styled(
                format!("v{}", env!("CARGO_PKG_VERSION")),
                Style::default().fg(Color::DarkGray),
            )),
        ]
    }
}

impl Component for LandingPage {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let lines = self.lines();
        let [center] = Layout::vertical([Constraint::Length(lines.len() as u16)])
            .flex(Flex::Center)
            .areas(area);
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, center);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    #[test]
    fn test_renders_welcome_and_example() {
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                LandingPage::new(0).render(f, area)
            })
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains(WELCOME_TEXT));
        assert!(text.contains("robot on a skateboard"));
    }
}
