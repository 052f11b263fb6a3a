//! # CodeBlock Component
//!
//! Renders one fenced code block inside a message as bordered lines:
//!
//! ```text
//! ╭─ python ───── y copy · w save
//! │ print("hi")
//! ╰──
//! ```
//!
//! The block's actions (copy, save, preview) are driven from the event loop
//! on the selected block; this component only shows which ones apply. An
//! HTML block with its preview open gets an extra section with the
//! document's text.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::core::fence::{PLAIN_LANGUAGE, is_previewable};
use crate::core::snippet::preview_text;
use crate::tui::highlight::highlight;

pub struct CodeBlock<'a> {
    pub language: Option<&'a str>,
    pub code: &'a str,
    /// Block is the target of the action keys.
    pub is_selected: bool,
    pub show_preview: bool,
}

impl<'a> CodeBlock<'a> {
    pub fn label(&self) -> &'a str {
        self.language.unwrap_or(PLAIN_LANGUAGE)
    }

    /// Key hints for the header. Preview only for previewable languages.
    pub fn action_hints(&self) -> String {
        let mut hints = vec!["y copy", "w save"];
        if is_previewable(self.language) {
            hints.push(if self.show_preview {
                "p hide preview"
            } else {
                "p preview"
            });
        }
        hints.join(" · ")
    }

    pub fn lines(&self) -> Vec<Line<'static>> {
        let border = if self.is_selected {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let mut header = vec![
            Span::styled("╭─ ", border),
            Span::styled(
                self.label().to_string(),
                border.add_modifier(Modifier::BOLD),
            ),
            Span::styled(" ─", border),
        ];
        if self.is_selected {
            header.push(Span::styled(format!("  {}", self.action_hints()), border));
        }

        let mut lines = vec![Line::from(header)];
        for code_line in highlight(self.code, self.language) {
            let mut spans = vec![Span::styled("│ ", border)];
            spans.extend(code_line.spans);
            lines.push(Line::from(spans));
        }

        if self.show_preview && is_previewable(self.language) {
            lines.push(Line::from(Span::styled("├─ preview", border)));
            let text_style = Style::default().fg(Color::Gray);
            let preview = preview_text(self.code);
            if preview.is_empty() {
                lines.push(Line::from(vec![
                    Span::styled("│ ", border),
                    Span::styled("(empty document)", text_style.add_modifier(Modifier::ITALIC)),
                ]));
            }
            for text in preview {
                lines.push(Line::from(vec![
                    Span::styled("│ ", border),
                    Span::styled(text, text_style),
                ]));
            }
        }

        lines.push(Line::from(Span::styled("╰──", border)));
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_block_has_border_structure() {
        let block = CodeBlock {
            language: Some("python"),
            code: "a = 1\nb = 2\n",
            is_selected: false,
            show_preview: false,
        };
        let all = texts(&block.lines());
        assert_eq!(all.len(), 4);
        assert!(all[0].starts_with("╭─ python"));
        assert!(all[1].starts_with("│ ") && all[1].contains("a = 1"));
        assert!(all[2].contains("b = 2"));
        assert_eq!(all[3], "╰──");
    }

    #[test]
    fn test_missing_language_shows_plaintext() {
        let block = CodeBlock {
            language: None,
            code: "x",
            is_selected: false,
            show_preview: false,
        };
        assert!(texts(&block.lines())[0].contains("plaintext"));
    }

    #[test]
    fn test_hints_only_when_selected() {
        let mut block = CodeBlock {
            language: Some("js"),
            code: "x",
            is_selected: false,
            show_preview: false,
        };
        assert!(!texts(&block.lines())[0].contains("y copy"));
        block.is_selected = true;
        let header = &texts(&block.lines())[0];
        assert!(header.contains("y copy"));
        assert!(!header.contains("preview"));
    }

    #[test]
    fn test_html_preview_section() {
        let block = CodeBlock {
            language: Some("html"),
            code: "<h1>Hi</h1><script>evil()</script>",
            is_selected: true,
            show_preview: true,
        };
        let all = texts(&block.lines());
        assert!(all[0].contains("p hide preview"));
        assert!(all.iter().any(|l| l == "├─ preview"));
        assert!(all.iter().any(|l| l == "│ Hi"));
        assert!(!all.iter().skip(2).any(|l| l.contains("evil") && !l.contains("<script>")));
    }

    #[test]
    fn test_preview_ignored_for_non_html() {
        let block = CodeBlock {
            language: Some("python"),
            code: "x",
            is_selected: false,
            show_preview: true,
        };
        assert!(!texts(&block.lines()).iter().any(|l| l.contains("preview")));
    }
}
