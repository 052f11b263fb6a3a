//! Syntax highlighting for code blocks.
//!
//! Thin wrapper around `syntect` that turns code into styled ratatui lines.
//! Unknown or missing languages fall back to plain white text.

use std::sync::LazyLock;

use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

const THEME: &str = "base16-ocean.dark";
const TAB: &str = "    ";

/// Highlight `code` as `language`, one `Line` per source line.
///
/// Tabs are expanded to 4 spaces (ratatui renders `\t` as zero-width).
pub fn highlight(code: &str, language: Option<&str>) -> Vec<Line<'static>> {
    let syntax = language
        .filter(|lang| !lang.is_empty())
        .and_then(|lang| SYNTAX_SET.find_syntax_by_token(lang));
    let theme = THEME_SET.themes.get(THEME);

    let (Some(syntax), Some(theme)) = (syntax, theme) else {
        return plain(code);
    };

    let mut highlighter = HighlightLines::new(syntax, theme);
    let mut lines = Vec::new();
    for line in LinesWithEndings::from(code) {
        let Ok(ranges) = highlighter.highlight_line(line, &SYNTAX_SET) else {
            // Highlighter state is unreliable after an error
            lines.push(plain_line(line));
            continue;
        };
        let spans: Vec<Span<'static>> = ranges
            .into_iter()
            .filter_map(|(hl_style, frag)| {
                let content = frag.trim_end_matches(['\n', '\r']).replace('\t', TAB);
                if content.is_empty() {
                    return None;
                }
                let fg = Color::Rgb(
                    hl_style.foreground.r,
                    hl_style.foreground.g,
                    hl_style.foreground.b,
                );
                Some(Span::styled(content, Style::default().fg(fg)))
            })
            .collect();
        lines.push(Line::from(spans));
    }
    lines
}

fn plain(code: &str) -> Vec<Line<'static>> {
    code.lines().map(plain_line).collect()
}

fn plain_line(line: &str) -> Line<'static> {
    let content = line.trim_end_matches(['\n', '\r']).replace('\t', TAB);
    Line::from(Span::styled(content, Style::default().fg(Color::White)))
}
