use std::collections::HashSet;

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Padding, Paragraph, Widget, Wrap};

use crate::core::fence::{Segment, split_segments};
use crate::core::session::{Message as ChatMessage, Role};
use crate::core::snippet::{decoded_len, split_data_uri};
use crate::tui::component::Component;
use crate::tui::components::code_block::CodeBlock;

/// Horizontal padding (per side) between the border and text content.
const CONTENT_PAD_H: u16 = 1;
/// Total horizontal space consumed by borders (1 left + 1 right) and padding.
const HORIZONTAL_OVERHEAD: u16 = 2 + CONTENT_PAD_H * 2;
/// Total vertical space consumed by borders (1 top + 1 bottom).
const VERTICAL_OVERHEAD: u16 = 2;

/// Pulse intensity threshold above which the border transitions from normal to BOLD.
const PULSE_BOLD_THRESHOLD: f32 = 0.6;
/// Pulse intensity threshold above which the border transitions from DIM to normal.
const PULSE_NORMAL_THRESHOLD: f32 = 0.2;

const LOADING_DOTS: usize = 3;

/// A stateless component that renders a single chat message.
///
/// # Design
///
/// `Message` is a **transient component**: it's created fresh each frame with the data
/// it needs to render. Selection, the selected code block and open previews
/// are owned by the parent `MessageList`.
///
/// # Content
///
/// - **Loading, nothing received yet**: three pulsing dots.
/// - **Image**: a summary line (mime type and size). The terminal cannot
///   show the picture; `w` saves it.
/// - **Text**: split on fenced code. Plain segments render literally with
///   whitespace preserved, code segments render as [`CodeBlock`]s.
///
/// # Height Calculation
///
/// [`calculate_height`](Self::calculate_height) builds the same `Text` the
/// render pass uses and asks `Paragraph::line_count` for the wrapped height,
/// so the two always agree.
#[derive(Clone, Copy)]
pub struct Message<'a> {
    pub message: &'a ChatMessage,
    /// Whether this message is selected in Cursor mode
    pub is_selected: bool,
    /// Index of the code block the action keys target, if any
    pub selected_block: Option<usize>,
    /// Code block indices with their preview open
    pub previews: Option<&'a HashSet<usize>>,
    /// Current pulse intensity (0.0 to 1.0) for active generation animation
    pub pulse_intensity: f32,
    pub spinner_frame: usize,
}

impl<'a> Message<'a> {
    pub fn new(message: &'a ChatMessage) -> Self {
        Self {
            message,
            is_selected: false,
            selected_block: None,
            previews: None,
            pulse_intensity: 0.0,
            spinner_frame: 0,
        }
    }

    /// Calculate the height required for this message given a width.
    pub fn calculate_height(&self, width: u16) -> u16 {
        let content_width = width.saturating_sub(HORIZONTAL_OVERHEAD);
        if content_width == 0 {
            // Degenerate case: terminal too narrow for borders + padding.
            return 1;
        }
        let lines = self.paragraph().line_count(content_width) as u16;
        lines.max(1) + VERTICAL_OVERHEAD
    }

    fn base_style(&self) -> Style {
        match self.message.role {
            Role::User => Style::default().fg(Color::Green),
            Role::Assistant => Style::default().fg(Color::Blue),
        }
    }

    fn paragraph(&self) -> Paragraph<'static> {
        Paragraph::new(self.body())
            .style(self.base_style())
            .wrap(Wrap { trim: false })
    }

    /// Styled content, without the surrounding block.
    pub fn body(&self) -> Text<'static> {
        let message = self.message;
        if message.is_loading && message.content.is_empty() {
            return Text::from(loading_dots(self.spinner_frame));
        }
        if message.is_image {
            return Text::from(image_summary(&message.content));
        }

        let mut lines: Vec<Line<'static>> = Vec::new();
        let mut block_index = 0;
        let mut after_code = false;
        for segment in split_segments(&message.content) {
            match segment {
                Segment::Text(text) => {
                    // The newline right after a closing fence belongs to the fence
                    let text = match after_code {
                        true => text.strip_prefix('\n').unwrap_or(&text).to_string(),
                        false => text,
                    };
                    let text = text.strip_suffix('\n').unwrap_or(&text);
                    if !text.is_empty() {
                        lines.extend(text.split('\n').map(|l| Line::from(l.replace('\t', "    "))));
                    }
                    after_code = false;
                }
                Segment::Code { language, code } => {
                    let block = CodeBlock {
                        language: language.as_deref(),
                        code: &code,
                        is_selected: self.is_selected && self.selected_block == Some(block_index),
                        show_preview: self.previews.is_some_and(|p| p.contains(&block_index)),
                    };
                    lines.extend(block.lines());
                    block_index += 1;
                    after_code = true;
                }
            }
        }
        if lines.is_empty() {
            lines.push(Line::default());
        }
        Text::from(lines)
    }
}

fn loading_dots(frame: usize) -> Line<'static> {
    let lit = frame % LOADING_DOTS;
    let spans: Vec<Span<'static>> = (0..LOADING_DOTS)
        .map(|i| {
            let style = if i == lit {
                Style::default().fg(Color::Gray)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Span::styled(if i + 1 < LOADING_DOTS { "● " } else { "●" }, style)
        })
        .collect();
    Line::from(spans)
}

/// One-line description of an image message.
pub fn image_summary(data_uri: &str) -> Line<'static> {
    let style = Style::default()
        .fg(Color::Magenta)
        .add_modifier(Modifier::ITALIC);
    let text = match split_data_uri(data_uri) {
        Some((mime_type, payload)) => format!(
            "[image] {} · {:.1} KB · press w to save",
            mime_type,
            decoded_len(payload) as f64 / 1024.0
        ),
        None => "[image] unreadable data".to_string(),
    };
    Line::from(Span::styled(text, style))
}

// Implement Widget for easy usage in ScrollView
impl<'a> Widget for Message<'a> {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let role = match self.message.role {
            Role::User => "you",
            Role::Assistant => "assistant",
        };
        let style = self.base_style();

        // Selection: cyan border for selected, dim otherwise
        let mut border_style = if self.is_selected {
            Style::default().fg(Color::Cyan)
        } else {
            style.add_modifier(Modifier::DIM)
        };

        // Three-phase breathing while the reply streams: DIM → normal → BOLD
        if self.pulse_intensity > PULSE_BOLD_THRESHOLD {
            border_style = border_style
                .remove_modifier(Modifier::DIM)
                .add_modifier(Modifier::BOLD);
        } else if self.pulse_intensity > PULSE_NORMAL_THRESHOLD {
            border_style = border_style.remove_modifier(Modifier::DIM);
        }

        let block = Block::bordered()
            .title(role)
            .border_type(ratatui::widgets::BorderType::Rounded)
            .border_style(border_style)
            .title_style(border_style)
            .padding(Padding::horizontal(CONTENT_PAD_H));

        let inner_area = block.inner(area);
        block.render(area, buf);
        self.paragraph().render(inner_area, buf);
    }
}

impl<'a> Component for Message<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(*self, area);
    }
}
