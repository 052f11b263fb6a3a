//! # MessageList Component
//!
//! Scrollable view of the active chat.
//!
//! ## Responsibilities
//!
//! - Display the chat's messages
//! - Scrolling, with stick-to-bottom while a reply streams in
//! - Message and code-block selection for the action keys
//! - Efficient layout caching (Message heights)
//!
//! ## Architecture
//!
//! `MessageList` is a transient component (created each frame) that wraps
//! `&'a mut MessageListState` (persistent state) and the messages (props).
//! State is per chat: the event loop resets it when the active chat changes.

use std::collections::HashSet;

use ratatui::Frame;
use ratatui::layout::{Position, Rect, Size};
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};

use crate::core::fence::{code_blocks, is_previewable};
use crate::core::session::{Message as ChatMessage, Role};
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::message::Message;
use crate::tui::event::TuiEvent;

/// What the action keys (`y`, `w`, `p`) operate on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionTarget {
    Code {
        language: Option<String>,
        code: String,
        /// (message index, block index), the preview key
        key: (usize, usize),
    },
    Image(String),
}

/// Layout and scroll state for the message list.
/// Must be persisted in the parent TuiState.
pub struct MessageListState {
    pub scroll_state: ScrollViewState,
    pub layout: LayoutCache,
    /// When true, auto-scroll to bottom on new content
    pub stick_to_bottom: bool,
    /// Currently selected message index (click or keyboard navigation)
    pub selected_index: Option<usize>,
    /// Code block within the selected message
    pub selected_block: Option<usize>,
    /// Open previews as (message index, block index)
    pub previews: HashSet<(usize, usize)>,
    /// Last known viewport height (for scroll clamping between frames)
    pub viewport_height: u16,
}

impl Default for MessageListState {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageListState {
    pub fn new() -> Self {
        Self {
            scroll_state: ScrollViewState::default(),
            layout: LayoutCache::new(),
            stick_to_bottom: true,
            selected_index: None,
            selected_block: None,
            previews: HashSet::new(),
            viewport_height: 0,
        }
    }

    fn max_scroll(&self) -> u16 {
        self.layout.total_height().saturating_sub(self.viewport_height)
    }

    /// Clamp scroll offset so it never exceeds the content bounds.
    pub fn clamp_scroll(&mut self) {
        let max_y = self.max_scroll();
        let current = self.scroll_state.offset();
        if current.y > max_y {
            self.scroll_state.set_offset(Position {
                x: current.x,
                y: max_y,
            });
        }
    }

    /// Whether content exists below the viewport.
    pub fn has_unseen_content(&self) -> bool {
        !self.stick_to_bottom && self.scroll_state.offset().y < self.max_scroll()
    }

    /// Scroll the viewport so the selected message is fully visible.
    /// If the message is taller than the viewport, align its top edge.
    pub fn scroll_to_selected(&mut self) {
        let Some(idx) = self.selected_index else {
            return;
        };
        if idx >= self.layout.prefix_heights.len() {
            return;
        }

        let item_top = self.layout.item_top(idx);
        let item_bottom = self.layout.prefix_heights[idx];
        let offset_y = self.scroll_state.offset().y;

        if item_top < offset_y || item_bottom - item_top > self.viewport_height {
            self.scroll_state.set_offset(Position { x: 0, y: item_top });
            self.stick_to_bottom = false;
        } else if item_bottom > offset_y + self.viewport_height {
            let new_y = item_bottom.saturating_sub(self.viewport_height);
            self.scroll_state.set_offset(Position { x: 0, y: new_y });
            // Re-pin if we've landed at the absolute bottom
            self.stick_to_bottom = new_y >= self.max_scroll();
        }
    }

    /// Clamp scroll and re-engage auto-scroll if the user has reached the bottom.
    pub fn repin_if_at_bottom(&mut self) {
        let max_y = self.max_scroll();
        let current = self.scroll_state.offset();
        if current.y >= max_y {
            self.stick_to_bottom = true;
            self.scroll_state.set_offset(Position {
                x: current.x,
                y: max_y,
            });
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected_index = None;
        self.selected_block = None;
    }

    /// Select message `idx`, targeting its first code block if it has one.
    pub fn select(&mut self, messages: &[ChatMessage], idx: usize) {
        let Some(message) = messages.get(idx) else {
            return;
        };
        self.selected_index = Some(idx);
        self.selected_block = (block_count(message) > 0).then_some(0);
        self.scroll_to_selected();
    }

    /// Move the message selection up or down. From no selection, Up picks
    /// the last message.
    pub fn move_selection(&mut self, messages: &[ChatMessage], down: bool) {
        if messages.is_empty() {
            return;
        }
        let idx = match (self.selected_index, down) {
            (None, _) => messages.len() - 1,
            (Some(i), false) => i.saturating_sub(1),
            (Some(i), true) => (i + 1).min(messages.len() - 1),
        };
        self.select(messages, idx);
    }

    /// Step to the next (or previous) code block across the whole chat,
    /// wrapping around.
    pub fn cycle_block(&mut self, messages: &[ChatMessage], forward: bool) {
        let all: Vec<(usize, usize)> = messages
            .iter()
            .enumerate()
            .flat_map(|(m, message)| (0..block_count(message)).map(move |b| (m, b)))
            .collect();
        if all.is_empty() {
            return;
        }

        let current = self.selected_index.zip(self.selected_block);
        let position = current.and_then(|c| all.iter().position(|&p| p == c));
        let next = match (position, forward) {
            (Some(p), true) => (p + 1) % all.len(),
            (Some(p), false) => (p + all.len() - 1) % all.len(),
            (None, true) => {
                // First block at or after the selected message
                let from = self.selected_index.unwrap_or(0);
                all.iter().position(|&(m, _)| m >= from).unwrap_or(0)
            }
            (None, false) => all.len() - 1,
        };

        let (m, b) = all[next];
        self.selected_index = Some(m);
        self.selected_block = Some(b);
        self.scroll_to_selected();
    }

    /// What `y`/`w`/`p` act on for the current selection.
    pub fn action_target(&self, messages: &[ChatMessage]) -> Option<ActionTarget> {
        let idx = self.selected_index?;
        let message = messages.get(idx)?;
        if message.is_image {
            return Some(ActionTarget::Image(message.content.clone()));
        }
        let block = self.selected_block?;
        let (language, code) = code_blocks(&message.content).into_iter().nth(block)?;
        Some(ActionTarget::Code {
            language,
            code,
            key: (idx, block),
        })
    }

    /// Open or close the preview of the selected block. Returns `Some(open)`
    /// when the block is previewable.
    pub fn toggle_preview(&mut self, messages: &[ChatMessage]) -> Option<bool> {
        let Some(ActionTarget::Code { language, key, .. }) = self.action_target(messages) else {
            return None;
        };
        if !is_previewable(language.as_deref()) {
            return None;
        }
        if self.previews.remove(&key) {
            Some(false)
        } else {
            self.previews.insert(key);
            Some(true)
        }
    }
}

fn block_count(message: &ChatMessage) -> usize {
    if message.is_image {
        0
    } else {
        code_blocks(&message.content).len()
    }
}

fn previews_for(previews: &HashSet<(usize, usize)>, idx: usize) -> HashSet<usize> {
    previews
        .iter()
        .filter(|(m, _)| *m == idx)
        .map(|(_, b)| *b)
        .collect()
}

/// Scrollable conversation view component.
/// Created fresh each frame with references to state and data.
pub struct MessageList<'a> {
    pub state: &'a mut MessageListState,
    pub messages: &'a [ChatMessage],
    pub pulse_value: f32,
    pub spinner_frame: usize,
}

impl<'a> MessageList<'a> {
    pub fn new(
        state: &'a mut MessageListState,
        messages: &'a [ChatMessage],
        pulse_value: f32,
        spinner_frame: usize,
    ) -> Self {
        Self {
            state,
            messages,
            pulse_value,
            spinner_frame,
        }
    }

    fn widget<'b>(&'b self, idx: usize, previews: &'b HashSet<usize>) -> Message<'b> {
        let messages: &'b [ChatMessage] = self.messages;
        let message = &messages[idx];
        let is_selected = self.state.selected_index == Some(idx);
        Message {
            message,
            is_selected,
            selected_block: if is_selected { self.state.selected_block } else { None },
            previews: Some(previews),
            pulse_intensity: if message.is_loading { self.pulse_value } else { 0.0 },
            spinner_frame: self.spinner_frame,
        }
    }
}

impl<'a> Component for MessageList<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let content_width = area.width.saturating_sub(1); // -1 for scrollbar safe area
        let messages = self.messages;
        let num_items = messages.len();
        let selection = self.state.selected_index.map(|i| (i, self.state.selected_block));
        let preview_sets: Vec<HashSet<usize>> = (0..num_items)
            .map(|i| previews_for(&self.state.previews, i))
            .collect();

        // 1. Update Layout Cache
        let reusable = self.state.layout.reusable_count(
            messages,
            content_width,
            &self.state.previews,
            selection,
        );
        self.state
            .layout
            .heights
            .truncate(reusable.min(self.state.layout.heights.len()));
        for i in self.state.layout.heights.len()..num_items {
            let height = self.widget(i, &preview_sets[i]).calculate_height(content_width);
            self.state.layout.heights.push(height);
        }
        let layout = &mut self.state.layout;
        layout.rebuild_prefix_heights();
        layout.update_metadata(num_items, content_width, &self.state.previews, selection);

        let total_height = self.state.layout.total_height();

        // 2. Clamp scroll offset to prevent overscrolling past content.
        self.state.viewport_height = area.height;
        if !self.state.stick_to_bottom {
            self.state.clamp_scroll();
        }

        let scroll_offset = self.state.scroll_state.offset().y;
        let visible_range = self.state.layout.visible_range(scroll_offset, area.height);

        // 3. Render visible messages into a ScrollView
        let mut scroll_view = ScrollView::new(Size::new(content_width, total_height))
            .vertical_scrollbar_visibility(ScrollbarVisibility::Always)
            .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);

        let mut y_offset = self.state.layout.item_top(visible_range.start);
        for i in visible_range {
            let height = self.state.layout.heights[i];
            let rect = Rect::new(0, y_offset, content_width, height);
            scroll_view.render_widget(self.widget(i, &preview_sets[i]), rect);
            y_offset = y_offset.saturating_add(height);
        }

        if self.state.stick_to_bottom {
            self.state.scroll_state.scroll_to_bottom();
        }

        frame.render_stateful_widget(scroll_view, area, &mut self.state.scroll_state);
    }
}

/// EventHandler is implemented on `MessageListState` rather than `MessageList`
/// because scroll position must outlive the per-frame wrapper.
impl EventHandler for MessageListState {
    type Event = ();

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::ScrollUp => {
                self.scroll_state.scroll_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollDown => {
                self.scroll_state.scroll_down();
                self.repin_if_at_bottom();
            }
            TuiEvent::ScrollPageUp => {
                self.scroll_state.scroll_page_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollPageDown => {
                self.scroll_state.scroll_page_down();
                self.repin_if_at_bottom();
            }
            _ => {}
        }
        None
    }
}

type Selection = Option<(usize, Option<usize>)>;

/// Cached layout measurements
pub struct LayoutCache {
    pub heights: Vec<u16>,
    pub prefix_heights: Vec<u16>,
    message_count: usize,
    content_width: u16,
    /// Open previews when the heights were measured
    cached_previews: HashSet<(usize, usize)>,
    /// Selection when the heights were measured; block hints can wrap
    cached_selection: Selection,
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutCache {
    pub fn new() -> Self {
        Self {
            heights: Vec::new(),
            prefix_heights: Vec::new(),
            message_count: 0,
            content_width: 0,
            cached_previews: HashSet::new(),
            cached_selection: None,
        }
    }

    /// How many leading cached heights are still valid.
    pub fn reusable_count(
        &self,
        messages: &[ChatMessage],
        content_width: u16,
        previews: &HashSet<(usize, usize)>,
        selection: Selection,
    ) -> usize {
        let message_count = messages.len();
        if self.content_width != content_width || self.heights.is_empty() {
            return 0;
        }

        // Fewer messages than cached: the list was replaced
        if message_count < self.message_count {
            return 0;
        }

        let mut reusable = message_count;

        // Preview toggles change the height of their message onward
        if let Some(earliest) = previews
            .symmetric_difference(&self.cached_previews)
            .map(|(m, _)| *m)
            .min()
        {
            reusable = reusable.min(earliest);
        }

        if selection != self.cached_selection {
            let touched = [selection, self.cached_selection]
                .into_iter()
                .flatten()
                .map(|(m, _)| m)
                .min();
            if let Some(earliest) = touched {
                reusable = reusable.min(earliest);
            }
        }

        // The last assistant message may still be growing, or may have been
        // finalized between frames.
        let last_is_volatile = messages
            .last()
            .is_some_and(|last| last.role == Role::Assistant);
        if last_is_volatile {
            reusable = reusable.min(message_count - 1);
        }

        reusable
    }

    pub fn update_metadata(
        &mut self,
        message_count: usize,
        content_width: u16,
        previews: &HashSet<(usize, usize)>,
        selection: Selection,
    ) {
        self.message_count = message_count;
        self.content_width = content_width;
        self.cached_previews = previews.clone();
        self.cached_selection = selection;
    }

    pub fn rebuild_prefix_heights(&mut self) {
        self.prefix_heights = self
            .heights
            .iter()
            .scan(0u16, |acc, &h| {
                *acc = acc.saturating_add(h);
                Some(*acc)
            })
            .collect();
    }

    pub fn total_height(&self) -> u16 {
        self.prefix_heights.last().copied().unwrap_or(0)
    }

    /// Content y where item `idx` starts.
    pub fn item_top(&self, idx: usize) -> u16 {
        if idx == 0 {
            0
        } else {
            self.prefix_heights.get(idx - 1).copied().unwrap_or(0)
        }
    }

    pub fn visible_range(&self, scroll_offset: u16, viewport_height: u16) -> std::ops::Range<usize> {
        let buffer = viewport_height / 2;
        let buffered_start = scroll_offset.saturating_sub(buffer);
        let buffered_end = scroll_offset
            .saturating_add(viewport_height)
            .saturating_add(buffer);

        let start = self
            .prefix_heights
            .partition_point(|&end| end <= buffered_start);
        let end = self
            .prefix_heights
            .partition_point(|&end| end < buffered_end)
            .saturating_add(1)
            .min(self.prefix_heights.len());

        start..end.max(start)
    }
}
