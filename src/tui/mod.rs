//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the UI,
//! and translates keyboard events into core::Action values.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Redraw Strategy
//!
//! The event loop uses conditional redraw to avoid unnecessary work:
//!
//! - **Animating** (landing page, any chat waiting on a reply): draws every
//!   ~80ms for smooth animation.
//! - **Idle**: sleeps up to 500ms, only redraws on events, background
//!   actions or terminal resize.
//!
//! A `SteadyBlock` cursor style is used instead of a blinking cursor because
//! ratatui's `set_cursor_position` resets the terminal's blink timer on every
//! `draw()` call, making blinking cursors appear erratic during continuous redraws.
//!
//! ## Background Work
//!
//! Replies and images run on tokio tasks and report back as `Action`s over a
//! std channel, drained once per loop iteration. Each session can have one
//! reply task; its `AbortHandle` is kept so Esc can cancel it.

mod clipboard;
mod component;
mod components;
mod event;
mod highlight;
mod ui;

use log::{debug, info, warn};
use std::collections::HashMap;
use std::io::stdout;
use std::path::Path;
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, SetCursorStyle, Show};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use tokio::task::AbortHandle;

use crate::core::action::{Action, Effect, ImageJob, ReplyJob, update};
use crate::core::config::ResolvedConfig;
use crate::core::fence::PLAIN_LANGUAGE;
use crate::core::session::Message;
use crate::core::snippet;
use crate::core::state::App;
use crate::core::storage::{FileStore, KeyValueStore, MemoryStore};
use crate::core::store::SessionStore;
use crate::inference::assistant::FRAGMENT_BUFFER;
use crate::inference::{Assistant, AssistantSettings, GeminiProvider};
use crate::tui::component::EventHandler;
use crate::tui::components::{
    ActionTarget, InputBox, InputEvent, MessageListState, SidebarEvent, SidebarState,
};
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};

const ANIMATION_TICK: Duration = Duration::from_millis(80);
const IDLE_TICK: Duration = Duration::from_millis(500);

/// Modal input mode: determines how keyboard events are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Navigate messages and code blocks. Typing auto-switches to Input.
    Cursor,
    /// Text editing in the input box. Esc switches to Cursor.
    Input,
}

/// TUI-specific presentation state (not part of core business logic)
pub struct TuiState {
    pub message_list: MessageListState,
    pub input_box: InputBox,
    pub sidebar: SidebarState,
    pub input_mode: InputMode,
    pub pulse_value: f32,
    /// Session the message list state belongs to
    pub list_session: Option<String>,
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            message_list: MessageListState::new(),
            input_box: InputBox::new(),
            sidebar: SidebarState::new(),
            input_mode: InputMode::Input, // User expects to type immediately
            pulse_value: 0.0,
            list_session: None,
        }
    }

    /// Reset per-chat view state when the active session changed.
    fn sync_session(&mut self, active_id: Option<&str>) {
        if self.list_session.as_deref() != active_id {
            debug!("Active session changed to {:?}", active_id);
            self.message_list = MessageListState::new();
            self.list_session = active_id.map(str::to_string);
            self.input_mode = InputMode::Input;
        }
    }

    fn enter_input_mode(&mut self) {
        self.input_mode = InputMode::Input;
        self.message_list.clear_selection();
    }
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

/// Running reply tasks, one per session, tagged with the placeholder they
/// stream into.
#[derive(Default)]
struct ReplyTasks {
    tasks: HashMap<String, (String, AbortHandle)>,
}

impl ReplyTasks {
    fn start(&mut self, session_id: String, message_id: String, handle: AbortHandle) {
        self.tasks.insert(session_id, (message_id, handle));
    }

    /// Forget the task behind `message_id`. A late finish from a cancelled
    /// task leaves a newer task in the same session alone.
    fn finished(&mut self, session_id: &str, message_id: &str) {
        if self
            .tasks
            .get(session_id)
            .is_some_and(|(current, _)| current == message_id)
        {
            self.tasks.remove(session_id);
        }
    }

    fn abort(&mut self, session_id: &str) {
        if let Some((message_id, handle)) = self.tasks.remove(session_id) {
            info!(
                "Aborting reply task for session {} (message {})",
                session_id, message_id
            );
            handle.abort();
        }
    }

    fn abort_all(&mut self) {
        for (_, (_, handle)) in self.tasks.drain() {
            handle.abort();
        }
    }

    fn len(&self) -> usize {
        self.tasks.len()
    }

    #[cfg(test)]
    fn is_running(&self, session_id: &str) -> bool {
        self.tasks.contains_key(session_id)
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        // Kitty keyboard protocol is pushed unconditionally; terminals without
        // support ignore it
        execute!(
            stdout(),
            EnableMouseCapture,
            EnableBracketedPaste,
            Show,
            SetCursorStyle::SteadyBlock,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )?;
        info!(
            "Terminal modes enabled (mouse, bracketed paste, steady block cursor, keyboard enhancement)"
        );
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(
            stdout(),
            PopKeyboardEnhancementFlags,
            DisableMouseCapture,
            DisableBracketedPaste,
            Hide
        );
    }
}

/// Wire the assistant and session store from a resolved config.
pub fn build_app(config: &ResolvedConfig) -> std::io::Result<App> {
    let api_key = config.api_key.clone().unwrap_or_default();
    let provider = Arc::new(GeminiProvider::new(api_key, Some(config.base_url.clone())));
    let assistant = Assistant::new(
        provider,
        AssistantSettings {
            model: config.model.clone(),
            image_model: config.image_model.clone(),
            system_prompt: config.system_prompt.clone(),
            max_cached_chats: config.max_cached_chats,
        },
    );

    info!(
        "Assistant ready: provider={}, model={}",
        assistant.provider_name(),
        assistant.model()
    );

    let backend: Box<dyn KeyValueStore> = if config.ephemeral {
        info!("Ephemeral mode: chats are kept in memory only");
        Box::new(MemoryStore::new())
    } else {
        Box::new(FileStore::open(&config.data_dir)?)
    };

    Ok(App::new(SessionStore::load(backend), Arc::new(assistant)))
}

pub fn run(config: ResolvedConfig) -> std::io::Result<()> {
    let app = build_app(&config)?;

    let mut terminal = ratatui::init();
    let result = TerminalModeGuard::new().and_then(|_guard| {
        event_loop(&mut terminal, app, &config.downloads_dir)
    });
    ratatui::restore();
    result
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    mut app: App,
    downloads_dir: &Path,
) -> std::io::Result<()> {
    let mut tui = TuiState::new();

    // Channel for actions from background tasks
    let (tx, rx) = mpsc::channel();
    let mut replies = ReplyTasks::default();

    let start_time = Instant::now();
    let mut needs_redraw = true;

    loop {
        tui.sync_session(app.store.active_id());
        tui.input_box.disabled = app.active_is_busy();
        tui.input_box.dimmed = tui.input_mode == InputMode::Cursor || tui.sidebar.focused;

        let chat_is_empty = app.store.active().is_none_or(|s| s.messages.is_empty());
        let animating = app.any_busy() || chat_is_empty;
        if animating {
            needs_redraw = true;
        }

        if needs_redraw {
            let elapsed = start_time.elapsed().as_secs_f32();
            tui.pulse_value = (elapsed * 5.0).sin() * 0.5 + 0.5;
            let spinner_frame = (elapsed * 12.0) as usize;
            terminal.draw(|f| ui::draw_ui(f, &app, &mut tui, spinner_frame))?;
            needs_redraw = false;
        }

        let timeout = if animating { ANIMATION_TICK } else { IDLE_TICK };
        let first_event = poll_event_timeout(timeout);
        if first_event.is_some() {
            needs_redraw = true;
        }

        let mut effects = Vec::new();
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            let frame_area = terminal.get_frame().area();
            effects.push(handle_event(
                event,
                &mut app,
                &mut tui,
                frame_area,
                downloads_dir,
            ));
            tui.sync_session(app.store.active_id());
        }

        // Drain background actions
        while let Ok(action) = rx.try_recv() {
            needs_redraw = true;
            if let Action::ReplyFinished {
                session_id,
                message_id,
                ..
            } = &action
            {
                replies.finished(session_id, message_id);
            }
            effects.push(update(&mut app, action));
        }

        let mut should_quit = false;
        for effect in effects {
            match effect {
                Effect::None => {}
                Effect::StreamReply(job) => {
                    let session_id = job.session_id.clone();
                    let message_id = job.message_id.clone();
                    let handle = spawn_reply(app.assistant.clone(), job, tx.clone());
                    replies.start(session_id, message_id, handle);
                }
                Effect::GenerateImage(job) => {
                    spawn_image(app.assistant.clone(), job, tx.clone());
                }
                Effect::AbortReply(session_id) => replies.abort(&session_id),
                Effect::Quit => should_quit = true,
            }
        }

        if should_quit {
            info!("Quitting with {} reply task(s) in flight", replies.len());
            replies.abort_all();
            return Ok(());
        }
    }
}

/// Route one terminal event. Returns the effect of any dispatched action.
fn handle_event(
    event: TuiEvent,
    app: &mut App,
    tui: &mut TuiState,
    frame_area: Rect,
    downloads_dir: &Path,
) -> Effect {
    match event {
        TuiEvent::Resize => return Effect::None,
        TuiEvent::ForceQuit => return update(app, Action::Quit),
        TuiEvent::NewChat => {
            tui.sidebar.focused = false;
            return update(app, Action::NewSession);
        }
        TuiEvent::FocusSidebar if !tui.sidebar.focused => {
            let sessions = app.store.sessions_by_recency();
            let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
            tui.sidebar.focus(&ids, app.store.active_id());
            return Effect::None;
        }
        TuiEvent::MouseClick(column, row) => {
            return handle_click(column, row, app, tui, frame_area);
        }
        TuiEvent::ScrollUp
        | TuiEvent::ScrollDown
        | TuiEvent::ScrollPageUp
        | TuiEvent::ScrollPageDown => {
            tui.message_list.handle_event(&event);
            return Effect::None;
        }
        _ => {}
    }

    if tui.sidebar.focused {
        let sessions = app.store.sessions_by_recency();
        let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
        let Some(sidebar_event) = tui.sidebar.handle_event(&event, &ids) else {
            return Effect::None;
        };
        tui.sidebar.focused = false;
        return match sidebar_event {
            SidebarEvent::Select(id) => update(app, Action::SelectSession(id)),
            SidebarEvent::CreateNew => update(app, Action::NewSession),
            SidebarEvent::Dismiss => Effect::None,
        };
    }

    let messages = app
        .store
        .active()
        .map(|s| s.messages.as_slice())
        .unwrap_or_default();

    match tui.input_mode {
        InputMode::Input => match event {
            TuiEvent::Escape if app.active_is_busy() => update(app, Action::CancelReply),
            TuiEvent::Escape => {
                tui.input_mode = InputMode::Cursor;
                tui.message_list.move_selection(messages, false);
                Effect::None
            }
            TuiEvent::NextBlock | TuiEvent::PreviousBlock => {
                tui.input_mode = InputMode::Cursor;
                let forward = event == TuiEvent::NextBlock;
                tui.message_list.cycle_block(messages, forward);
                Effect::None
            }
            _ => match tui.input_box.handle_event(&event) {
                Some(InputEvent::Submit(text)) => update(app, Action::Submit(text)),
                Some(InputEvent::ContentChanged) | None => Effect::None,
            },
        },
        InputMode::Cursor => match event {
            TuiEvent::Escape if app.active_is_busy() => update(app, Action::CancelReply),
            TuiEvent::Escape | TuiEvent::Submit => {
                tui.enter_input_mode();
                Effect::None
            }
            TuiEvent::CursorUp | TuiEvent::CursorDown => {
                let down = event == TuiEvent::CursorDown;
                tui.message_list.move_selection(messages, down);
                Effect::None
            }
            TuiEvent::NextBlock | TuiEvent::PreviousBlock => {
                let forward = event == TuiEvent::NextBlock;
                tui.message_list.cycle_block(messages, forward);
                Effect::None
            }
            TuiEvent::InputChar(c @ ('y' | 'w' | 'p')) => {
                app.status_message = block_action(c, tui, messages, downloads_dir);
                Effect::None
            }
            // Typing auto-switches to Input mode and forwards the event
            TuiEvent::InputChar(_) | TuiEvent::Paste(_) => {
                tui.enter_input_mode();
                tui.input_box.handle_event(&event);
                Effect::None
            }
            _ => Effect::None,
        },
    }
}

fn handle_click(
    column: u16,
    row: u16,
    app: &mut App,
    tui: &mut TuiState,
    frame_area: Rect,
) -> Effect {
    let input_height = tui.input_box.calculate_height(frame_area.width);
    let layout = ui::screen_layout(frame_area, input_height);

    let sidebar = layout.sidebar;
    let in_sidebar_list = column >= sidebar.x
        && column < sidebar.x + sidebar.width
        && row > sidebar.y
        && row + 1 < sidebar.y + sidebar.height;
    if in_sidebar_list {
        let sessions = app.store.sessions_by_recency();
        let hit = tui
            .sidebar
            .hit_test(row - sidebar.y - 1, sessions.len())
            .and_then(|idx| sessions.get(idx))
            .map(|s| s.id.clone());
        tui.sidebar.focused = false;
        return match hit {
            Some(id) => update(app, Action::SelectSession(id)),
            None => Effect::None,
        };
    }

    let scroll_offset = tui.message_list.scroll_state.offset().y;
    let hit = ui::hit_test_message(
        column,
        row,
        layout.messages,
        scroll_offset,
        &tui.message_list.layout.prefix_heights,
    );
    if let Some(idx) = hit
        && let Some(session) = app.store.active()
    {
        tui.input_mode = InputMode::Cursor;
        tui.message_list.select(&session.messages, idx);
    }
    Effect::None
}

/// Run the copy (`y`), save (`w`) or preview (`p`) key on the selection.
/// Returns the status line to show.
fn block_action(
    key: char,
    tui: &mut TuiState,
    messages: &[Message],
    downloads_dir: &Path,
) -> String {
    if key == 'p' {
        return match tui.message_list.toggle_preview(messages) {
            Some(true) => String::from("Preview opened"),
            Some(false) => String::from("Preview closed"),
            None => String::from("Preview is only available for HTML blocks"),
        };
    }

    let Some(target) = tui.message_list.action_target(messages) else {
        return String::from("Select a code block first (Tab)");
    };

    match (key, target) {
        ('y', ActionTarget::Code { language, code, .. }) => match clipboard::copy(&code) {
            Ok(()) => format!(
                "Copied {} code",
                language.as_deref().unwrap_or(PLAIN_LANGUAGE)
            ),
            Err(e) => {
                warn!("Clipboard copy failed: {}", e);
                format!("Copy failed: {}", e)
            }
        },
        ('y', ActionTarget::Image(_)) => String::from("Images can't be copied; press w to save"),
        (_, ActionTarget::Code { language, code, .. }) => {
            saved_status(snippet::save_code(&code, language.as_deref(), downloads_dir))
        }
        (_, ActionTarget::Image(data_uri)) => {
            saved_status(snippet::save_image(&data_uri, downloads_dir))
        }
    }
}

fn saved_status(result: std::io::Result<std::path::PathBuf>) -> String {
    match result {
        Ok(path) => {
            info!("Saved {}", path.display());
            format!("Saved {}", path.display())
        }
        Err(e) => {
            warn!("Save failed: {}", e);
            format!("Save failed: {}", e)
        }
    }
}

fn spawn_reply(assistant: Arc<Assistant>, job: ReplyJob, tx: mpsc::Sender<Action>) -> AbortHandle {
    info!(
        "Spawning reply for session {} (history={} messages)",
        job.session_id,
        job.history.len()
    );

    let handle = tokio::spawn(async move {
        let (fragment_tx, mut fragment_rx) = tokio::sync::mpsc::channel::<String>(FRAGMENT_BUFFER);

        let forward_tx = tx.clone();
        let session_id = job.session_id.clone();
        let message_id = job.message_id.clone();
        let forward = async move {
            while let Some(text) = fragment_rx.recv().await {
                let fragment = Action::ReplyFragment {
                    session_id: session_id.clone(),
                    message_id: message_id.clone(),
                    text,
                };
                if forward_tx.send(fragment).is_err() {
                    warn!("Failed to forward reply fragment: receiver dropped");
                    return;
                }
            }
        };

        let (result, ()) = tokio::join!(
            assistant.stream_reply(&job.session_id, &job.history, &job.text, fragment_tx),
            forward
        );
        if let Err(e) = &result {
            warn!("Reply failed for session {}: {}", job.session_id, e);
        }

        let finished = Action::ReplyFinished {
            session_id: job.session_id,
            message_id: job.message_id,
            error: result.err().map(|e| e.to_string()),
        };
        if tx.send(finished).is_err() {
            warn!("Failed to send ReplyFinished: receiver dropped");
        }
    });
    handle.abort_handle()
}

fn spawn_image(assistant: Arc<Assistant>, job: ImageJob, tx: mpsc::Sender<Action>) {
    info!("Spawning image generation for session {}", job.session_id);
    tokio::spawn(async move {
        let outcome = assistant.generate_image(&job.prompt).await;
        let ready = Action::ImageReady {
            session_id: job.session_id,
            outcome,
        };
        if tx.send(ready).is_err() {
            warn!("Failed to send ImageReady: receiver dropped");
        }
    });
}
