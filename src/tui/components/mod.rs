//! # TUI Components
//!
//! ## Component Architecture
//!
//! ### Stateless Components (Props-Based Rendering)
//!
//! Created fresh each frame from the data they display:
//! - `TitleBar`: model, chat title, status
//! - `Message`: one chat message
//! - `CodeBlock`: one fenced code block inside a message
//! - `LandingPage`: welcome text for an empty chat
//!
//! ### Stateful Components (Event-Driven)
//!
//! Persistent state lives in `TuiState`; a transient wrapper borrows it to
//! render:
//! - `InputBox`: prompt editor
//! - `MessageList` / `MessageListState`: scrollable chat with layout caching
//! - `Sidebar` / `SidebarState`: chat list
//!
//! Components receive external data as props, never by reaching into
//! `App` themselves.
//!
//! ```text
//! components/
//! ├── title_bar.rs
//! ├── sidebar.rs
//! ├── message_list.rs  (renders message.rs)
//! ├── message.rs       (renders code_block.rs)
//! ├── code_block.rs
//! ├── landing.rs
//! └── input_box/
//! ```

pub mod code_block;
pub mod input_box;
pub mod landing;
pub mod message;
pub mod message_list;
pub mod sidebar;
mod title_bar;

pub use input_box::{InputBox, InputEvent};
pub use landing::LandingPage;
pub use message_list::{ActionTarget, MessageList, MessageListState};
pub use sidebar::{SIDEBAR_WIDTH, Sidebar, SidebarEvent, SidebarState};
pub use title_bar::TitleBar;
