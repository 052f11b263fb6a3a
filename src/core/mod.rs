//! # Core Application Logic
//!
//! Parley's business logic. Nothing here knows about the terminal.
//!
//! Data flows one way:
//!
//! ```text
//! key press ─► Action ─► update(&mut App) ─► Effect ─► tui spawns task
//!                 ▲                                          │
//!                 └──── ReplyFragment / ReplyFinished ◄──────┘
//!                       ImageReady
//! ```
//!
//! Every message change goes through `SessionStore`, which writes the whole
//! session list back to its `KeyValueStore`.
//!
//! ## Modules
//!
//! - [`state`]: The `App` struct, all application state in one place
//! - [`action`]: The `Action` enum and the `update()` reducer
//! - [`store`] / [`storage`]: Session list and its persistence slot
//! - [`session`]: Persisted data model
//! - [`intent`]: Image-request detection
//! - [`fence`]: Fenced-code splitting for rendering
//! - [`snippet`]: Saving code blocks and images, HTML preview text
//! - [`config`]: Layered configuration

pub mod action;
pub mod config;
pub mod fence;
pub mod intent;
pub mod session;
pub mod snippet;
pub mod state;
pub mod storage;
pub mod store;
