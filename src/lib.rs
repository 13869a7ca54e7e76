//! settingsync - Sync editor settings across machines via GitHub Gist.
//!
//! Đồng bộ settings, keybindings, snippets và danh sách extensions của
//! editor giữa nhiều máy, dùng một gist làm snapshot store. Last-writer
//! wins, không merge nhiều chiều.

pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod extensions;
pub mod files;
pub mod summary;
pub mod sync;
