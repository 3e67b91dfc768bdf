//! Current - a personal micro-blog with optional Bluesky federation
//!
//! This library holds the core of the blog: the local post store, the
//! Bluesky federation client (rich-text facets, sessions, records) and the
//! services that keep both sides consistent.

pub mod config;
pub mod db;
pub mod error;
pub mod federation;
pub mod logging;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use error::{CurrentError, Result};
pub use types::{Post, PostPage};
