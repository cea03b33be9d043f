//! Clipstream: a quality-filtered short-video feed
//!
//! This crate assembles a continuously growing feed of playable video clips
//! from a paginated, best-effort upstream listing API. It keeps requesting
//! pages until a target count of playable items is reached, and cleanly
//! restarts the whole pipeline whenever the source or the user settings
//! change.

pub mod feed;
pub mod listing;
pub mod media;
pub mod settings;

use thiserror::Error;

/// Main error type for clipstream operations
#[derive(Debug, Error)]
pub enum ClipError {
    #[error("Settings error: {0}")]
    Settings(#[from] settings::SettingsError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for clipstream operations
pub type Result<T> = std::result::Result<T, ClipError>;

// Re-export commonly used types
pub use feed::{FeedConfig, FeedOrchestrator};
pub use listing::{build_http_client, Clip, ClipPage, ListingClient};
pub use settings::{MemorySettingsStore, Settings, SettingsStore, SortMode, SqliteSettingsStore};
