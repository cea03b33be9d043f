//! User display settings
//!
//! This module contains the per-user display settings and their persistence:
//! - The `Settings` type (sort order and page size) with validation
//! - The `SettingsStore` trait for the key-value settings backend
//! - A SQLite-backed store and an in-memory store

mod store;
mod types;

pub use store::{
    MemorySettingsStore, SettingsError, SettingsResult, SettingsStore, SqliteSettingsStore,
};
pub use types::{Settings, SortMode};
