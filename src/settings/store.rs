//! Settings persistence backends
//!
//! The settings store is a key-value collaborator: `load` is called once at
//! startup (absence keeps the defaults) and `save` is fire-and-forget. The
//! settings value itself is stored as an opaque JSON blob.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;

use crate::settings::Settings;

const SETTINGS_KEY: &str = "settings";

/// Errors that can occur during settings operations
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for settings operations
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Trait for settings storage backends
pub trait SettingsStore {
    /// Loads the persisted settings, if any
    fn load(&mut self) -> SettingsResult<Option<Settings>>;

    /// Persists the given settings, replacing any previous value
    fn save(&mut self, settings: &Settings) -> SettingsResult<()>;
}

/// SQLite-backed settings store
///
/// Holds a single-row key/value table with the settings serialized as a JSON
/// blob under a fixed key.
pub struct SqliteSettingsStore {
    conn: Connection,
}

impl SqliteSettingsStore {
    /// Opens (or creates) a settings database at the given path
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteSettingsStore)` - Successfully opened/created database
    /// * `Err(SettingsError)` - Failed to open database
    pub fn new(path: &Path) -> SettingsResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;
        Self::initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory store (for testing and the demo binary)
    pub fn new_in_memory() -> SettingsResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn initialize_schema(conn: &Connection) -> SettingsResult<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
        ",
        )?;
        Ok(())
    }
}

impl SettingsStore for SqliteSettingsStore {
    fn load(&mut self) -> SettingsResult<Option<Settings>> {
        let blob: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![SETTINGS_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match blob {
            Some(blob) => Ok(Some(serde_json::from_str(&blob)?)),
            None => Ok(None),
        }
    }

    fn save(&mut self, settings: &Settings) -> SettingsResult<()> {
        let blob = serde_json::to_string(settings)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![SETTINGS_KEY, blob],
        )?;
        Ok(())
    }
}

/// In-memory settings store
///
/// Used by tests and as a fallback when no database path is configured.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Option<Settings>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with the given settings
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: Some(settings),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&mut self) -> SettingsResult<Option<Settings>> {
        Ok(self.settings.clone())
    }

    fn save(&mut self, settings: &Settings) -> SettingsResult<()> {
        self.settings = Some(settings.clone());
        Ok(())
    }
}
