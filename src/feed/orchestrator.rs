//! Feed orchestrator
//!
//! Top-level coordinator for the pipeline. It watches the (source, settings)
//! pair and, on any accepted change, resets pagination, clears the feed and
//! starts a fresh fill cycle, discarding the previous pipeline instance.
//!
//! Cancellation is a generation counter guarded by the same lock as the
//! pagination state and the accumulator: every pipeline instance captures the
//! generation it was started under, and every continuation checks it inside
//! that lock before committing anything. A restart holds the lock while it
//! increments the generation and resets the state, so a superseded instance
//! can never observe a stale generation and then write after the reset.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{oneshot, watch};

use crate::feed::engine::run_fill_cycle;
use crate::feed::{FeedAccumulator, Pagination};
use crate::listing::{Clip, ListingClient};
use crate::settings::{Settings, SettingsError, SettingsStore, SortMode};
use crate::ClipError;

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Upstream listing origin
    pub base_url: String,

    /// Window in which rapid source edits collapse to one restart
    pub debounce: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.reddit.com".to_string(),
            debounce: Duration::from_millis(300),
        }
    }
}

/// Coordinates the fetch/retry/accumulate pipeline for one session
#[derive(Clone)]
pub struct FeedOrchestrator {
    inner: Arc<Inner>,
}

/// Everything a fill cycle reads and writes, under one lock
///
/// The generation lives here, not in an atomic, so that checking it and
/// committing the write it guards is a single critical section.
struct PipelineState {
    /// Current pipeline instance; only the matching instance's results count
    generation: u64,
    pagination: Pagination,
    accumulator: FeedAccumulator,
}

struct Inner {
    client: ListingClient,
    store: Mutex<Box<dyn SettingsStore + Send>>,
    settings: Mutex<Settings>,
    settings_loaded: AtomicBool,
    source: Mutex<Option<String>>,
    pipeline: Mutex<PipelineState>,
    loading_tx: watch::Sender<bool>,
    /// Sequence of source edits, for debounce supersession
    edit_seq: AtomicU64,
    debounce: Duration,
}

impl FeedOrchestrator {
    /// Creates an orchestrator with defaults for everything but the store
    pub fn new(
        http: reqwest::Client,
        store: Box<dyn SettingsStore + Send>,
    ) -> Result<Self, ClipError> {
        Self::with_config(http, store, FeedConfig::default())
    }

    /// Creates an orchestrator with an explicit configuration
    ///
    /// # Arguments
    ///
    /// * `http` - The HTTP client for listing requests
    /// * `store` - The settings persistence backend
    /// * `config` - Base URL and debounce window
    pub fn with_config(
        http: reqwest::Client,
        store: Box<dyn SettingsStore + Send>,
        config: FeedConfig,
    ) -> Result<Self, ClipError> {
        let client = ListingClient::new(http, &config.base_url)?;
        let (loading_tx, _) = watch::channel(false);

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                store: Mutex::new(store),
                settings: Mutex::new(Settings::default()),
                settings_loaded: AtomicBool::new(false),
                source: Mutex::new(None),
                pipeline: Mutex::new(PipelineState {
                    generation: 0,
                    pagination: Pagination::default(),
                    accumulator: FeedAccumulator::new(),
                }),
                loading_tx,
                edit_seq: AtomicU64::new(0),
                debounce: config.debounce,
            }),
        })
    }

    /// Loads persisted settings from the store
    ///
    /// Called once at startup. Absence keeps the defaults. Persisting via
    /// [`set_settings`](Self::set_settings) only starts after this has run,
    /// so a failed or skipped load can never be clobbered by a save.
    pub fn init(&self) -> Result<(), ClipError> {
        let loaded = self.inner.store.lock().unwrap().load()?;
        if let Some(settings) = loaded {
            tracing::debug!("loaded persisted settings: {:?}", settings);
            *self.inner.settings.lock().unwrap() = settings;
        }
        self.inner.settings_loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Returns a receiver observing the current feed value
    pub fn feed(&self) -> watch::Receiver<Vec<Clip>> {
        self.inner.pipeline.lock().unwrap().accumulator.subscribe()
    }

    /// Returns a receiver observing the loading flag
    ///
    /// True while a fill cycle runs; false at every stop, including
    /// exhaustion and a spent attempt budget. Never left true on failure.
    pub fn loading(&self) -> watch::Receiver<bool> {
        self.inner.loading_tx.subscribe()
    }

    /// Returns the current settings
    pub fn settings(&self) -> Settings {
        self.inner.settings.lock().unwrap().clone()
    }

    /// Changes the source selector
    ///
    /// The first value ever is accepted immediately; after that, rapid
    /// successive edits within the configured window collapse to one restart
    /// using only the final value. Setting the same value again never
    /// triggers a restart and never cancels in-flight work. An accepted
    /// change resets pagination, clears the feed and starts a fresh pipeline
    /// from page one.
    pub fn set_source(&self, source: impl Into<String>) {
        let source = source.into();
        let seq = self.inner.edit_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let immediate = self.inner.source.lock().unwrap().is_none();
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            if !immediate {
                tokio::time::sleep(inner.debounce).await;
            }
            if inner.edit_seq.load(Ordering::SeqCst) != seq {
                // A newer edit superseded this one.
                return;
            }
            {
                let mut current = inner.source.lock().unwrap();
                if current.as_deref() == Some(source.as_str()) {
                    return;
                }
                *current = Some(source.clone());
            }
            tracing::info!("source changed to r/{}", source);
            Inner::restart(inner, source);
        });
    }

    /// Changes the user settings
    ///
    /// Validates and stores the new settings, persists them fire-and-forget,
    /// and restarts the pipeline exactly like a source change if a source is
    /// currently active.
    pub fn set_settings(&self, settings: Settings) -> Result<(), SettingsError> {
        settings.validate()?;
        *self.inner.settings.lock().unwrap() = settings.clone();

        if self.inner.settings_loaded.load(Ordering::SeqCst) {
            if let Err(e) = self.inner.store.lock().unwrap().save(&settings) {
                // Best-effort persistence; the in-memory value already won.
                tracing::warn!("failed to persist settings: {}", e);
            }
        }

        let source = self.inner.source.lock().unwrap().clone();
        if let Some(source) = source {
            Inner::restart(Arc::clone(&self.inner), source);
        }
        Ok(())
    }

    /// Requests the next page of the feed, driven by user scroll
    ///
    /// Installs the cursor and completion handle into pagination state with a
    /// fresh attempt counter, then starts a new fill cycle for one page worth
    /// of clips. The handle fires exactly once, when that cycle stops; it is
    /// abandoned (dropped unsent) if a newer request or a restart supersedes
    /// the cycle first.
    pub fn request_next_page(&self, complete: oneshot::Sender<()>, after: impl Into<String>) {
        let inner = &self.inner;
        let source = inner.source.lock().unwrap().clone();
        let Some(source) = source else {
            // No source accepted yet; nothing to page through.
            drop(complete);
            return;
        };

        let after = after.into();
        let generation = {
            let mut pipeline = inner.pipeline.lock().unwrap();
            // Bump before installing the handle, so a still-running cycle
            // from the previous generation cannot pass its check and fire
            // this request's handle.
            pipeline.generation += 1;
            pipeline.pagination.after = Some(after.clone());
            pipeline.pagination.total_found = 0;
            pipeline.pagination.attempt = 0;
            // Replacing the handle drops a stale one from an earlier request.
            pipeline.pagination.scroll = Some(complete);
            pipeline.generation
        };

        let (sort, quota) = inner.sort_and_quota();
        Inner::spawn_cycle(Arc::clone(inner), generation, source, sort, Some(after), quota);
    }
}

impl Inner {
    fn sort_and_quota(&self) -> (SortMode, u32) {
        let settings = self.settings.lock().unwrap();
        (settings.sort, settings.per_page)
    }

    /// Tears down the previous pipeline instance and starts a new one
    ///
    /// The generation bump and the state reset happen under one lock, so an
    /// old cycle either commits entirely before the reset or not at all.
    fn restart(inner: Arc<Inner>, source: String) {
        let generation = {
            let mut pipeline = inner.pipeline.lock().unwrap();
            pipeline.generation += 1;
            pipeline.pagination.reset();
            pipeline.accumulator.clear();
            pipeline.generation
        };

        let (sort, quota) = inner.sort_and_quota();
        Inner::spawn_cycle(inner, generation, source, sort, None, quota);
    }

    /// Runs one fill cycle as a task bound to a pipeline generation
    fn spawn_cycle(
        inner: Arc<Inner>,
        generation: u64,
        source: String,
        sort: SortMode,
        cursor: Option<String>,
        quota: u32,
    ) {
        tokio::spawn(async move {
            inner.loading_tx.send_replace(true);

            let sink_inner = Arc::clone(&inner);
            let sink = move |batch: Vec<Clip>| {
                let mut pipeline = sink_inner.pipeline.lock().unwrap();
                if pipeline.generation != generation {
                    return false;
                }
                pipeline.accumulator.append(batch);
                true
            };

            let outcome =
                run_fill_cycle(&inner.client, &source, sort, cursor, quota, sink).await;

            if outcome.superseded {
                // The sink already refused a batch: a newer cycle owns the
                // loading flag and the scroll handle now.
                return;
            }

            let scroll = {
                let mut pipeline = inner.pipeline.lock().unwrap();
                if pipeline.generation != generation {
                    // Superseded right after the last emission.
                    return;
                }
                pipeline.pagination.after = outcome.cursor.clone();
                pipeline.pagination.total_found += outcome.appended as u32;
                pipeline.pagination.attempt = outcome.attempts;
                pipeline.pagination.scroll.take()
            };

            if let Some(handle) = scroll {
                let _ = handle.send(());
            }
            inner.loading_tx.send_replace(false);

            tracing::debug!(
                "fill cycle done for r/{}: {} clips in {} attempts{}",
                source,
                outcome.appended,
                outcome.attempts,
                if outcome.exhausted { " (exhausted)" } else { "" }
            );
        });
    }
}
