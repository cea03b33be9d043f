//! Feed assembly pipeline
//!
//! This module contains the core of the crate:
//! - The page-fill engine: a bounded retry/self-extension loop that keeps
//!   requesting listing pages until the quota of playable clips is met
//! - The accumulator holding the growing visible feed
//! - Pagination state for cursor, attempt counter and scroll handle
//! - The orchestrator that restarts the whole pipeline on source or
//!   settings changes, cancelling superseded work

mod accumulator;
mod engine;
mod orchestrator;
mod pagination;

pub use accumulator::FeedAccumulator;
pub use engine::{run_fill_cycle, CycleOutcome, MAX_ATTEMPTS};
pub use orchestrator::{FeedConfig, FeedOrchestrator};
pub use pagination::Pagination;
