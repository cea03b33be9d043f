//! Page-fill engine
//!
//! One page-fill cycle issues one-or-more sequential listing fetches until the
//! quota of playable clips is met, the upstream is exhausted, or the attempt
//! budget runs out. Each attempt's valid clips are handed downstream
//! immediately, so the feed shows partial progress without waiting for the
//! whole retry chain. Failures never surface: a bad round is an empty page,
//! and an unresolved shortfall simply yields a short feed.

use crate::listing::{Clip, ListingClient};
use crate::settings::SortMode;

/// Maximum number of listing fetches within one page-fill cycle
pub const MAX_ATTEMPTS: u32 = 10;

/// Result of one completed (or abandoned) page-fill cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Playable clips handed to the sink over the whole cycle
    pub appended: usize,

    /// Listing fetches issued
    pub attempts: u32,

    /// Cursor of the last item seen, for the next page request
    pub cursor: Option<String>,

    /// The upstream returned a page with zero items
    pub exhausted: bool,

    /// The sink reported the cycle superseded; no signals were emitted
    pub superseded: bool,
}

/// Runs one page-fill cycle
///
/// Attempts are strictly sequential: attempt `i + 1` is only issued after
/// attempt `i`'s response (or failure) has been observed, so the pagination
/// cursor always advances in order.
///
/// # Arguments
///
/// * `client` - The listing client
/// * `source` - The source selector
/// * `sort` - Listing sort order
/// * `cursor` - Starting pagination cursor (`None` for page one)
/// * `quota` - Number of playable clips this cycle aims to collect
/// * `sink` - Receives each attempt's valid clips, capped at that attempt's
///   required amount; returns `false` once the cycle has been superseded,
///   which abandons the cycle immediately
pub async fn run_fill_cycle<S>(
    client: &ListingClient,
    source: &str,
    sort: SortMode,
    cursor: Option<String>,
    quota: u32,
    mut sink: S,
) -> CycleOutcome
where
    S: FnMut(Vec<Clip>) -> bool,
{
    let mut cursor = cursor;
    let mut required = quota;
    let mut attempts = 0u32;
    let mut appended = 0usize;

    loop {
        let page = client
            .fetch_page(source, sort, cursor.as_deref(), required)
            .await;
        attempts += 1;

        let got_any = !page.clips.is_empty();
        let last_seen = page.clips.last().map(|clip| clip.name.clone());

        let valid = take_valid(page.clips, page.required);
        let shortfall = page.required - valid.len() as u32;
        appended += valid.len();

        if !sink(valid) {
            tracing::debug!("fill cycle for r/{} superseded, abandoning", source);
            return CycleOutcome {
                appended,
                attempts,
                cursor,
                exhausted: false,
                superseded: true,
            };
        }

        if got_any {
            cursor = last_seen;
        }

        if !should_keep_trying(shortfall, got_any, attempts) {
            if !got_any {
                tracing::debug!("r/{} exhausted after {} attempts", source, attempts);
            }
            return CycleOutcome {
                appended,
                attempts,
                cursor,
                exhausted: !got_any,
                superseded: false,
            };
        }

        tracing::trace!(
            "r/{}: {} more clips needed, attempt {} of {}",
            source,
            shortfall,
            attempts + 1,
            MAX_ATTEMPTS
        );
        required = shortfall;
    }
}

/// Filters a page down to playable clips, capped at the required amount
fn take_valid(clips: Vec<Clip>, required: u32) -> Vec<Clip> {
    let mut valid: Vec<Clip> = clips.into_iter().filter(|clip| clip.src.is_some()).collect();
    valid.truncate(required as usize);
    valid
}

/// The continue condition of the retry state machine
///
/// Keep trying only while more clips are needed, the upstream still returned
/// at least one item, and the attempt budget is not spent.
fn should_keep_trying(shortfall: u32, got_any: bool, attempts: u32) -> bool {
    shortfall > 0 && got_any && attempts < MAX_ATTEMPTS
}
