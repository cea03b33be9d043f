use tokio::sync::oneshot;

/// Pagination state for the current source
///
/// Owned exclusively by the orchestrator. Reset to the default value on every
/// source or settings change; the cursor and scroll handle are replaced on
/// every manual next-page request.
#[derive(Debug, Default)]
pub struct Pagination {
    /// Cursor of the last-seen item, used to request the next page
    pub after: Option<String>,

    /// Number of playable clips appended by fill cycles so far
    pub total_found: u32,

    /// Attempt count of the most recent fill cycle
    pub attempt: u32,

    /// Completion handle for a pending scroll-triggered load
    ///
    /// Replaced wholesale by a newer request or a restart; dropping a stale
    /// handle is what abandons the superseded scroll signal.
    pub scroll: Option<oneshot::Sender<()>>,
}

impl Pagination {
    /// Resets everything to the initial state, dropping any pending handle
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
