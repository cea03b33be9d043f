use tokio::sync::watch;

use crate::listing::Clip;

/// The growing, ordered feed of playable clips
///
/// Batches from the fill engine are appended in arrival order; nothing is
/// merged or de-duplicated against prior entries, and items are only removed
/// by a full restart. Every change is published over a watch channel so the
/// presentation layer can observe the current feed value.
pub struct FeedAccumulator {
    clips: Vec<Clip>,
    tx: watch::Sender<Vec<Clip>>,
}

impl FeedAccumulator {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self {
            clips: Vec::new(),
            tx,
        }
    }

    /// Appends a batch of clips and publishes the new feed value
    ///
    /// Empty batches are ignored - an attempt that produced nothing playable
    /// does not notify observers.
    pub fn append(&mut self, batch: Vec<Clip>) {
        if batch.is_empty() {
            return;
        }
        self.clips.extend(batch);
        self.tx.send_replace(self.clips.clone());
    }

    /// Empties the feed and publishes the empty value
    pub fn clear(&mut self) {
        self.clips.clear();
        self.tx.send_replace(Vec::new());
    }

    /// Returns a receiver observing the current feed value
    pub fn subscribe(&self) -> watch::Receiver<Vec<Clip>> {
        self.tx.subscribe()
    }

    /// Returns a copy of the current feed
    pub fn snapshot(&self) -> Vec<Clip> {
        self.clips.clone()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

impl Default for FeedAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
