//! In-memory [`PageHandle`] that plays back recorded snapshots.
//!
//! Each scroll step advances to the next recorded frame and stays on the last
//! one once the recording runs out. Used for offline replays of captured
//! sessions and for exercising the collector without a browser.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::dom::{DomSnapshot, IdleOutcome, PageHandle};
use crate::types::SweepResult;

pub struct ScriptedPage {
    frames: Vec<DomSnapshot>,
    position: AtomicUsize,
    snapshots_taken: AtomicUsize,
    scrolls: AtomicUsize,
    idle: IdleOutcome,
}

impl ScriptedPage {
    pub fn new(frames: Vec<DomSnapshot>) -> Self {
        Self {
            frames,
            position: AtomicUsize::new(0),
            snapshots_taken: AtomicUsize::new(0),
            scrolls: AtomicUsize::new(0),
            idle: IdleOutcome::Settled,
        }
    }

    /// Make `wait_for_network_idle` report this outcome.
    pub fn with_idle_outcome(mut self, idle: IdleOutcome) -> Self {
        self.idle = idle;
        self
    }

    /// Index of the frame the next snapshot will return.
    pub fn position(&self) -> usize {
        self.position.load(Ordering::Relaxed)
    }

    pub fn snapshots_taken(&self) -> usize {
        self.snapshots_taken.load(Ordering::Relaxed)
    }

    /// Downward scroll steps performed so far.
    pub fn scrolls(&self) -> usize {
        self.scrolls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PageHandle for ScriptedPage {
    async fn snapshot(&self) -> SweepResult<DomSnapshot> {
        self.snapshots_taken.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .frames
            .get(self.position())
            .cloned()
            .unwrap_or_default())
    }

    async fn scroll_by_viewport(&self, _fraction: f64) -> SweepResult<()> {
        self.scrolls.fetch_add(1, Ordering::Relaxed);
        let last = self.frames.len().saturating_sub(1);
        let next = (self.position() + 1).min(last);
        self.position.store(next, Ordering::Relaxed);
        Ok(())
    }

    async fn scroll_to_top(&self) -> SweepResult<()> {
        self.position.store(0, Ordering::Relaxed);
        Ok(())
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> SweepResult<IdleOutcome> {
        Ok(self.idle)
    }
}
