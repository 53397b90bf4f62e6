//! Chapter selection and concurrency limiting
//!
//! This module handles:
//! - Narrowing the chapter index to the configured `[begin, end]` range
//! - Capping how many chapters are walked at once via a semaphore
//! - Tracking active and peak chapter counts for reporting

use crate::crawler::parser::Chapter;
use crate::MirrorError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Keeps the chapters whose 1-based position lies in `[begin, end]`
///
/// `end == -1` means "through the last chapter". Positions beyond the index
/// are ignored, so an oversized `end` behaves like `-1`.
pub fn select_chapters(chapters: Vec<Chapter>, begin: i64, end: i64) -> Vec<Chapter> {
    chapters
        .into_iter()
        .enumerate()
        .filter(|(i, _)| {
            let position = *i as i64 + 1;
            position >= begin && (end == -1 || position <= end)
        })
        .map(|(_, chapter)| chapter)
        .collect()
}

/// A held chapter slot; releasing it lets the next chapter start
pub struct ChapterSlot {
    _permit: OwnedSemaphorePermit,
    active: Arc<AtomicUsize>,
}

impl Drop for ChapterSlot {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Bounds the number of chapters walked concurrently
///
/// Shares its counters with every [`ChapterSlot`] it hands out, so slots may
/// outlive the scheduler reference that created them.
#[derive(Debug, Clone)]
pub struct ChapterScheduler {
    semaphore: Arc<Semaphore>,
    limit: usize,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ChapterScheduler {
    /// Creates a scheduler admitting at most `max_concurrency` chapters
    pub fn new(max_concurrency: u32) -> Self {
        let limit = max_concurrency.max(1) as usize;
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Waits for a free slot
    pub async fn acquire(&self) -> Result<ChapterSlot, MirrorError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|e| MirrorError::TaskFailed(format!("chapter scheduler closed: {}", e)))?;

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_active, Ordering::SeqCst);

        Ok(ChapterSlot {
            _permit: permit,
            active: Arc::clone(&self.active),
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Chapters currently holding a slot
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously held slots so far
    pub fn peak_active(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}
