//! Shared per-chapter image accumulation
//!
//! This is the only state shared between concurrently running chapter walks.
//! Every operation takes the lock for exactly one map access; the lock is
//! never held across an `.await`.

use image::DynamicImage;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Chapter name to the decoded pages collected so far, in page order
#[derive(Debug, Default)]
pub struct ChapterImageBuffer {
    entries: Mutex<HashMap<String, Vec<DynamicImage>>>,
}

impl ChapterImageBuffer {
    /// Creates an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    // A panic elsewhere cannot leave a half-applied map operation behind,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<DynamicImage>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a page to the chapter's sequence, creating it if absent
    ///
    /// Returns the number of pages now buffered for the chapter.
    pub fn append(&self, chapter: &str, image: DynamicImage) -> usize {
        let mut entries = self.lock();
        let pages = entries.entry(chapter.to_string()).or_default();
        pages.push(image);
        pages.len()
    }

    /// Removes the chapter's entry and hands its pages to the caller
    ///
    /// Returns `None` if nothing was ever buffered for the chapter.
    pub fn drain(&self, chapter: &str) -> Option<Vec<DynamicImage>> {
        self.lock().remove(chapter)
    }

    /// Drops whatever was buffered for a chapter that will not be merged
    ///
    /// Returns the number of pages released.
    pub fn discard(&self, chapter: &str) -> usize {
        let removed = self.lock().remove(chapter);
        removed.map(|pages| pages.len()).unwrap_or(0)
    }

    /// Number of chapters holding an entry
    pub fn chapters_in_flight(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no chapter holds an entry
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
