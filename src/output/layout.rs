//! On-disk layout for downloaded chapters
//!
//! ```text
//! <download>/<series>/<chapter>.jpg                     merge mode
//! <download>/<series>/<chapter>/<chapter>-<page>.jpg    page mode
//! ```

use std::path::{Path, PathBuf};

/// Characters that are path separators or reserved on common filesystems
const RESERVED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Makes a chapter or series name safe to use as a single path component
pub fn sanitize_component(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if RESERVED.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim().trim_end_matches('.').trim_end();

    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Resolves output paths for one series
#[derive(Debug, Clone)]
pub struct OutputLayout {
    series_dir: PathBuf,
    extension: &'static str,
}

impl OutputLayout {
    /// Creates a layout rooted at `<download_root>/<series_title>`
    pub fn new(download_root: impl AsRef<Path>, series_title: &str, extension: &'static str) -> Self {
        Self {
            series_dir: download_root.as_ref().join(sanitize_component(series_title)),
            extension,
        }
    }

    /// Directory holding everything for the series
    pub fn series_dir(&self) -> &Path {
        &self.series_dir
    }

    /// Destination of a stitched chapter
    pub fn merged_chapter_path(&self, chapter: &str) -> PathBuf {
        self.series_dir
            .join(format!("{}.{}", sanitize_component(chapter), self.extension))
    }

    /// File name of one page, `<chapter>-<index>.<ext>`
    pub fn page_file_name(&self, chapter: &str, index: u32) -> String {
        format!("{}-{}.{}", sanitize_component(chapter), index, self.extension)
    }

    /// Destination of one page inside the chapter's own folder
    pub fn page_path(&self, chapter: &str, file_name: &str) -> PathBuf {
        self.series_dir
            .join(sanitize_component(chapter))
            .join(sanitize_component(file_name))
    }
}
