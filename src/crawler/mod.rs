//! Crawler module for walking a series and collecting its pages
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the `PageFetcher` seam
//! - Landing page and chapter page parsing
//! - Image download with retry, and routing to buffer or disk
//! - The per-chapter pagination walk
//! - Chapter selection, the concurrency cap, and overall coordination

mod acquirer;
mod coordinator;
mod fetcher;
mod parser;
mod retry;
mod scheduler;
mod walker;

pub use acquirer::{ImageAcquirer, ImageSink, Routed};
pub use coordinator::{run_crawl, Coordinator, CrawlPlan};
pub use fetcher::{build_http_client, FetchError, HttpFetcher, PageFetcher};
pub use parser::{
    build_chapter_index, parse_chapter_page, parse_landing_page, Chapter, PageLinks,
    PaginationRule, SeriesIndex, SiteProfile, SuffixRule,
};
pub use retry::RetryPolicy;
pub use scheduler::{select_chapters, ChapterScheduler, ChapterSlot};
pub use walker::{ChapterOutcome, ChapterWalker, CrawlContext};

use crate::config::Config;
use crate::output::CrawlReport;
use crate::MirrorError;

/// Runs a complete crawl operation
///
/// This is the main entry point for mirroring a series. It will:
/// 1. Fetch the landing page and build the chapter index
/// 2. Select the configured chapter range
/// 3. Walk the selected chapters concurrently
/// 4. Write page images or stitched chapters
/// 5. Return the crawl report
///
/// # Arguments
///
/// * `config` - A validated configuration
pub async fn crawl(config: Config) -> Result<CrawlReport, MirrorError> {
    run_crawl(config).await
}
