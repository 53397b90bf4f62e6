//! Chapter walker - one chapter's page-by-page traversal
//!
//! The walk is an explicit loop over [`WalkState`]: fetch the page, extract
//! its image and navigation link, then either advance to the next page or
//! finish. Pages within a chapter are strictly sequential because each URL is
//! only known after the previous page has been parsed.

use crate::config::Config;
use crate::crawler::acquirer::{ImageAcquirer, ImageSink, Routed};
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::{parse_chapter_page, Chapter, SiteProfile};
use crate::crawler::retry::RetryPolicy;
use crate::imaging::{canvas_size, merge_vertical, ChapterImageBuffer, ImageCodec};
use crate::output::{OutputLayout, OutputWriter};
use crate::state::{EndReason, WalkState};
use crate::MirrorError;
use image::DynamicImage;
use std::sync::Arc;

/// Result of one completed chapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterOutcome {
    pub name: String,
    pub position: usize,

    /// Pages visited, including pages without an image
    pub pages: u32,

    /// Images downloaded
    pub images: u32,

    /// Files written to disk for this chapter
    pub files_written: u64,

    pub end_reason: EndReason,
}

/// Everything a chapter walk needs, shared by all walks of a crawl
pub struct CrawlContext {
    pub fetcher: Arc<dyn PageFetcher>,
    pub profile: SiteProfile,
    pub acquirer: ImageAcquirer,
    pub buffer: Arc<ChapterImageBuffer>,
    pub writer: OutputWriter,
    pub layout: OutputLayout,
    pub merge_images: bool,
    pub max_pages_per_chapter: u32,
}

impl CrawlContext {
    /// Wires the collaborators for one series according to `config`
    pub fn new(
        config: &Config,
        fetcher: Arc<dyn PageFetcher>,
        codec: Arc<dyn ImageCodec>,
        profile: SiteProfile,
        layout: OutputLayout,
    ) -> Self {
        let buffer = Arc::new(ChapterImageBuffer::new());
        let writer = OutputWriter::new(Arc::clone(&codec), config.output.jpeg_quality);

        let sink = if config.crawl.merge_images {
            ImageSink::Buffer(Arc::clone(&buffer))
        } else {
            ImageSink::Files {
                writer: writer.clone(),
                layout: layout.clone(),
            }
        };

        let acquirer = ImageAcquirer::new(
            Arc::clone(&fetcher),
            codec,
            RetryPolicy::from_config(&config.retry),
            sink,
        );

        Self {
            fetcher,
            profile,
            acquirer,
            buffer,
            writer,
            layout,
            merge_images: config.crawl.merge_images,
            max_pages_per_chapter: config.crawl.max_pages_per_chapter,
        }
    }
}

/// Releases a chapter's buffered pages when the walk ends, however it ends
///
/// After a successful merge the entry is already drained and this is a no-op;
/// on error or task abort it frees the pages collected so far.
struct BufferRelease<'a> {
    buffer: &'a ChapterImageBuffer,
    chapter: &'a str,
}

impl Drop for BufferRelease<'_> {
    fn drop(&mut self) {
        let released = self.buffer.discard(self.chapter);
        if released > 0 {
            tracing::debug!(
                "Released {} buffered pages of unfinished chapter {}",
                released,
                self.chapter
            );
        }
    }
}

/// Drives one chapter from its first page to `Done`
pub struct ChapterWalker {
    ctx: Arc<CrawlContext>,
}

impl ChapterWalker {
    pub fn new(ctx: Arc<CrawlContext>) -> Self {
        Self { ctx }
    }

    /// Walks every page of `chapter` and persists the result
    pub async fn walk(&self, chapter: &Chapter) -> Result<ChapterOutcome, MirrorError> {
        let _release = BufferRelease {
            buffer: &self.ctx.buffer,
            chapter: &chapter.name,
        };

        tracing::info!("Get chapter: {} {}", chapter.name, chapter.start_url);

        let mut outcome = self.walk_pages(chapter).await?;

        if self.ctx.merge_images {
            outcome.files_written += self.finish_merge(chapter).await?;
        }

        tracing::info!(
            "Chapter {} complete: {} pages, {} images",
            chapter.name,
            outcome.pages,
            outcome.images
        );

        Ok(outcome)
    }

    /// The pagination loop; returns once the walk reaches `Done`
    async fn walk_pages(&self, chapter: &Chapter) -> Result<ChapterOutcome, MirrorError> {
        let ctx = &self.ctx;
        let mut state = WalkState::Fetching;
        let mut current = chapter.start_url.clone();
        let mut index: u32 = 1;
        let mut images: u32 = 0;
        let mut files_written: u64 = 0;

        let end_reason = loop {
            tracing::debug!("Chapter {} page {}: {}", chapter.name, index, current);
            let html = ctx.fetcher.fetch_text(current.as_str()).await?;
            state = transition(state, WalkState::Extracting)?;

            let links = parse_chapter_page(&html, &current, &ctx.profile)?;

            if let Some(image_url) = &links.image_url {
                let file_name = ctx.layout.page_file_name(&chapter.name, index);
                let routed = ctx
                    .acquirer
                    .acquire(image_url, &file_name, &chapter.name)
                    .await?;
                images += 1;
                if let Routed::Written(_) = routed {
                    files_written += 1;
                }
            } else {
                tracing::debug!("Chapter {} page {} has no image", chapter.name, index);
            }

            let Some(next) = links.next_link else {
                tracing::warn!(
                    "Chapter {} page {} has no navigation link, ending chapter",
                    chapter.name,
                    index
                );
                transition(state, WalkState::Done)?;
                break EndReason::NoNavigation;
            };

            state = transition(state, WalkState::Advancing)?;

            if !ctx.profile.continues_chapter(&next) {
                transition(state, WalkState::Done)?;
                break EndReason::IndexLink;
            }

            if next == current {
                return Err(MirrorError::PaginationLoop {
                    chapter: chapter.name.clone(),
                    url: current.to_string(),
                });
            }

            if index >= ctx.max_pages_per_chapter {
                return Err(MirrorError::PageLimitExceeded {
                    chapter: chapter.name.clone(),
                    limit: ctx.max_pages_per_chapter,
                });
            }

            index += 1;
            current = next;
            state = transition(state, WalkState::Fetching)?;
        };

        Ok(ChapterOutcome {
            name: chapter.name.clone(),
            position: chapter.position,
            pages: index,
            images,
            files_written,
            end_reason,
        })
    }

    /// Drains the chapter's pages, stitches them, and writes the result
    ///
    /// Returns the number of files written (0 when nothing was buffered).
    async fn finish_merge(&self, chapter: &Chapter) -> Result<u64, MirrorError> {
        let Some(pages) = self.ctx.buffer.drain(&chapter.name) else {
            tracing::warn!("Chapter {} produced no images, nothing to merge", chapter.name);
            return Ok(0);
        };

        let path = self.ctx.layout.merged_chapter_path(&chapter.name);
        let max_side = self.ctx.writer.max_dimension();
        let (width, height) = canvas_size(&pages, max_side)?;
        tracing::debug!(
            "Merging {} pages of {} into {}x{} ({} chapters still buffered)",
            pages.len(),
            chapter.name,
            width,
            height,
            self.ctx.buffer.chapters_in_flight()
        );

        // The page bitmaps are dropped on the blocking thread as soon as the
        // canvas is built.
        let merged = tokio::task::spawn_blocking(move || merge_vertical(&pages, max_side))
            .await
            .map_err(|e| MirrorError::TaskFailed(e.to_string()))??;

        self.ctx
            .writer
            .write_owned(DynamicImage::ImageRgb8(merged), path.clone())
            .await?;

        tracing::info!("Wrote {}", path.display());
        Ok(1)
    }
}

/// Checks and performs one state machine step
fn transition(from: WalkState, to: WalkState) -> Result<WalkState, MirrorError> {
    if !from.can_transition_to(to) {
        return Err(MirrorError::InvalidTransition { from, to });
    }
    tracing::trace!("walk {} -> {}", from, to);
    Ok(to)
}
