//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl entry point that coordinates:
//! - Fetching and parsing the series landing page
//! - Selecting the requested chapter range
//! - Dispatching one walk task per chapter under the concurrency cap
//! - Settling task results according to the failure policy

use crate::config::{Config, FailurePolicy};
use crate::crawler::fetcher::{HttpFetcher, PageFetcher};
use crate::crawler::parser::{parse_landing_page, Chapter, PaginationRule, SiteProfile};
use crate::crawler::scheduler::{select_chapters, ChapterScheduler};
use crate::crawler::walker::{ChapterOutcome, ChapterWalker, CrawlContext};
use crate::imaging::{ImageCodec, JpegCodec};
use crate::output::{CrawlReport, OutputLayout};
use crate::MirrorError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::{Id, JoinError, JoinSet};
use url::Url;

/// What a crawl would download, as seen from the landing page
#[derive(Debug, Clone)]
pub struct CrawlPlan {
    pub series_title: String,

    /// Chapters listed on the landing page
    pub total_chapters: usize,

    /// Chapters inside the configured range, in landing-page order
    pub selected: Vec<Chapter>,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Arc<dyn PageFetcher>,
    codec: Arc<dyn ImageCodec>,
    profile: SiteProfile,
}

impl Coordinator {
    /// Creates a coordinator using HTTP and the JPEG codec
    pub fn new(config: Config) -> Result<Self, MirrorError> {
        let fetcher = HttpFetcher::from_config(&config.user_agent)?;
        Self::with_collaborators(config, Arc::new(fetcher), Arc::new(JpegCodec))
    }

    /// Creates a coordinator with the given fetcher and codec
    pub fn with_collaborators(
        config: Config,
        fetcher: Arc<dyn PageFetcher>,
        codec: Arc<dyn ImageCodec>,
    ) -> Result<Self, MirrorError> {
        let profile = SiteProfile::from_config(&config.site)?;
        Ok(Self {
            config: Arc::new(config),
            fetcher,
            codec,
            profile,
        })
    }

    /// Replaces the pagination rule derived from the configured suffix
    pub fn with_pagination(mut self, rule: Arc<dyn PaginationRule>) -> Self {
        self.profile = self.profile.with_pagination(rule);
        self
    }

    /// Fetches the landing page and works out which chapters would be walked
    pub async fn plan(&self) -> Result<CrawlPlan, MirrorError> {
        let landing_url = Url::parse(&self.config.site.landing_url)?;
        tracing::info!("Fetching series index: {}", landing_url);

        let html = self.fetcher.fetch_text(landing_url.as_str()).await?;
        let index = parse_landing_page(&html, &landing_url, &self.profile)?;
        let total_chapters = index.chapters.len();

        let selected = select_chapters(
            index.chapters,
            self.config.crawl.begin,
            self.config.crawl.end,
        );

        tracing::info!(
            "Series '{}': {} chapters listed, {} selected",
            index.title,
            total_chapters,
            selected.len()
        );

        Ok(CrawlPlan {
            series_title: index.title,
            total_chapters,
            selected,
        })
    }

    /// Runs the crawl to completion
    ///
    /// Under `FailurePolicy::Isolate` chapter failures are recorded in the
    /// returned report. Under `FailurePolicy::FailFast` the first failure
    /// aborts every in-flight walk and is returned as `ChapterFailed`.
    pub async fn run(&self) -> Result<CrawlReport, MirrorError> {
        let plan = self.plan().await?;
        let mut report = CrawlReport::new(plan.series_title.clone(), plan.selected.len());

        if plan.selected.is_empty() {
            tracing::warn!("No chapters in range, nothing to do");
            report.finish();
            return Ok(report);
        }

        let layout = OutputLayout::new(
            &self.config.output.download_path,
            &plan.series_title,
            self.codec.extension(),
        );
        let ctx = Arc::new(CrawlContext::new(
            &self.config,
            Arc::clone(&self.fetcher),
            Arc::clone(&self.codec),
            self.profile.clone(),
            layout,
        ));

        let scheduler = ChapterScheduler::new(self.config.crawl.max_concurrency);
        tracing::info!(
            "Dispatching {} chapters, up to {} at a time",
            plan.selected.len(),
            scheduler.limit()
        );
        let policy = self.config.crawl.failure_policy;
        let mut tasks: JoinSet<Result<ChapterOutcome, MirrorError>> = JoinSet::new();
        let mut dispatched: HashMap<Id, Chapter> = HashMap::new();

        let mut pending = plan.selected.into_iter();
        let mut next = pending.next();

        // Finished walks are settled before the next dispatch, so fail-fast
        // stops before any further chapter starts
        while let Some(chapter) = next.take() {
            tokio::select! {
                biased;

                joined = tasks.join_next_with_id(), if !tasks.is_empty() => {
                    if let Some(joined) = joined {
                        if let Err(e) = settle(joined, &mut dispatched, &mut report, policy, &mut tasks) {
                            drain_aborted(&mut tasks).await;
                            return Err(e);
                        }
                    }
                    next = Some(chapter);
                }
                slot = scheduler.acquire() => {
                    let slot = slot?;
                    let walker = ChapterWalker::new(Arc::clone(&ctx));
                    let task_chapter = chapter.clone();

                    let handle = tasks.spawn(async move {
                        let _slot = slot;
                        walker.walk(&task_chapter).await
                    });
                    tracing::debug!(
                        "Dispatched chapter #{} {} ({} active)",
                        chapter.position,
                        chapter.name,
                        scheduler.active()
                    );
                    dispatched.insert(handle.id(), chapter);
                    next = pending.next();
                }
            }
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            if let Err(e) = settle(joined, &mut dispatched, &mut report, policy, &mut tasks) {
                drain_aborted(&mut tasks).await;
                return Err(e);
            }
        }

        report.peak_concurrency = scheduler.peak_active();
        report.finish();

        tracing::info!(
            "Crawl finished: {} completed, {} failed",
            report.completed.len(),
            report.failed.len()
        );

        Ok(report)
    }
}

/// Records one finished walk, or aborts the crawl under fail-fast
fn settle(
    joined: Result<(Id, Result<ChapterOutcome, MirrorError>), JoinError>,
    dispatched: &mut HashMap<Id, Chapter>,
    report: &mut CrawlReport,
    policy: FailurePolicy,
    tasks: &mut JoinSet<Result<ChapterOutcome, MirrorError>>,
) -> Result<(), MirrorError> {
    let (id, result) = match joined {
        Ok((id, result)) => (id, result),
        Err(join_error) => (
            join_error.id(),
            Err(MirrorError::TaskFailed(join_error.to_string())),
        ),
    };

    let Some(chapter) = dispatched.remove(&id) else {
        tracing::error!("Finished task {} has no chapter on record", id);
        return Err(MirrorError::TaskFailed(format!("unknown task {}", id)));
    };

    match result {
        Ok(outcome) => {
            report.record_success(outcome);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Chapter #{} {} failed: {}", chapter.position, chapter.name, e);

            match policy {
                FailurePolicy::Isolate => {
                    report.record_failure(chapter.name, chapter.position, e.to_string());
                    Ok(())
                }
                FailurePolicy::FailFast => {
                    tasks.abort_all();
                    Err(MirrorError::ChapterFailed {
                        chapter: chapter.name,
                        source: Box::new(e),
                    })
                }
            }
        }
    }
}

/// Waits for every aborted walk to unwind
///
/// Each walk's buffer guard and chapter slot are released before the crawl
/// error is returned.
async fn drain_aborted(tasks: &mut JoinSet<Result<ChapterOutcome, MirrorError>>) {
    let mut unwound = 0usize;
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            if !e.is_cancelled() {
                tracing::warn!("Walk failed while aborting: {}", e);
            }
        }
        unwound += 1;
    }
    if unwound > 0 {
        tracing::debug!("Unwound {} in-flight chapters after abort", unwound);
    }
}

/// Runs a complete crawl with the default HTTP fetcher and JPEG codec
pub async fn run_crawl(config: Config) -> Result<CrawlReport, MirrorError> {
    Coordinator::new(config)?.run().await
}
