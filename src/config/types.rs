use serde::Deserialize;

/// Main configuration structure for Panel-Mirror
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub output: OutputConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
}

/// Target site and the markup conventions used to walk it
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Series landing page listing every chapter
    #[serde(rename = "landing-url")]
    pub landing_url: String,

    /// Require the landing host to be the mobile variant (`m.` prefix)
    #[serde(rename = "require-mobile-host", default = "default_true")]
    pub require_mobile_host: bool,

    /// Selector for the series title on the landing page
    #[serde(rename = "series-title", default = "default_series_title")]
    pub series_title: String,

    /// Selector matching one element per chapter on the landing page
    #[serde(rename = "chapter-item", default = "default_chapter_item")]
    pub chapter_item: String,

    /// Selector for the chapter link, relative to a chapter item
    #[serde(rename = "chapter-link", default = "default_chapter_link")]
    pub chapter_link: String,

    /// Selector for the chapter label, relative to the chapter link
    #[serde(rename = "chapter-name", default = "default_chapter_name")]
    pub chapter_name: String,

    /// Selector for the page image (its `src` is downloaded)
    #[serde(rename = "page-image", default = "default_page_image")]
    pub page_image: String,

    /// Selector for the navigation link (its `href` is followed)
    #[serde(rename = "next-link", default = "default_next_link")]
    pub next_link: String,

    /// Path suffix marking a link as another page of the same chapter
    #[serde(rename = "content-page-suffix", default = "default_content_page_suffix")]
    pub content_page_suffix: String,
}

/// Crawl selection and scheduling
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// First chapter to download (1-based, inclusive)
    #[serde(default = "default_begin")]
    pub begin: i64,

    /// Last chapter to download (1-based, inclusive, -1 for the last one)
    #[serde(default = "default_end")]
    pub end: i64,

    /// Maximum number of chapters walked at the same time
    #[serde(rename = "max-concurrency", default = "default_max_concurrency")]
    pub max_concurrency: u32,

    /// Stitch each chapter into one vertical image
    #[serde(rename = "merge-images", default = "default_true")]
    pub merge_images: bool,

    /// What a failing chapter does to the rest of the crawl
    #[serde(rename = "failure-policy", default)]
    pub failure_policy: FailurePolicy,

    /// Upper bound on pages followed within one chapter
    #[serde(rename = "max-pages-per-chapter", default = "default_max_pages")]
    pub max_pages_per_chapter: u32,
}

/// How chapter failures are handled by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Record the failure and keep walking the other chapters
    #[default]
    Isolate,
    /// Abort every in-flight chapter on the first failure
    FailFast,
}

/// Retry behavior for image downloads that fail at the network level
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per image, 0 for unlimited
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds)
    #[serde(rename = "initial-backoff-ms", default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Ceiling for the doubling backoff (milliseconds)
    #[serde(rename = "max-backoff-ms", default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory; the series gets its own folder underneath
    #[serde(rename = "download-path")]
    pub download_path: String,

    /// JPEG quality for written images (1-100)
    #[serde(rename = "jpeg-quality", default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

/// User agent identification
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,

    #[serde(default = "default_agent_version")]
    pub version: String,
}

impl SiteConfig {
    /// Site settings with the default selectors for the given landing page
    pub fn with_landing_url(landing_url: impl Into<String>) -> Self {
        Self {
            landing_url: landing_url.into(),
            require_mobile_host: true,
            series_title: default_series_title(),
            chapter_item: default_chapter_item(),
            chapter_link: default_chapter_link(),
            chapter_name: default_chapter_name(),
            page_image: default_page_image(),
            next_link: default_next_link(),
            content_page_suffix: default_content_page_suffix(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            begin: default_begin(),
            end: default_end(),
            max_concurrency: default_max_concurrency(),
            merge_images: true,
            failure_policy: FailurePolicy::default(),
            max_pages_per_chapter: default_max_pages(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            version: default_agent_version(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_series_title() -> String {
    "div.view-sub h1.title".to_string()
}

fn default_chapter_item() -> String {
    "ul.Drama > li".to_string()
}

fn default_chapter_link() -> String {
    "a".to_string()
}

fn default_chapter_name() -> String {
    "span".to_string()
}

fn default_page_image() -> String {
    "div.UnderPage > :nth-child(3) mip-link > mip-img".to_string()
}

fn default_next_link() -> String {
    "div.action-list > ul > :nth-child(3) mip-link".to_string()
}

fn default_content_page_suffix() -> String {
    "html".to_string()
}

fn default_begin() -> i64 {
    1
}

fn default_end() -> i64 {
    -1
}

fn default_max_concurrency() -> u32 {
    8
}

fn default_max_pages() -> u32 {
    2000
}

fn default_max_attempts() -> u32 {
    8
}

fn default_initial_backoff() -> u64 {
    250
}

fn default_max_backoff() -> u64 {
    8000
}

fn default_jpeg_quality() -> u8 {
    80
}

fn default_agent_name() -> String {
    "panel-mirror".to_string()
}

fn default_agent_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
