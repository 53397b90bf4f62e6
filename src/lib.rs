//! Panel-Mirror: a local mirror for paginated web comics
//!
//! This crate walks a comic series chapter by chapter, downloads every page
//! image, and either stores the pages individually or stitches each chapter
//! into one tall image.

pub mod config;
pub mod crawler;
pub mod imaging;
pub mod output;
pub mod state;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Panel-Mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Gave up on {url} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("HTML parse error for {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Malformed chapter entry #{position}: {reason}")]
    MalformedChapter { position: usize, reason: String },

    #[error("Chapter '{name}' at #{position} would be saved as '{stem}', already used by an earlier chapter")]
    DuplicateChapter {
        name: String,
        stem: String,
        position: usize,
    },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Failed to decode image from {url}: {source}")]
    Decode {
        url: String,
        source: image::ImageError,
    },

    #[error("Failed to encode image for {path}: {source}")]
    Encode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Image assembly failed: {0}")]
    Assemble(#[from] imaging::AssembleError),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Chapter '{chapter}' links page {url} to itself")]
    PaginationLoop { chapter: String, url: String },

    #[error("Chapter '{chapter}' exceeded {limit} pages")]
    PageLimitExceeded { chapter: String, limit: u32 },

    #[error("Invalid walk transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::WalkState,
        to: state::WalkState,
    },

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error("Chapter '{chapter}' failed: {source}")]
    ChapterFailed {
        chapter: String,
        source: Box<MirrorError>,
    },

    #[error("{failed} of {total} chapters failed")]
    Incomplete { failed: usize, total: usize },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector in config: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Panel-Mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, Chapter};
pub use output::CrawlReport;
pub use state::WalkState;
