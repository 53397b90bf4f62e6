//! Output module for persisting chapters and reporting results
//!
//! This module handles:
//! - Resolving where series, chapters, and pages land on disk
//! - Encoding and writing images
//! - Summarizing a finished crawl

mod layout;
pub mod stats;
mod writer;

pub use layout::{sanitize_component, OutputLayout};
pub use stats::{print_report, ChapterFailure, CrawlReport};
pub use writer::OutputWriter;
