//! Crawl summary reporting
//!
//! This module collects per-chapter outcomes while the coordinator runs and
//! renders the final summary shown to the operator.

use crate::crawler::ChapterOutcome;
use chrono::{DateTime, Utc};

/// A chapter that did not complete
#[derive(Debug, Clone)]
pub struct ChapterFailure {
    /// Chapter name
    pub name: String,

    /// 1-based position on the landing page
    pub position: usize,

    /// Rendered error
    pub error: String,
}

/// Aggregate result of one crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Series title taken from the landing page
    pub series_title: String,

    /// Number of chapters that fell inside the requested range
    pub chapters_selected: usize,

    /// Chapters that finished, in completion order
    pub completed: Vec<ChapterOutcome>,

    /// Chapters that failed, in completion order
    pub failed: Vec<ChapterFailure>,

    /// Most chapters walked at the same time
    pub peak_concurrency: usize,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl CrawlReport {
    /// Starts a report for a crawl about to dispatch `chapters_selected` chapters
    pub fn new(series_title: impl Into<String>, chapters_selected: usize) -> Self {
        Self {
            series_title: series_title.into(),
            chapters_selected,
            completed: Vec::new(),
            failed: Vec::new(),
            peak_concurrency: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record_success(&mut self, outcome: ChapterOutcome) {
        self.completed.push(outcome);
    }

    pub fn record_failure(&mut self, name: impl Into<String>, position: usize, error: String) {
        self.failed.push(ChapterFailure {
            name: name.into(),
            position,
            error,
        });
    }

    /// Stamps the finish time
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Returns true if every selected chapter completed
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.completed.len() == self.chapters_selected
    }

    /// Pages visited across completed chapters
    pub fn total_pages(&self) -> u64 {
        self.completed.iter().map(|c| u64::from(c.pages)).sum()
    }

    /// Files written across completed chapters
    pub fn total_files(&self) -> u64 {
        self.completed.iter().map(|c| c.files_written).sum()
    }

    /// Wall-clock duration, once finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}

/// Prints the report to stdout in a formatted manner
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Summary: {} ===\n", report.series_title);

    println!("Overview:");
    println!("  Chapters selected: {}", report.chapters_selected);
    println!("  Chapters completed: {}", report.completed.len());
    println!("  Chapters failed: {}", report.failed.len());
    println!("  Pages visited: {}", report.total_pages());
    println!("  Files written: {}", report.total_files());
    println!("  Peak concurrent chapters: {}", report.peak_concurrency);
    if let Some(seconds) = report.duration_seconds() {
        println!("  Elapsed: {}s", seconds);
    }
    println!();

    if !report.failed.is_empty() {
        println!("Failed Chapters:");
        let mut failed: Vec<_> = report.failed.iter().collect();
        failed.sort_by_key(|f| f.position);
        for failure in failed {
            println!("  #{} {}: {}", failure.position, failure.name, failure.error);
        }
        println!();
    }

    let completion_rate = if report.chapters_selected > 0 {
        (report.completed.len() as f64 / report.chapters_selected as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Completion: {:.1}% ({} / {} chapters)",
        completion_rate,
        report.completed.len(),
        report.chapters_selected
    );
}
