//! HTML parser for the series landing page and chapter pages
//!
//! This module handles parsing HTML content to extract:
//! - The series title and the ordered chapter list
//! - Each page's image URL and navigation link
//!
//! Which elements carry that information is site-specific and lives in a
//! [`SiteProfile`] compiled from the `[site]` configuration.

use crate::config::SiteConfig;
use crate::output::sanitize_component;
use crate::MirrorError;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// One chapter of the series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    /// Label shown on the landing page; also the buffer key and file stem
    pub name: String,

    /// First page of the chapter
    pub start_url: Url,

    /// 1-based position on the landing page
    pub position: usize,
}

/// Everything the landing page tells us about the series
#[derive(Debug, Clone)]
pub struct SeriesIndex {
    pub title: String,
    pub chapters: Vec<Chapter>,
}

/// Image and navigation extracted from one chapter page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLinks {
    pub image_url: Option<Url>,
    pub next_link: Option<Url>,
}

/// Decides whether a navigation link continues the current chapter
pub trait PaginationRule: fmt::Debug + Send + Sync {
    /// Returns true if `link` is another content page of the same chapter
    fn continues_chapter(&self, link: &Url) -> bool;
}

/// Content pages end with a fixed path suffix; anything else is the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixRule {
    suffix: String,
}

impl SuffixRule {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }
}

impl PaginationRule for SuffixRule {
    fn continues_chapter(&self, link: &Url) -> bool {
        link.path().ends_with(&self.suffix)
    }
}

/// Compiled selectors and pagination rule for one site
#[derive(Debug, Clone)]
pub struct SiteProfile {
    series_title: Selector,
    chapter_item: Selector,
    chapter_link: Selector,
    chapter_name: Selector,
    page_image: Selector,
    next_link: Selector,
    pagination: Arc<dyn PaginationRule>,
}

impl SiteProfile {
    /// Compiles every selector in the site configuration
    pub fn from_config(config: &SiteConfig) -> Result<Self, MirrorError> {
        Ok(Self {
            series_title: compile(&config.series_title)?,
            chapter_item: compile(&config.chapter_item)?,
            chapter_link: compile(&config.chapter_link)?,
            chapter_name: compile(&config.chapter_name)?,
            page_image: compile(&config.page_image)?,
            next_link: compile(&config.next_link)?,
            pagination: Arc::new(SuffixRule::new(config.content_page_suffix.clone())),
        })
    }

    /// Replaces the pagination rule
    pub fn with_pagination(mut self, rule: Arc<dyn PaginationRule>) -> Self {
        self.pagination = rule;
        self
    }

    /// Returns true if `link` is another page of the current chapter
    pub fn continues_chapter(&self, link: &Url) -> bool {
        self.pagination.continues_chapter(link)
    }
}

fn compile(selector: &str) -> Result<Selector, MirrorError> {
    Selector::parse(selector).map_err(|e| MirrorError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Collects an element's text with surrounding whitespace removed
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Reads an attribute and resolves it against `base`
///
/// Blank attributes count as missing.
fn resolve_attr(element: ElementRef<'_>, attr: &str, base: &Url) -> Option<Result<Url, url::ParseError>> {
    let value = element.value().attr(attr)?.trim();
    if value.is_empty() {
        return None;
    }
    Some(base.join(value))
}

/// Parses the series landing page into a title and ordered chapter list
///
/// # Errors
///
/// A chapter entry without a link, a usable `href`, or a label fails the
/// whole index, as does a chapter name that appears twice.
pub fn parse_landing_page(
    html: &str,
    landing_url: &Url,
    profile: &SiteProfile,
) -> Result<SeriesIndex, MirrorError> {
    let document = Html::parse_document(html);

    let title = document
        .select(&profile.series_title)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| title_from_url(landing_url));

    let chapters = build_chapter_index(&document, landing_url, profile)?;

    Ok(SeriesIndex { title, chapters })
}

/// Extracts the chapter list in document order
pub fn build_chapter_index(
    document: &Html,
    landing_url: &Url,
    profile: &SiteProfile,
) -> Result<Vec<Chapter>, MirrorError> {
    let mut chapters = Vec::new();
    let mut seen = HashSet::new();

    for (i, item) in document.select(&profile.chapter_item).enumerate() {
        let position = i + 1;
        let malformed = |reason: &str| MirrorError::MalformedChapter {
            position,
            reason: reason.to_string(),
        };

        let link = item
            .select(&profile.chapter_link)
            .next()
            .ok_or_else(|| malformed("no chapter link"))?;

        let start_url = match resolve_attr(link, "href", landing_url) {
            Some(Ok(url)) => url,
            Some(Err(e)) => return Err(malformed(&format!("unusable href: {}", e))),
            None => return Err(malformed("link has no href")),
        };

        // Prefer the dedicated label element, fall back to the link text
        let name = link
            .select(&profile.chapter_name)
            .next()
            .map(element_text)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| element_text(link));

        if name.is_empty() {
            return Err(malformed("empty chapter name"));
        }

        // Names become file stems, so two labels that sanitize alike would
        // write to the same output path
        let stem = sanitize_component(&name);
        if !seen.insert(stem.clone()) {
            return Err(MirrorError::DuplicateChapter {
                name,
                stem,
                position,
            });
        }

        chapters.push(Chapter {
            name,
            start_url,
            position,
        });
    }

    Ok(chapters)
}

/// Last non-empty path segment of the landing URL, or its host
fn title_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string)
        .or_else(|| url.host_str().map(str::to_string))
        .unwrap_or_else(|| "series".to_string())
}

/// Extracts the image URL and navigation link from a chapter page
pub fn parse_chapter_page(
    html: &str,
    page_url: &Url,
    profile: &SiteProfile,
) -> Result<PageLinks, MirrorError> {
    let document = Html::parse_document(html);
    let unusable = |what: &str, e: url::ParseError| MirrorError::HtmlParse {
        url: page_url.to_string(),
        message: format!("unusable {}: {}", what, e),
    };

    let image_url = match document
        .select(&profile.page_image)
        .next()
        .and_then(|img| resolve_attr(img, "src", page_url))
    {
        Some(Ok(url)) => Some(url),
        Some(Err(e)) => return Err(unusable("image src", e)),
        None => None,
    };

    let next_link = match document
        .select(&profile.next_link)
        .next()
        .and_then(|link| resolve_attr(link, "href", page_url))
    {
        Some(Ok(url)) => Some(url),
        Some(Err(e)) => return Err(unusable("navigation href", e)),
        None => None,
    };

    Ok(PageLinks {
        image_url,
        next_link,
    })
}
