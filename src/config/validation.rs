use crate::config::types::{Config, CrawlConfig, OutputConfig, RetryConfig, SiteConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawl_config(&config.crawl)?;
    validate_retry_config(&config.retry)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the landing URL and every site selector
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.landing_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid landing-url '{}': {}", config.landing_url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "landing-url '{}' must use http or https",
            config.landing_url
        )));
    }

    if config.require_mobile_host {
        validate_mobile_host(&url)?;
    }

    for (key, selector) in [
        ("series-title", &config.series_title),
        ("chapter-item", &config.chapter_item),
        ("chapter-link", &config.chapter_link),
        ("chapter-name", &config.chapter_name),
        ("page-image", &config.page_image),
        ("next-link", &config.next_link),
    ] {
        validate_selector(key, selector)?;
    }

    if config.content_page_suffix.is_empty() {
        return Err(ConfigError::Validation(
            "content-page-suffix cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// The site only serves the selector layout on its mobile variant
fn validate_mobile_host(url: &Url) -> Result<(), ConfigError> {
    let host = url.host_str().unwrap_or_default();
    if !host.starts_with("m.") {
        return Err(ConfigError::Validation(format!(
            "landing-url host '{}' must be the mobile site (start with 'm.')",
            host
        )));
    }
    Ok(())
}

fn validate_selector(key: &str, selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::InvalidSelector(format!(
            "{} cannot be empty",
            key
        )));
    }

    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {}", key, selector, e)))?;

    Ok(())
}

/// Validates chapter range and scheduling limits
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.begin < 1 {
        return Err(ConfigError::Validation(format!(
            "begin must be >= 1, got {}",
            config.begin
        )));
    }

    if config.end != -1 && config.end < config.begin {
        return Err(ConfigError::Validation(format!(
            "end must be -1 or >= begin ({}), got {}",
            config.begin, config.end
        )));
    }

    if config.max_concurrency < 1 || config.max_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrency must be between 1 and 100, got {}",
            config.max_concurrency
        )));
    }

    if config.max_pages_per_chapter < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages-per-chapter must be >= 1, got {}",
            config.max_pages_per_chapter
        )));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_backoff_ms < config.initial_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "max-backoff-ms ({}) must be >= initial-backoff-ms ({})",
            config.max_backoff_ms, config.initial_backoff_ms
        )));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.download_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "download-path cannot be empty".to_string(),
        ));
    }

    if config.jpeg_quality < 1 || config.jpeg_quality > 100 {
        return Err(ConfigError::Validation(format!(
            "jpeg-quality must be between 1 and 100, got {}",
            config.jpeg_quality
        )));
    }

    Ok(())
}
