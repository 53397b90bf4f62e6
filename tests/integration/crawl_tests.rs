//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small comic series and run the full
//! crawl cycle end-to-end against it.

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use panel_mirror::config::{
    load_config, Config, CrawlConfig, FailurePolicy, OutputConfig, RetryConfig, SiteConfig,
    UserAgentConfig,
};
use panel_mirror::crawler::Coordinator;
use panel_mirror::imaging::{ImageCodec, JpegCodec};
use panel_mirror::MirrorError;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INDEX_PATH: &str = "/manhua/demo/";

/// One chapter of the mock series: a name and the height of each page image
struct MockChapter {
    name: &'static str,
    heights: Vec<u32>,
}

fn chapter(name: &'static str, heights: &[u32]) -> MockChapter {
    MockChapter {
        name,
        heights: heights.to_vec(),
    }
}

fn page_path(chapter: usize, page: usize) -> String {
    if page == 1 {
        format!("{}{}.html", INDEX_PATH, chapter)
    } else {
        format!("{}{}_{}.html", INDEX_PATH, chapter, page)
    }
}

fn image_path(chapter: usize, page: usize) -> String {
    format!("/img/{}-{}.jpg", chapter, page)
}

fn jpeg(height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, height, Rgb([90, 120, 150])));
    JpegCodec.encode(&image, 90).unwrap()
}

fn landing_html(chapters: &[MockChapter]) -> String {
    let items: String = chapters
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                r#"<li><a href="{}"><span>{}</span></a></li>"#,
                page_path(i + 1, 1),
                c.name
            )
        })
        .collect();
    format!(
        r#"<html><body>
        <div class="view-sub"><h1 class="title">Demo</h1></div>
        <ul class="Drama">{}</ul>
        </body></html>"#,
        items
    )
}

fn chapter_page_html(image_src: &str, next_href: &str) -> String {
    format!(
        r#"<html><body>
        <div class="UnderPage"><div>header</div><div>ad</div>
            <div><mip-link><mip-img src="{}"></mip-img></mip-link></div></div>
        <div class="action-list"><ul><li>prev</li><li>menu</li>
            <li><mip-link href="{}">Next</mip-link></li></ul></div>
        </body></html>"#,
        image_src, next_href
    )
}

/// Mounts the landing page and every chapter's pages and images
///
/// The last page of each chapter links back to the index. The index is
/// expected to be fetched exactly once.
async fn mount_series(server: &MockServer, chapters: &[MockChapter], page_delay: Duration) {
    Mock::given(method("GET"))
        .and(path(INDEX_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(landing_html(chapters)))
        .expect(1)
        .mount(server)
        .await;

    for (i, c) in chapters.iter().enumerate() {
        let number = i + 1;
        for (k, height) in c.heights.iter().enumerate() {
            let page = k + 1;
            let next = if page == c.heights.len() {
                INDEX_PATH.to_string()
            } else {
                page_path(number, page + 1)
            };

            Mock::given(method("GET"))
                .and(path(page_path(number, page)))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(chapter_page_html(&image_path(number, page), &next))
                        .set_delay(page_delay),
                )
                .mount(server)
                .await;

            Mock::given(method("GET"))
                .and(path(image_path(number, page)))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(jpeg(*height)))
                .mount(server)
                .await;
        }
    }
}

fn test_config(server: &MockServer, download: &Path) -> Config {
    Config {
        site: SiteConfig {
            require_mobile_host: false,
            ..SiteConfig::with_landing_url(format!("{}{}", server.uri(), INDEX_PATH))
        },
        crawl: CrawlConfig {
            max_concurrency: 1,
            ..CrawlConfig::default()
        },
        retry: RetryConfig {
            max_attempts: 2,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        },
        output: OutputConfig {
            download_path: download.display().to_string(),
            jpeg_quality: 90,
        },
        user_agent: UserAgentConfig::default(),
    }
}

#[tokio::test]
async fn test_range_selection_and_merge() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let chapters = vec![
        chapter("Ch1", &[800, 600]),
        chapter("Ch2", &[300]),
        chapter("Ch3", &[100]),
    ];

    // Chapter 3 lies outside the range and must never be requested
    Mock::given(method("GET"))
        .and(path(page_path(3, 1)))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_series(&server, &chapters, Duration::ZERO).await;

    let mut config = test_config(&server, dir.path());
    config.crawl.begin = 1;
    config.crawl.end = 2;

    let report = Coordinator::new(config).unwrap().run().await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.series_title, "Demo");
    assert_eq!(report.chapters_selected, 2);
    assert_eq!(report.completed.len(), 2);
    assert_eq!(report.total_pages(), 3);
    assert_eq!(report.total_files(), 2);
    assert_eq!(report.peak_concurrency, 1);

    let series = dir.path().join("Demo");
    let merged = image::open(series.join("Ch1.jpg")).unwrap();
    assert_eq!(merged.dimensions(), (40, 1400));
    let single = image::open(series.join("Ch2.jpg")).unwrap();
    assert_eq!(single.dimensions(), (40, 300));
    assert!(!series.join("Ch3.jpg").exists());
}

#[tokio::test]
async fn test_page_mode_writes_every_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let chapters = vec![chapter("Ch1", &[50, 60, 70]), chapter("Ch2", &[80])];
    mount_series(&server, &chapters, Duration::ZERO).await;

    let mut config = test_config(&server, dir.path());
    config.crawl.merge_images = false;
    config.crawl.max_concurrency = 2;

    let report = Coordinator::new(config).unwrap().run().await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.total_files(), 4);

    let series = dir.path().join("Demo");
    for file in ["Ch1-1.jpg", "Ch1-2.jpg", "Ch1-3.jpg"] {
        assert!(series.join("Ch1").join(file).exists(), "missing {}", file);
    }
    let page = image::open(series.join("Ch2").join("Ch2-1.jpg")).unwrap();
    assert_eq!(page.dimensions(), (40, 80));
    assert!(!series.join("Ch1.jpg").exists());
}

#[tokio::test]
async fn test_concurrency_cap() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let chapters = vec![
        chapter("Ch1", &[10, 10]),
        chapter("Ch2", &[10, 10]),
        chapter("Ch3", &[10, 10]),
        chapter("Ch4", &[10, 10]),
        chapter("Ch5", &[10, 10]),
    ];
    mount_series(&server, &chapters, Duration::from_millis(100)).await;

    let mut config = test_config(&server, dir.path());
    config.crawl.max_concurrency = 2;

    let report = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(report.completed.len(), 5);
    assert_eq!(report.peak_concurrency, 2);
}

#[tokio::test]
async fn test_isolated_failure_keeps_siblings() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // Chapter 2's image is missing; registered first so it takes precedence
    Mock::given(method("GET"))
        .and(path(image_path(2, 1)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let chapters = vec![
        chapter("Ch1", &[20]),
        chapter("Ch2", &[20]),
        chapter("Ch3", &[20]),
    ];
    mount_series(&server, &chapters, Duration::ZERO).await;

    let config = test_config(&server, dir.path());
    let report = Coordinator::new(config).unwrap().run().await.unwrap();

    assert!(!report.is_success());
    assert_eq!(report.completed.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].name, "Ch2");
    assert_eq!(report.failed[0].position, 2);
    assert!(report.failed[0].error.contains("404"));

    let series = dir.path().join("Demo");
    assert!(series.join("Ch1.jpg").exists());
    assert!(!series.join("Ch2.jpg").exists());
    assert!(series.join("Ch3.jpg").exists());
}

#[tokio::test]
async fn test_fail_fast_aborts_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(image_path(1, 1)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    // With one slot the failure settles before chapter 2 is dispatched
    Mock::given(method("GET"))
        .and(path(page_path(2, 1)))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let chapters = vec![chapter("Ch1", &[20]), chapter("Ch2", &[20])];
    mount_series(&server, &chapters, Duration::ZERO).await;

    let mut config = test_config(&server, dir.path());
    config.crawl.failure_policy = FailurePolicy::FailFast;

    let err = Coordinator::new(config).unwrap().run().await.unwrap_err();
    match err {
        MirrorError::ChapterFailed { chapter, .. } => assert_eq!(chapter, "Ch1"),
        other => panic!("expected ChapterFailed, got {}", other),
    }
}

#[tokio::test]
async fn test_fail_fast_stops_running_siblings() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(image_path(1, 1)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    // Chapter 1 fails on its first image; chapter 2 is still paging when
    // that happens
    let chapters = vec![chapter("Ch1", &[20]), chapter("Ch2", &[20, 20, 20])];
    mount_series(&server, &chapters, Duration::from_millis(150)).await;

    let mut config = test_config(&server, dir.path());
    config.crawl.max_concurrency = 2;
    config.crawl.failure_policy = FailurePolicy::FailFast;

    let err = Coordinator::new(config).unwrap().run().await.unwrap_err();
    assert!(matches!(err, MirrorError::ChapterFailed { .. }));

    // The aborted walk must not keep going after the crawl returned
    tokio::time::sleep(Duration::from_millis(600)).await;
    let series = dir.path().join("Demo");
    assert!(!series.join("Ch2.jpg").exists());
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .map(|entries| entries.filter_map(Result::ok).collect())
        .unwrap_or_default();
    assert!(leftovers.is_empty(), "unexpected output: {:?}", leftovers);
}

#[tokio::test]
async fn test_plan_does_not_walk_chapters() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(INDEX_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(landing_html(&[
            chapter("Ch1", &[10]),
            chapter("Ch2", &[10]),
            chapter("Ch3", &[10]),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(&server, dir.path());
    config.crawl.begin = 2;

    let plan = Coordinator::new(config).unwrap().plan().await.unwrap();

    assert_eq!(plan.series_title, "Demo");
    assert_eq!(plan.total_chapters, 3);
    let names: Vec<_> = plan.selected.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Ch2", "Ch3"]);
    assert_eq!(plan.selected[0].position, 2);

    // Only the landing page was requested
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn test_unreachable_landing_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(INDEX_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = test_config(&server, dir.path());
    let err = Coordinator::new(config).unwrap().run().await.unwrap_err();
    assert!(matches!(err, MirrorError::Fetch(_)));
}

#[tokio::test]
async fn test_crawl_from_config_file() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let chapters = vec![chapter("Ch1", &[30, 40])];
    mount_series(&server, &chapters, Duration::ZERO).await;

    let download = dir.path().join("comics");
    let config_path = dir.path().join("mirror.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[site]
landing-url = "{}{}"
require-mobile-host = false

[crawl]
max-concurrency = 2

[retry]
initial-backoff-ms = 0
max-backoff-ms = 0

[output]
download-path = "{}"
"#,
            server.uri(),
            INDEX_PATH,
            download.display()
        ),
    )
    .unwrap();

    let config = load_config(&config_path).unwrap();
    let report = panel_mirror::crawl(config).await.unwrap();

    assert!(report.is_success());
    let merged = image::open(download.join("Demo").join("Ch1.jpg")).unwrap();
    assert_eq!(merged.dimensions(), (40, 70));
}
