//! Page image download, decode, and routing
//!
//! An acquired image either joins its chapter's sequence in the shared
//! buffer (merge mode) or is written straight to its own file.

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::retry::RetryPolicy;
use crate::imaging::{ChapterImageBuffer, ImageCodec};
use crate::output::{OutputLayout, OutputWriter};
use crate::MirrorError;
use image::DynamicImage;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// Where decoded images go
#[derive(Debug, Clone)]
pub enum ImageSink {
    /// Collect pages per chapter for stitching
    Buffer(Arc<ChapterImageBuffer>),

    /// Write every page to `<series>/<chapter>/<file name>`
    Files {
        writer: OutputWriter,
        layout: OutputLayout,
    },
}

/// What happened to an acquired image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Appended to the buffer; holds the chapter's buffered page count
    Buffered(usize),

    /// Written to disk at this path
    Written(PathBuf),
}

/// Downloads, decodes, and routes page images
pub struct ImageAcquirer {
    fetcher: Arc<dyn PageFetcher>,
    codec: Arc<dyn ImageCodec>,
    retry: RetryPolicy,
    sink: ImageSink,
}

impl ImageAcquirer {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        codec: Arc<dyn ImageCodec>,
        retry: RetryPolicy,
        sink: ImageSink,
    ) -> Self {
        Self {
            fetcher,
            codec,
            retry,
            sink,
        }
    }

    /// Acquires one page image and routes it to the sink
    ///
    /// # Errors
    ///
    /// * `RetriesExhausted` - network failures outlasted the retry policy
    /// * `Fetch` - the image host answered with a non-success status
    /// * `Decode` - the payload is not a readable image
    /// * `Io` / `Encode` - writing the page failed (page mode only)
    pub async fn acquire(
        &self,
        image_url: &Url,
        file_name: &str,
        chapter: &str,
    ) -> Result<Routed, MirrorError> {
        tracing::debug!("Download: {} {}", file_name, image_url);

        let bytes = self.fetch_with_retry(image_url).await?;
        let image = self.decode(image_url, bytes).await?;

        match &self.sink {
            ImageSink::Buffer(buffer) => {
                let count = buffer.append(chapter, image);
                Ok(Routed::Buffered(count))
            }
            ImageSink::Files { writer, layout } => {
                let path = layout.page_path(chapter, file_name);
                writer.write_owned(image, path.clone()).await?;
                Ok(Routed::Written(path))
            }
        }
    }

    /// Fetches the image bytes, repeating network-level failures
    async fn fetch_with_retry(&self, image_url: &Url) -> Result<Vec<u8>, MirrorError> {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            match self.fetcher.fetch_bytes(image_url.as_str()).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.is_transient() => {
                    if !self.retry.allows_attempt(attempt + 1) {
                        return Err(MirrorError::RetriesExhausted {
                            url: image_url.to_string(),
                            attempts: attempt,
                            last_error: e.to_string(),
                        });
                    }

                    let delay = self.retry.backoff_for(attempt);
                    tracing::warn!(
                        "Attempt {} for {} failed ({}), retrying in {:?}",
                        attempt,
                        image_url,
                        e,
                        delay
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn decode(&self, image_url: &Url, bytes: Vec<u8>) -> Result<DynamicImage, MirrorError> {
        let codec = Arc::clone(&self.codec);
        tokio::task::spawn_blocking(move || codec.decode(&bytes))
            .await
            .map_err(|e| MirrorError::TaskFailed(e.to_string()))?
            .map_err(|source| MirrorError::Decode {
                url: image_url.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::FetchError;
    use crate::imaging::JpegCodec;
    use async_trait::async_trait;
    use image::{GenericImageView, Rgb, RgbImage};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Replays a fixed series of byte responses, then keeps repeating the last one
    struct ScriptedFetcher {
        responses: Mutex<VecDeque<Result<Vec<u8>, FetchError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(responses: Vec<Result<Vec<u8>, FetchError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
            Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }

        async fn fetch_bytes(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                responses.front().cloned().unwrap()
            }
        }
    }

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([1, 2, 3])));
        JpegCodec.encode(&image, 80).unwrap()
    }

    fn network_error() -> Result<Vec<u8>, FetchError> {
        Err(FetchError::Network {
            url: "http://img/1.jpg".to_string(),
            message: "connection reset".to_string(),
        })
    }

    fn immediate(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    fn url() -> Url {
        Url::parse("http://img.example.com/1.jpg").unwrap()
    }

    #[tokio::test]
    async fn test_network_errors_are_retried_until_success() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            network_error(),
            network_error(),
            Ok(jpeg(10, 20)),
        ]));
        let buffer = Arc::new(ChapterImageBuffer::new());
        let acquirer = ImageAcquirer::new(
            fetcher.clone(),
            Arc::new(JpegCodec),
            immediate(5),
            ImageSink::Buffer(buffer.clone()),
        );

        let routed = acquirer.acquire(&url(), "ch-1.jpg", "ch").await.unwrap();

        assert_eq!(routed, Routed::Buffered(1));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
        let pages = buffer.drain("ch").unwrap();
        assert_eq!(pages[0].dimensions(), (10, 20));
    }

    #[tokio::test]
    async fn test_unbounded_policy_keeps_retrying() {
        let mut script: Vec<_> = (0..40).map(|_| network_error()).collect();
        script.push(Ok(jpeg(4, 4)));
        let fetcher = Arc::new(ScriptedFetcher::new(script));
        let acquirer = ImageAcquirer::new(
            fetcher.clone(),
            Arc::new(JpegCodec),
            RetryPolicy::unbounded_immediate(),
            ImageSink::Buffer(Arc::new(ChapterImageBuffer::new())),
        );

        acquirer.acquire(&url(), "ch-1.jpg", "ch").await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 41);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![network_error()]));
        let acquirer = ImageAcquirer::new(
            fetcher.clone(),
            Arc::new(JpegCodec),
            immediate(3),
            ImageSink::Buffer(Arc::new(ChapterImageBuffer::new())),
        );

        let err = acquirer.acquire(&url(), "ch-1.jpg", "ch").await.unwrap_err();
        assert!(matches!(err, MirrorError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_status_error_is_not_retried() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Err(FetchError::Status {
            url: "http://img/1.jpg".to_string(),
            status: 403,
        })]));
        let acquirer = ImageAcquirer::new(
            fetcher.clone(),
            Arc::new(JpegCodec),
            immediate(5),
            ImageSink::Buffer(Arc::new(ChapterImageBuffer::new())),
        );

        let err = acquirer.acquire(&url(), "ch-1.jpg", "ch").await.unwrap_err();
        assert!(matches!(
            err,
            MirrorError::Fetch(FetchError::Status { status: 403, .. })
        ));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_corrupt_payload_fails_decode() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(b"garbage".to_vec())]));
        let acquirer = ImageAcquirer::new(
            fetcher,
            Arc::new(JpegCodec),
            immediate(5),
            ImageSink::Buffer(Arc::new(ChapterImageBuffer::new())),
        );

        let err = acquirer.acquire(&url(), "ch-1.jpg", "ch").await.unwrap_err();
        assert!(matches!(err, MirrorError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_page_mode_writes_file() {
        let dir = TempDir::new().unwrap();
        let layout = OutputLayout::new(dir.path(), "Series", "jpg");
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(jpeg(8, 8))]));
        let acquirer = ImageAcquirer::new(
            fetcher,
            Arc::new(JpegCodec),
            immediate(1),
            ImageSink::Files {
                writer: OutputWriter::new(Arc::new(JpegCodec), 80),
                layout: layout.clone(),
            },
        );

        let routed = acquirer.acquire(&url(), "Ch 1-1.jpg", "Ch 1").await.unwrap();

        let expected = dir.path().join("Series").join("Ch 1").join("Ch 1-1.jpg");
        assert_eq!(routed, Routed::Written(expected.clone()));
        assert!(expected.exists());
    }
}
