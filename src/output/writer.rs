//! Image persistence
//!
//! Encoding a stitched chapter can take a noticeable amount of CPU, so async
//! callers go through [`OutputWriter::write_owned`], which moves the work to
//! the blocking pool and drops the bitmap there once it is on disk.

use crate::imaging::ImageCodec;
use crate::MirrorError;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Writes decoded images to disk through an [`ImageCodec`]
#[derive(Clone)]
pub struct OutputWriter {
    codec: Arc<dyn ImageCodec>,
    quality: u8,
}

impl std::fmt::Debug for OutputWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputWriter")
            .field("extension", &self.codec.extension())
            .field("quality", &self.quality)
            .finish()
    }
}

impl OutputWriter {
    /// Creates a writer encoding at the given quality (1-100)
    pub fn new(codec: Arc<dyn ImageCodec>, quality: u8) -> Self {
        Self { codec, quality }
    }

    /// Largest width or height this writer can encode
    pub fn max_dimension(&self) -> u32 {
        self.codec.max_dimension()
    }

    /// Encodes `image` and writes it to `path`, creating parent directories
    ///
    /// Returns the number of bytes written.
    pub fn write(&self, image: &DynamicImage, path: &Path) -> Result<u64, MirrorError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| MirrorError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let bytes = self
            .codec
            .encode(image, self.quality)
            .map_err(|source| MirrorError::Encode {
                path: path.to_path_buf(),
                source,
            })?;

        // Readers only ever see a complete file at `path`
        let partial = partial_path(path);
        std::fs::write(&partial, &bytes).map_err(|source| MirrorError::Io {
            path: partial.clone(),
            source,
        })?;
        if let Err(source) = std::fs::rename(&partial, path) {
            let _ = std::fs::remove_file(&partial);
            return Err(MirrorError::Io {
                path: path.to_path_buf(),
                source,
            });
        }

        tracing::debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(bytes.len() as u64)
    }

    /// Takes ownership of `image` and writes it from the blocking pool
    pub async fn write_owned(&self, image: DynamicImage, path: PathBuf) -> Result<u64, MirrorError> {
        let writer = self.clone();
        tokio::task::spawn_blocking(move || writer.write(&image, &path))
            .await
            .map_err(|e| MirrorError::TaskFailed(e.to_string()))?
    }
}

/// Sibling of `path` that receives the bytes before the final rename
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}
