//! Vertical page stitching
//!
//! Pages are stacked top to bottom, left-aligned. The canvas is as wide as
//! the widest page; narrower pages leave the remainder black.

use image::{imageops, DynamicImage, RgbImage};
use thiserror::Error;

/// Errors produced while stitching a chapter
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("no pages to assemble")]
    Empty,

    #[error("stitched image would be {width}x{height} pixels, over the {limit} pixel limit per side")]
    TooLarge { width: u64, height: u64, limit: u32 },
}

/// Vertical offset of every page on the stitched canvas
///
/// Page `i` starts where pages `0..i` end.
pub fn page_offsets(pages: &[DynamicImage]) -> Vec<u64> {
    pages
        .iter()
        .scan(0u64, |offset, page| {
            let start = *offset;
            *offset += u64::from(page.height());
            Some(start)
        })
        .collect()
}

/// Computes the canvas size for a page sequence
///
/// Neither side may exceed `max_side`, the largest dimension the output
/// codec can encode. Nothing is allocated here, so an oversized chapter is
/// rejected before the canvas exists.
pub fn canvas_size(pages: &[DynamicImage], max_side: u32) -> Result<(u32, u32), AssembleError> {
    if pages.is_empty() {
        return Err(AssembleError::Empty);
    }

    let width = pages.iter().map(|p| p.width()).max().unwrap_or(0);
    let height: u64 = pages.iter().map(|p| u64::from(p.height())).sum();

    if width > max_side || height > u64::from(max_side) {
        return Err(AssembleError::TooLarge {
            width: u64::from(width),
            height,
            limit: max_side,
        });
    }

    // max_side is a u32, so the height fits
    Ok((width, height as u32))
}

/// Stitches pages into one image, in sequence order
pub fn merge_vertical(pages: &[DynamicImage], max_side: u32) -> Result<RgbImage, AssembleError> {
    let (width, height) = canvas_size(pages, max_side)?;
    let mut canvas = RgbImage::new(width, height);

    for (page, offset) in pages.iter().zip(page_offsets(pages)) {
        // `replace` clips to the page's own bounds
        match page {
            DynamicImage::ImageRgb8(rgb) => imageops::replace(&mut canvas, rgb, 0, offset as i64),
            other => imageops::replace(&mut canvas, &other.to_rgb8(), 0, offset as i64),
        }
    }

    tracing::debug!(
        "Stitched {} pages into {}x{}",
        pages.len(),
        canvas.width(),
        canvas.height()
    );

    Ok(canvas)
}
