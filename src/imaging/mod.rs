//! Image handling for chapter pages
//!
//! This module contains:
//! - The codec seam used to decode downloads and encode output files
//! - The shared buffer that collects a chapter's pages while it is walked
//! - The vertical stitching used in merge mode

mod assembler;
mod buffer;
mod codec;

pub use assembler::{canvas_size, merge_vertical, page_offsets, AssembleError};
pub use buffer::ChapterImageBuffer;
pub use codec::{ImageCodec, JpegCodec};
