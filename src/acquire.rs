//! Frame acquisition.
//!
//! [`FrameAcquirer`] is the seam between the thumbnail pipeline and a video
//! decoder. The pipeline is written once against this trait; decoder
//! backends (FFmpeg behind the `ffmpeg` feature, or an in-process test
//! double) implement it.
//!
//! Implementations are shared across worker threads, so every call must be
//! self-contained: open whatever decoder state it needs, use it, and drop it.

use std::path::Path;

use image::{ColorType, DynamicImage};

use crate::error::ThumbnailError;
use crate::sampler::SampleTimestamp;

/// Pixel layout of a decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// 8-bit RGB (24 bpp). This is what decoder backends produce by default.
    #[default]
    Rgb8,
    /// 8-bit RGBA (32 bpp).
    Rgba8,
    /// 8-bit grayscale.
    Gray8,
    /// Anything else the decoder handed back.
    Other,
}

impl From<ColorType> for PixelFormat {
    fn from(color: ColorType) -> Self {
        match color {
            ColorType::Rgb8 => PixelFormat::Rgb8,
            ColorType::Rgba8 => PixelFormat::Rgba8,
            ColorType::L8 => PixelFormat::Gray8,
            _ => PixelFormat::Other,
        }
    }
}

/// Container-level facts read once per job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    /// Total duration in microseconds. `0` when the container does not say.
    pub duration_micros: u64,
    /// Width of the video stream in pixels.
    pub width: u32,
    /// Height of the video stream in pixels.
    pub height: u32,
}

/// A decoded frame, tagged with the sample slot it was requested for.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// Slot in the sample plan.
    pub index: usize,
    /// Requested offset in microseconds.
    pub timestamp_micros: u64,
    /// Decoded pixels.
    pub image: DynamicImage,
}

impl DecodedFrame {
    /// Tag a decoded image with its sample slot.
    pub fn new(sample: SampleTimestamp, image: DynamicImage) -> Self {
        Self {
            index: sample.index,
            timestamp_micros: sample.micros,
            image,
        }
    }

    /// Source width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Source height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Pixel layout of the buffer.
    pub fn pixel_format(&self) -> PixelFormat {
        self.image.color().into()
    }
}

/// Decoder capability consumed by the pipeline.
pub trait FrameAcquirer: Send + Sync {
    /// Read duration and frame size from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::DecodeFailed`] (or a backend-specific decode
    /// error) if the file cannot be opened or has no video stream.
    fn probe(&self, source: &Path) -> Result<SourceInfo, ThumbnailError>;

    /// Decode the nearest synchronization frame at or before `timestamp_micros`.
    ///
    /// `Ok(None)` means no frame is available there; the pipeline records
    /// that slot as skipped and keeps going.
    ///
    /// # Errors
    ///
    /// An `Err` is treated the same as `Ok(None)` by the pipeline but is
    /// logged with its cause.
    fn frame_at(
        &self,
        source: &Path,
        timestamp_micros: u64,
    ) -> Result<Option<DynamicImage>, ThumbnailError>;

    /// Acquire the frame for one sample slot, folding failures into absence.
    fn acquire(&self, source: &Path, sample: SampleTimestamp) -> Option<DecodedFrame> {
        match self.frame_at(source, sample.micros) {
            Ok(Some(image)) => Some(DecodedFrame::new(sample, image)),
            Ok(None) => {
                log::warn!(
                    "No frame available for slot {} at {}us in {}",
                    sample.index,
                    sample.micros,
                    source.display()
                );
                None
            }
            Err(error) => {
                log::warn!(
                    "Failed to decode slot {} at {}us in {}: {error}",
                    sample.index,
                    sample.micros,
                    source.display()
                );
                None
            }
        }
    }
}
