//! Aspect-ratio-aware frame resizing.

use image::{DynamicImage, imageops::FilterType};

use crate::acquire::DecodedFrame;

/// Interpolation used for every resize. Triangle is bilinear.
const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// A frame scaled to its target size, still tagged with its sample slot.
#[derive(Debug, Clone)]
pub struct ResizedFrame {
    /// Slot in the sample plan.
    pub index: usize,
    /// Scaled pixels.
    pub image: DynamicImage,
}

impl ResizedFrame {
    /// Output width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Output height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Resolve the output size for a `source_width` x `source_height` frame.
///
/// - Both targets set: exactly `(width, height)`.
/// - Only width: height is `round(width * source_height / source_width)`.
/// - Only height: width is `round(height * source_width / source_height)`.
/// - Neither: the source size.
///
/// A derived dimension never drops below 1.
pub fn resolve_dimensions(
    source_width: u32,
    source_height: u32,
    width: Option<u32>,
    height: Option<u32>,
) -> (u32, u32) {
    match (width, height) {
        (Some(width), Some(height)) => (width.max(1), height.max(1)),
        (Some(width), None) => (
            width.max(1),
            scale_rounded(width, source_height, source_width),
        ),
        (None, Some(height)) => (
            scale_rounded(height, source_width, source_height),
            height.max(1),
        ),
        (None, None) => (source_width.max(1), source_height.max(1)),
    }
}

/// `round(value * numerator / denominator)`, half away from zero, at least 1.
fn scale_rounded(value: u32, numerator: u32, denominator: u32) -> u32 {
    if denominator == 0 {
        return value.max(1);
    }
    let product = value as u64 * numerator as u64;
    let denominator = denominator as u64;
    let rounded = (2 * product + denominator) / (2 * denominator);
    u32::try_from(rounded).unwrap_or(u32::MAX).max(1)
}

/// Scale a decoded frame under the aspect-ratio policy.
///
/// Consumes the decoded frame; its buffer is released once the scaled copy
/// exists. A frame already at the target size is passed through untouched.
pub fn resize(frame: DecodedFrame, width: Option<u32>, height: Option<u32>) -> ResizedFrame {
    let (target_width, target_height) =
        resolve_dimensions(frame.width(), frame.height(), width, height);
    let image = resize_to(frame.image, target_width, target_height);
    ResizedFrame {
        index: frame.index,
        image,
    }
}

/// Scale `image` to exactly `width` x `height`, skipping the work if it is
/// already that size.
pub(crate) fn resize_to(image: DynamicImage, width: u32, height: u32) -> DynamicImage {
    if image.width() == width && image.height() == height {
        image
    } else {
        image.resize_exact(width, height, RESIZE_FILTER)
    }
}
