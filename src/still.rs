//! Still-image encoding.
//!
//! Encodes one resized frame as PNG, JPEG, or WEBP and writes it to the
//! output path in a single atomic step: the bytes go to a temporary file in
//! the destination directory which is renamed into place only once fully
//! written, so a failed write never leaves a truncated thumbnail behind.

use std::io::{Cursor, Write};
use std::path::Path;

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use tempfile::NamedTempFile;

use crate::error::ThumbnailError;

/// Quality used when the requested value falls outside `1..=100`.
pub const MAX_QUALITY: u8 = 100;

/// Output format for still thumbnails.
///
/// The numeric codes match the command layer: `0` = PNG, `1` = JPEG,
/// `2` = WEBP. Any other code decodes as JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageFormat {
    /// Lossless PNG. Quality is ignored. This is the default.
    #[default]
    Png,
    /// Lossy JPEG.
    Jpeg,
    /// Lossy WEBP.
    Webp,
}

impl ImageFormat {
    /// Decode a command-layer format code.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => ImageFormat::Png,
            2 => ImageFormat::Webp,
            _ => ImageFormat::Jpeg,
        }
    }

    /// The command-layer code for this format.
    pub fn code(self) -> i64 {
        match self {
            ImageFormat::Png => 0,
            ImageFormat::Jpeg => 1,
            ImageFormat::Webp => 2,
        }
    }

    /// Conventional file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Webp => "webp",
        }
    }
}

/// Parameters for a still-image thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageOptions {
    /// Output encoding.
    pub format: ImageFormat,
    /// Encoder quality in `1..=100`; anything else falls back to 100.
    pub quality: i32,
    /// Where to sample the frame, in milliseconds from the start (default 1000).
    pub time_ms: u64,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            format: ImageFormat::Png,
            quality: MAX_QUALITY as i32,
            time_ms: 1_000,
        }
    }
}

impl ImageOptions {
    /// Sample offset in microseconds.
    pub fn time_micros(&self) -> u64 {
        self.time_ms.saturating_mul(1_000)
    }
}

/// Clamp a requested quality to the encoder range.
///
/// Values in `1..=100` pass through; everything else becomes
/// [`MAX_QUALITY`] rather than an error.
pub fn normalize_quality(quality: i32) -> u8 {
    match u8::try_from(quality) {
        Ok(value) if (1..=MAX_QUALITY).contains(&value) => value,
        _ => MAX_QUALITY,
    }
}

/// Encode an image into memory.
///
/// # Errors
///
/// Returns [`ThumbnailError::EncodeFailed`] if the codec rejects the image.
pub fn encode(
    image: &DynamicImage,
    format: ImageFormat,
    quality: i32,
) -> Result<Vec<u8>, ThumbnailError> {
    let mut buffer = Cursor::new(Vec::new());
    let result = match format {
        ImageFormat::Png => image.write_with_encoder(PngEncoder::new(&mut buffer)),
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buffer, normalize_quality(quality));
            rgb.write_with_encoder(encoder)
        }
        ImageFormat::Webp => return encode_webp(image, quality),
    };
    result.map_err(|error| {
        ThumbnailError::EncodeFailed(format!("{} encoder: {error}", format.extension()))
    })?;
    Ok(buffer.into_inner())
}

/// Lossy WEBP through libwebp.
fn encode_webp(image: &DynamicImage, quality: i32) -> Result<Vec<u8>, ThumbnailError> {
    let rgb = image.to_rgb8();
    let memory = webp::Encoder::from_rgb(&rgb, rgb.width(), rgb.height())
        .encode_simple(false, f32::from(normalize_quality(quality)))
        .map_err(|error| ThumbnailError::EncodeFailed(format!("webp encoder: {error:?}")))?;
    // WebPMemory is !Send; copy it out.
    Ok(memory.to_vec())
}

/// Write `bytes` to `path` atomically.
///
/// # Errors
///
/// Returns [`ThumbnailError::EncodeFailed`] if the temporary file cannot be
/// created, written, or moved into place. The temporary file is removed on
/// every failure path.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), ThumbnailError> {
    let mut file = temporary_sibling(path)?;
    file.write_all(bytes)
        .and_then(|()| file.as_file().sync_all())
        .map_err(|error| {
            ThumbnailError::EncodeFailed(format!("Failed to write {}: {error}", path.display()))
        })?;
    file.persist(path).map_err(|error| {
        ThumbnailError::EncodeFailed(format!(
            "Failed to move thumbnail into {}: {}",
            path.display(),
            error.error
        ))
    })?;
    Ok(())
}

/// Encode `image` and write it to `path`.
///
/// # Errors
///
/// See [`encode`] and [`write_atomically`].
pub fn save(
    image: &DynamicImage,
    path: &Path,
    format: ImageFormat,
    quality: i32,
) -> Result<(), ThumbnailError> {
    log::debug!(
        "Encoding {}x{} still as {:?} (quality={}) to {}",
        image.width(),
        image.height(),
        format,
        quality,
        path.display()
    );
    let bytes = encode(image, format, quality)?;
    write_atomically(path, &bytes)
}

/// Create a temporary file next to `path` so the final rename stays on one
/// filesystem.
pub(crate) fn temporary_sibling(path: &Path) -> Result<NamedTempFile, ThumbnailError> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    tempfile::Builder::new()
        .prefix(".vidthumb-")
        .suffix(".part")
        .tempfile_in(directory)
        .map_err(|error| {
            ThumbnailError::EncodeFailed(format!(
                "Failed to create temporary file in {}: {error}",
                directory.display()
            ))
        })
}
