//! Thumbnail request types.
//!
//! A [`ThumbnailRequest`] names the video to sample, the file to write,
//! optional target dimensions, and a [`ThumbnailMode`] carrying the
//! still-image or animated-GIF parameters.
//!
//! # Example
//!
//! ```
//! use vidthumb::{ImageFormat, ThumbnailRequest};
//!
//! let request = ThumbnailRequest::image("input.mp4", "thumb.jpg")
//!     .with_width(320)
//!     .with_format(ImageFormat::Jpeg)
//!     .with_quality(85);
//! assert!(request.validate().is_ok());
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

use serde_json::Value;

use crate::error::ThumbnailError;
use crate::gif::GifOptions;
use crate::still::{ImageFormat, ImageOptions};

/// Prefix identifying a locator that refers to a bundled asset.
pub const ASSET_PREFIX: &str = "assets/";

/// Largest dimension a GIF logical screen can describe.
const MAX_GIF_DIMENSION: u32 = u16::MAX as u32;

/// Largest still-thumbnail side. WEBP cannot describe more.
pub const MAX_STILL_DIMENSION: u32 = 16_383;

/// Where the source video lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoLocator {
    /// A file on the local filesystem, used as-is.
    LocalPath(PathBuf),
    /// A bundled asset, relative to the asset root (prefix already stripped).
    AssetPath(String),
    /// An `http://` or `https://` URL that is downloaded before decoding.
    RemoteUrl(String),
}

impl VideoLocator {
    /// Classify a raw locator string.
    ///
    /// `http://` and `https://` (case-insensitive) mark a remote URL, a
    /// leading `assets/` marks a bundled asset, anything else is a local path.
    pub fn parse(raw: &str) -> Self {
        let lowercase = raw.to_ascii_lowercase();
        if lowercase.starts_with("http://") || lowercase.starts_with("https://") {
            VideoLocator::RemoteUrl(raw.to_string())
        } else if let Some(asset) = raw.strip_prefix(ASSET_PREFIX) {
            VideoLocator::AssetPath(asset.to_string())
        } else {
            VideoLocator::LocalPath(PathBuf::from(raw))
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            VideoLocator::LocalPath(path) => path.as_os_str().is_empty(),
            VideoLocator::AssetPath(asset) => asset.is_empty(),
            VideoLocator::RemoteUrl(url) => url.is_empty(),
        }
    }
}

impl Display for VideoLocator {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            VideoLocator::LocalPath(path) => write!(f, "{}", path.display()),
            VideoLocator::AssetPath(asset) => write!(f, "{ASSET_PREFIX}{asset}"),
            VideoLocator::RemoteUrl(url) => f.write_str(url),
        }
    }
}

impl From<&str> for VideoLocator {
    fn from(raw: &str) -> Self {
        VideoLocator::parse(raw)
    }
}

impl From<String> for VideoLocator {
    fn from(raw: String) -> Self {
        VideoLocator::parse(&raw)
    }
}

/// What kind of thumbnail to produce.
#[derive(Debug, Clone, PartialEq)]
pub enum ThumbnailMode {
    /// One frame encoded as PNG, JPEG, or WEBP.
    Image(ImageOptions),
    /// Several evenly spaced frames encoded as an animated GIF.
    Gif(GifOptions),
}

/// A single thumbnail job.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct ThumbnailRequest {
    /// The video to sample.
    pub source: VideoLocator,
    /// Destination file. Exactly one file is written here on success.
    pub output_path: PathBuf,
    /// Target width in pixels.
    pub width: Option<u32>,
    /// Target height in pixels.
    pub height: Option<u32>,
    /// Still-image or animated-GIF parameters.
    pub mode: ThumbnailMode,
}

impl ThumbnailRequest {
    /// A still-image request with default [`ImageOptions`].
    pub fn image(source: impl Into<VideoLocator>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output_path: output_path.into(),
            width: None,
            height: None,
            mode: ThumbnailMode::Image(ImageOptions::default()),
        }
    }

    /// An animated-GIF request with default [`GifOptions`].
    pub fn gif(source: impl Into<VideoLocator>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output_path: output_path.into(),
            width: None,
            height: None,
            mode: ThumbnailMode::Gif(GifOptions::default()),
        }
    }

    /// Set the target width.
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    /// Set the target height.
    pub fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    /// Set the still-image format. Ignored for GIF requests.
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        if let ThumbnailMode::Image(options) = &mut self.mode {
            options.format = format;
        }
        self
    }

    /// Set the still-image quality. Ignored for GIF requests.
    pub fn with_quality(mut self, quality: i32) -> Self {
        if let ThumbnailMode::Image(options) = &mut self.mode {
            options.quality = quality;
        }
        self
    }

    /// Set the still-image sample offset in milliseconds. Ignored for GIF requests.
    pub fn with_time_ms(mut self, time_ms: u64) -> Self {
        if let ThumbnailMode::Image(options) = &mut self.mode {
            options.time_ms = time_ms;
        }
        self
    }

    /// Set how many frames the GIF samples. Ignored for still requests.
    pub fn with_frame_count(mut self, frame_count: u32) -> Self {
        if let ThumbnailMode::Gif(options) = &mut self.mode {
            options.frame_count = frame_count;
        }
        self
    }

    /// Set the per-frame GIF delay in milliseconds. Ignored for still requests.
    pub fn with_delay_ms(mut self, delay_ms: u32) -> Self {
        if let ThumbnailMode::Gif(options) = &mut self.mode {
            options.delay_ms = delay_ms;
        }
        self
    }

    /// Set the GIF loop count (`0` loops forever, negative plays once).
    /// Ignored for still requests.
    pub fn with_repeat(mut self, repeat: i32) -> Self {
        if let ThumbnailMode::Gif(options) = &mut self.mode {
            options.repeat = repeat;
        }
        self
    }

    /// Check the request shape before any I/O happens.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::InvalidArgument`] for an empty locator or
    /// output path, a zero dimension, a GIF with zero frames, or a
    /// dimension beyond 16383 (stills) or 65535 (GIFs).
    pub fn validate(&self) -> Result<(), ThumbnailError> {
        if self.source.is_empty() {
            return Err(ThumbnailError::InvalidArgument(
                "videoPath must not be empty".to_string(),
            ));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(ThumbnailError::InvalidArgument(
                "thumbnailPath must not be empty".to_string(),
            ));
        }
        for (name, value) in [("width", self.width), ("height", self.height)] {
            if value == Some(0) {
                return Err(ThumbnailError::InvalidArgument(format!(
                    "{name} must be a positive integer"
                )));
            }
        }

        let (kind, limit) = match &self.mode {
            ThumbnailMode::Image(_) => ("still", MAX_STILL_DIMENSION),
            ThumbnailMode::Gif(options) => {
                if options.frame_count == 0 {
                    return Err(ThumbnailError::InvalidArgument(
                        "frameCount must be at least 1".to_string(),
                    ));
                }
                ("GIF", MAX_GIF_DIMENSION)
            }
        };
        for (name, value) in [("width", self.width), ("height", self.height)] {
            if value.is_some_and(|dimension| dimension > limit) {
                return Err(ThumbnailError::InvalidArgument(format!(
                    "{name} exceeds the {kind} limit of {limit} pixels"
                )));
            }
        }

        Ok(())
    }

    /// Build a request from a command-dispatch argument map.
    ///
    /// `method` is `"generateImageThumbnail"` or `"generateGifThumbnail"`.
    /// Field names follow the command layer: `videoPath`, `thumbnailPath`,
    /// `width`, `height`, `format`, `quality`, `timeMs`, `frameCount`,
    /// `delay`, `repeat`.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::InvalidArgument`] for an unknown method,
    /// missing required fields, or values of the wrong type or sign. The
    /// returned request is validated.
    ///
    /// # Example
    ///
    /// ```
    /// use serde_json::json;
    /// use vidthumb::ThumbnailRequest;
    ///
    /// let request = ThumbnailRequest::from_arguments(
    ///     "generateGifThumbnail",
    ///     &json!({"videoPath": "local.mp4", "thumbnailPath": "out.gif", "frameCount": 5}),
    /// )?;
    /// # Ok::<(), vidthumb::ThumbnailError>(())
    /// ```
    pub fn from_arguments(method: &str, arguments: &Value) -> Result<Self, ThumbnailError> {
        let arguments = arguments.as_object().ok_or_else(|| {
            ThumbnailError::InvalidArgument("Invalid arguments received".to_string())
        })?;

        let video_path = required_string(arguments, "videoPath")?;
        let thumbnail_path = required_string(arguments, "thumbnailPath")?;

        let mut request = match method {
            "generateImageThumbnail" => {
                let mut request = ThumbnailRequest::image(video_path, thumbnail_path);
                if let Some(code) = optional_integer(arguments, "format")? {
                    request = request.with_format(ImageFormat::from_code(code));
                }
                if let Some(quality) = optional_integer(arguments, "quality")? {
                    let quality = i32::try_from(quality).unwrap_or(i32::MAX);
                    request = request.with_quality(quality);
                }
                if let Some(time_ms) = optional_non_negative(arguments, "timeMs")? {
                    request = request.with_time_ms(time_ms);
                }
                request
            }
            "generateGifThumbnail" => {
                let mut request = ThumbnailRequest::gif(video_path, thumbnail_path);
                if let Some(frame_count) = optional_integer(arguments, "frameCount")? {
                    let frame_count = u32::try_from(frame_count).map_err(|_| {
                        ThumbnailError::InvalidArgument(format!(
                            "frameCount must be a positive integer, got {frame_count}"
                        ))
                    })?;
                    request = request.with_frame_count(frame_count);
                }
                if let Some(delay) = optional_non_negative(arguments, "delay")? {
                    request = request.with_delay_ms(u32::try_from(delay).unwrap_or(u32::MAX));
                }
                if let Some(repeat) = optional_integer(arguments, "repeat")? {
                    let repeat = repeat.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
                    request = request.with_repeat(repeat);
                }
                request
            }
            other => {
                return Err(ThumbnailError::InvalidArgument(format!(
                    "Unknown method: {other}"
                )));
            }
        };

        request.width = optional_dimension(arguments, "width")?;
        request.height = optional_dimension(arguments, "height")?;
        request.validate()?;
        Ok(request)
    }
}

type Arguments = serde_json::Map<String, Value>;

fn required_string<'a>(arguments: &'a Arguments, key: &str) -> Result<&'a str, ThumbnailError> {
    match arguments.get(key) {
        Some(Value::String(value)) if !value.is_empty() => Ok(value),
        Some(Value::String(_)) | None | Some(Value::Null) => Err(
            ThumbnailError::InvalidArgument(format!("Missing required parameter: {key}")),
        ),
        Some(other) => Err(ThumbnailError::InvalidArgument(format!(
            "{key} must be a string, got {other}"
        ))),
    }
}

fn optional_integer(arguments: &Arguments, key: &str) -> Result<Option<i64>, ThumbnailError> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_i64().map(Some).ok_or_else(|| {
            ThumbnailError::InvalidArgument(format!("{key} must be an integer, got {value}"))
        }),
    }
}

fn optional_non_negative(arguments: &Arguments, key: &str) -> Result<Option<u64>, ThumbnailError> {
    match optional_integer(arguments, key)? {
        None => Ok(None),
        Some(value) => u64::try_from(value).map(Some).map_err(|_| {
            ThumbnailError::InvalidArgument(format!("{key} must not be negative, got {value}"))
        }),
    }
}

fn optional_dimension(arguments: &Arguments, key: &str) -> Result<Option<u32>, ThumbnailError> {
    match optional_integer(arguments, key)? {
        None => Ok(None),
        Some(value) if value > 0 => u32::try_from(value).map(Some).map_err(|_| {
            ThumbnailError::InvalidArgument(format!("{key} is too large: {value}"))
        }),
        Some(value) => Err(ThumbnailError::InvalidArgument(format!(
            "{key} must be a positive integer, got {value}"
        ))),
    }
}
