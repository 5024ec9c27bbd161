//! # vidthumb
//!
//! Generate still and animated-GIF thumbnails from videos that live on
//! disk, inside a bundled asset store, or behind an HTTP(S) URL.
//!
//! A [`ThumbnailRequest`] names a source, an output path, an optional
//! target size, and either still-image or GIF options. A [`Thumbnailer`]
//! runs it through the pipeline and reports a [`ThumbnailResult`]:
//!
//! 1. **Resolve** the locator to a readable local file
//!    ([`SourceResolver`]), downloading or extracting as needed.
//! 2. **Sample** one offset (still) or N evenly spaced offsets (GIF).
//! 3. **Acquire** a decoded frame near each offset through a
//!    [`FrameAcquirer`] backend, in parallel for GIFs.
//! 4. **Resize** each frame, keeping aspect ratio when only one side is
//!    given ([`resolve_dimensions`]).
//! 5. **Encode** a PNG, JPEG or WEBP still, or stream frames into a
//!    [`GifSession`] in slot order.
//!
//! Output files are written atomically: a failed job never leaves a
//! partial file behind, and temporary downloads are removed on every path.
//!
//! ## Quick Start
//!
//! ```no_run
//! # #[cfg(feature = "ffmpeg")]
//! # async fn example() -> Result<(), vidthumb::ThumbnailError> {
//! use vidthumb::{ImageFormat, ThumbnailRequest, Thumbnailer, ThumbnailerOptions};
//!
//! let thumbnailer = Thumbnailer::with_ffmpeg(ThumbnailerOptions::new())?;
//!
//! let still = ThumbnailRequest::image("input.mp4", "poster.jpg")
//!     .with_width(320)
//!     .with_format(ImageFormat::Jpeg)
//!     .with_quality(85)
//!     .with_time_ms(2_500);
//! let path = thumbnailer.generate(still).await.into_result()?;
//! println!("wrote {}", path.display());
//!
//! let animated = ThumbnailRequest::gif("https://example.com/clip.mp4", "preview.gif")
//!     .with_height(180)
//!     .with_frame_count(8);
//! let result = thumbnailer.generate(animated).await;
//! println!("{}", result.to_json());
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ffmpeg` | [`FfmpegAcquirer`] decoder backend and the `vidthumb` binary |
//!
//! Without `ffmpeg` the pipeline is fully usable with any custom
//! [`FrameAcquirer`]. The FFmpeg backend needs the FFmpeg development
//! libraries installed on the build machine.

pub mod acquire;
pub mod configuration;
pub mod error;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod gif;
mod parallel;
pub mod progress;
pub mod request;
pub mod resize;
pub mod sampler;
pub mod source;
pub mod still;
pub mod thumbnailer;
#[cfg(feature = "ffmpeg")]
mod utilities;

pub use acquire::{DecodedFrame, FrameAcquirer, PixelFormat, SourceInfo};
pub use configuration::ThumbnailerOptions;
pub use error::{ErrorCode, ThumbnailError};
#[cfg(feature = "ffmpeg")]
pub use ffmpeg::{FfmpegAcquirer, FfmpegLogLevel, set_ffmpeg_log_level};
pub use gif::{GifOptions, GifSession, SessionState};
pub use progress::{OperationType, ProgressCallback, ProgressInfo};
pub use request::{ASSET_PREFIX, MAX_STILL_DIMENSION, ThumbnailMode, ThumbnailRequest, VideoLocator};
pub use resize::{ResizedFrame, resolve_dimensions};
pub use sampler::SampleTimestamp;
pub use source::{AssetStore, DirectoryAssets, ResolvedSource, SourceResolver};
pub use still::{ImageFormat, ImageOptions};
pub use thumbnailer::{ThumbnailResult, Thumbnailer};
