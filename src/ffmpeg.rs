//! FFmpeg decoder backend.
//!
//! [`FfmpegAcquirer`] implements [`FrameAcquirer`] on top of `ffmpeg-next`.
//! Every call opens its own demuxer and decoder, so one acquirer can serve
//! the whole worker pool without shared mutable state.
//!
//! Seeking lands on the keyframe at or before the requested offset and the
//! first frame decoded from there is returned. There is no decode-forward
//! to the exact timestamp.
//!
//! This module also exposes FFmpeg's own console log level, which is
//! separate from the Rust-side `log` output.

use std::path::Path;

use ffmpeg_next::{
    codec::context::Context as CodecContext,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    util::log::Level,
};
use image::{DynamicImage, RgbImage};

use crate::acquire::{FrameAcquirer, SourceInfo};
use crate::error::ThumbnailError;
use crate::utilities::{frame_to_buffer, micros_to_seek_timestamp, stream_duration_to_micros};

/// FFmpeg internal log verbosity level.
///
/// Maps directly to FFmpeg's `AV_LOG_*` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Print no output at all.
    Quiet,
    /// Only unrecoverable errors.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Debugging messages.
    Debug,
}

impl FfmpegLogLevel {
    fn to_ffmpeg_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Debug => Level::Debug,
        }
    }
}

/// Set what FFmpeg itself prints to stderr.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}

/// Decodes thumbnails with FFmpeg.
#[derive(Debug, Clone, Copy)]
pub struct FfmpegAcquirer {
    _initialized: (),
}

impl FfmpegAcquirer {
    /// Initialise FFmpeg (idempotent) and create the backend.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::FfmpegError`] if FFmpeg fails to initialise.
    pub fn new() -> Result<Self, ThumbnailError> {
        ffmpeg_next::init()?;
        Ok(Self { _initialized: () })
    }
}

fn open_input(source: &Path) -> Result<(Input, usize), ThumbnailError> {
    let input = ffmpeg_next::format::input(&source).map_err(|error| {
        ThumbnailError::DecodeFailed(format!("Failed to open {}: {error}", source.display()))
    })?;
    let stream_index = input
        .streams()
        .best(Type::Video)
        .map(|stream| stream.index())
        .ok_or_else(|| {
            ThumbnailError::DecodeFailed(format!("No video stream in {}", source.display()))
        })?;
    Ok((input, stream_index))
}

impl FrameAcquirer for FfmpegAcquirer {
    fn probe(&self, source: &Path) -> Result<SourceInfo, ThumbnailError> {
        let (input, stream_index) = open_input(source)?;
        let stream = input
            .stream(stream_index)
            .ok_or_else(|| ThumbnailError::DecodeFailed("Video stream vanished".to_string()))?;
        let decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        // Container duration is already in microseconds; fall back to the
        // stream's own duration when the container does not know.
        let container_duration = input.duration();
        let duration_micros = if container_duration > 0 {
            container_duration as u64
        } else {
            stream_duration_to_micros(stream.duration(), stream.time_base())
        };

        log::debug!(
            "Probed {}: {}x{}, {}us",
            source.display(),
            decoder.width(),
            decoder.height(),
            duration_micros
        );
        Ok(SourceInfo {
            duration_micros,
            width: decoder.width(),
            height: decoder.height(),
        })
    }

    fn frame_at(
        &self,
        source: &Path,
        timestamp_micros: u64,
    ) -> Result<Option<DynamicImage>, ThumbnailError> {
        let (mut input, stream_index) = open_input(source)?;
        let parameters = input
            .stream(stream_index)
            .ok_or_else(|| ThumbnailError::DecodeFailed("Video stream vanished".to_string()))?
            .parameters();
        let mut decoder = CodecContext::from_parameters(parameters)?.decoder().video()?;

        let target = micros_to_seek_timestamp(timestamp_micros);
        input.seek(target, ..target)?;

        let mut decoded_frame = VideoFrame::empty();
        for (stream, packet) in input.packets() {
            if stream.index() != stream_index {
                continue;
            }
            decoder.send_packet(&packet)?;
            if decoder.receive_frame(&mut decoded_frame).is_ok() {
                return convert_frame_to_image(&decoded_frame).map(Some);
            }
        }

        decoder.send_eof()?;
        if decoder.receive_frame(&mut decoded_frame).is_ok() {
            return convert_frame_to_image(&decoded_frame).map(Some);
        }
        Ok(None)
    }
}

/// Convert a decoded frame of any pixel format to an RGB8 image.
fn convert_frame_to_image(decoded_frame: &VideoFrame) -> Result<DynamicImage, ThumbnailError> {
    let width = decoded_frame.width();
    let height = decoded_frame.height();
    let mut scaler = ScalingContext::get(
        decoded_frame.format(),
        width,
        height,
        Pixel::RGB24,
        width,
        height,
        ScalingFlags::BILINEAR,
    )?;
    let mut rgb_frame = VideoFrame::empty();
    scaler.run(decoded_frame, &mut rgb_frame)?;

    let buffer = frame_to_buffer(&rgb_frame, width, height, 3);
    let rgb_image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        ThumbnailError::DecodeFailed(
            "Failed to construct RGB image from decoded frame data".to_string(),
        )
    })?;
    Ok(DynamicImage::ImageRgb8(rgb_image))
}
