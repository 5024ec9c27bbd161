//! Error types for the `vidthumb` crate.
//!
//! [`ThumbnailError`] is the single error type returned by every fallible
//! operation. Each variant maps onto one of the four machine-readable
//! [`ErrorCode`]s surfaced to callers of the command layer.

use std::{fmt, io::Error as IoError};

use image::ImageError;
use thiserror::Error;

/// Machine-readable classification of a failed thumbnail request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Missing or malformed request fields. No I/O was attempted.
    InvalidArgument,
    /// The video locator could not be resolved to a local file.
    DownloadFailed,
    /// No usable frame could be decoded from the source.
    DecodeFailed,
    /// The still image or GIF container could not be written.
    EncodeFailed,
}

impl ErrorCode {
    /// The wire representation, e.g. `"DOWNLOAD_FAILED"`.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::DownloadFailed => "DOWNLOAD_FAILED",
            ErrorCode::DecodeFailed => "DECODE_FAILED",
            ErrorCode::EncodeFailed => "ENCODE_FAILED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unified error type for all `vidthumb` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ThumbnailError {
    /// The request is missing a required field or carries an out-of-range value.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The video locator could not be resolved to a local, seekable file.
    #[error("Source unavailable ({locator}): {reason}")]
    SourceUnavailable {
        /// The locator as supplied by the caller.
        locator: String,
        /// Underlying reason the resolution failed.
        reason: String,
    },

    /// Decoding failed in a way that leaves no usable frame.
    #[error("Failed to decode video: {0}")]
    DecodeFailed(String),

    /// Writing the output image or GIF container failed.
    #[error("Failed to encode thumbnail: {0}")]
    EncodeFailed(String),

    /// A frame was offered to an encoding session out of index order.
    #[error("Frame {actual} committed out of order (expected index {expected})")]
    FrameOutOfOrder {
        /// The next index the session accepts.
        expected: usize,
        /// The index that was offered.
        actual: usize,
    },

    /// The encoding session was already finalized or aborted.
    #[error("Encoding session is closed")]
    SessionClosed,

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while resizing or encoding.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// An error originating from the FFmpeg libraries.
    #[cfg(feature = "ffmpeg")]
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),
}

impl ThumbnailError {
    /// Classify this error for the command layer.
    pub fn code(&self) -> ErrorCode {
        match self {
            ThumbnailError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            ThumbnailError::SourceUnavailable { .. } => ErrorCode::DownloadFailed,
            ThumbnailError::DecodeFailed(_) => ErrorCode::DecodeFailed,
            #[cfg(feature = "ffmpeg")]
            ThumbnailError::FfmpegError(_) => ErrorCode::DecodeFailed,
            ThumbnailError::EncodeFailed(_)
            | ThumbnailError::FrameOutOfOrder { .. }
            | ThumbnailError::SessionClosed
            | ThumbnailError::IoError(_)
            | ThumbnailError::ImageError(_) => ErrorCode::EncodeFailed,
        }
    }

    pub(crate) fn source_unavailable(locator: &str, reason: impl fmt::Display) -> Self {
        ThumbnailError::SourceUnavailable {
            locator: locator.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(feature = "ffmpeg")]
impl From<ffmpeg_next::Error> for ThumbnailError {
    fn from(error: ffmpeg_next::Error) -> Self {
        ThumbnailError::FfmpegError(error.to_string())
    }
}
