//! Sample timestamp planning.
//!
//! Still thumbnails sample one fixed offset. Animated thumbnails sample
//! `count` evenly spaced offsets starting at zero and stopping one interval
//! short of the end, so the final instant of the source is never requested.

use crate::error::ThumbnailError;
use crate::request::ThumbnailMode;

/// One planned sample: its slot in the plan and its offset into the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SampleTimestamp {
    /// Position in the plan, `0..len`.
    pub index: usize,
    /// Offset from the start of the source in microseconds.
    pub micros: u64,
}

/// Plan a single still sample at `offset_micros`.
///
/// An offset past the end of the source is not an error here; the decoder
/// decides what to return.
pub fn still(offset_micros: u64) -> Vec<SampleTimestamp> {
    vec![SampleTimestamp {
        index: 0,
        micros: offset_micros,
    }]
}

/// Plan `count` evenly spaced samples across `[0, duration_micros)`.
///
/// `timestamp[i] = i * (duration / count)`. When the source is shorter than
/// `count` microseconds the interval is clamped to 1 so the plan stays
/// strictly increasing.
///
/// # Errors
///
/// - [`ThumbnailError::InvalidArgument`] if `count` is zero.
/// - [`ThumbnailError::DecodeFailed`] if the duration is zero or unknown.
pub fn evenly_spaced(
    duration_micros: u64,
    count: u32,
) -> Result<Vec<SampleTimestamp>, ThumbnailError> {
    if count == 0 {
        return Err(ThumbnailError::InvalidArgument(
            "frameCount must be at least 1".to_string(),
        ));
    }
    if duration_micros == 0 {
        return Err(ThumbnailError::DecodeFailed(
            "source reports no duration; cannot space GIF samples".to_string(),
        ));
    }

    let interval = (duration_micros / count as u64).max(1);
    Ok((0..count as usize)
        .map(|index| SampleTimestamp {
            index,
            micros: index as u64 * interval,
        })
        .collect())
}

/// Plan the samples for a request mode.
///
/// # Errors
///
/// See [`evenly_spaced`].
pub fn plan(
    mode: &ThumbnailMode,
    duration_micros: u64,
) -> Result<Vec<SampleTimestamp>, ThumbnailError> {
    match mode {
        ThumbnailMode::Image(options) => Ok(still(options.time_micros())),
        ThumbnailMode::Gif(options) => evenly_spaced(duration_micros, options.frame_count),
    }
}
