//! Internal FFmpeg helpers.
//!
//! Pixel-data copying and time-base conversion shared by the FFmpeg
//! decoder backend.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Microseconds per second, FFmpeg's `AV_TIME_BASE`.
const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Copy plane 0 of a packed video frame into a tightly-packed buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × bpp);
/// the padding is stripped so the buffer can go straight into
/// [`image::RgbImage::from_raw`].
pub(crate) fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_length = (width as usize) * bytes_per_pixel;
    let data = video_frame.data(0);

    if stride == row_length {
        data[..row_length * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_length * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_length]);
        }
        buffer
    }
}

/// Rescale a stream-time-base duration to microseconds. Negative or
/// unknown durations become zero.
pub(crate) fn stream_duration_to_micros(duration: i64, time_base: Rational) -> u64 {
    if duration <= 0 || time_base.denominator() == 0 {
        return 0;
    }
    let seconds =
        duration as f64 * time_base.numerator() as f64 / time_base.denominator() as f64;
    (seconds * MICROS_PER_SECOND) as u64
}

/// Convert a sample offset to a container seek target.
///
/// `input_context.seek()` with no stream index expects `AV_TIME_BASE`
/// units, which are microseconds already.
pub(crate) fn micros_to_seek_timestamp(timestamp_micros: u64) -> i64 {
    i64::try_from(timestamp_micros).unwrap_or(i64::MAX)
}
