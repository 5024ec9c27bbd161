//! Animated GIF encoding.
//!
//! [`GifSession`] is a strictly sequential, single-writer encoding session.
//! It writes the container header when opened, then accepts one frame (or
//! an explicit skip) per sample slot in increasing slot order, and writes
//! the trailer when finalized.
//!
//! ```text
//! open ──► Accepting(0) ──add/skip──► Accepting(1) ─ ··· ─► finalize ──► Finalized
//!                │                          │
//!                └──── I/O failure ─────────┴────────────────────────► Aborted
//! ```
//!
//! A skipped slot shortens the animation by one frame; nothing is
//! duplicated in its place.
//!
//! # Example
//!
//! ```
//! use vidthumb::{GifOptions, GifSession};
//!
//! let options = GifOptions::new().with_delay_ms(200);
//! let mut session = GifSession::open(Vec::new(), 32, 18, 2, &options)?;
//! session.skip(0)?;
//! session.skip(1)?;
//! let bytes = session.finalize()?;
//! assert!(bytes.starts_with(b"GIF89a"));
//! # Ok::<(), vidthumb::ThumbnailError>(())
//! ```

use std::io::Write;

use gif::{Encoder, Frame, Repeat};

use crate::error::ThumbnailError;
use crate::resize::{ResizedFrame, resize_to};

/// Quantizer speed passed to the `gif` crate (1 = best, 30 = fastest).
const QUANTIZER_SPEED: i32 = 10;

/// Configuration for animated GIF thumbnails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GifOptions {
    /// How many evenly spaced frames to sample (default: 10).
    pub frame_count: u32,
    /// Delay between frames in milliseconds (default: 100).
    pub delay_ms: u32,
    /// Loop count. `0` loops forever (default), a positive value loops that
    /// many times, a negative value plays once.
    pub repeat: i32,
}

impl Default for GifOptions {
    fn default() -> Self {
        Self {
            frame_count: 10,
            delay_ms: 100,
            repeat: 0,
        }
    }
}

impl GifOptions {
    /// Create a new [`GifOptions`] with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of frames to sample.
    pub fn with_frame_count(mut self, frame_count: u32) -> Self {
        self.frame_count = frame_count;
        self
    }

    /// Set the delay between frames in milliseconds.
    pub fn with_delay_ms(mut self, delay_ms: u32) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Set the loop count.
    pub fn with_repeat(mut self, repeat: i32) -> Self {
        self.repeat = repeat;
        self
    }

    /// Frame delay in the GIF's native unit (hundredths of a second),
    /// rounded to nearest.
    pub fn delay_centiseconds(&self) -> u16 {
        let centiseconds = (self.delay_ms as u64 + 5) / 10;
        u16::try_from(centiseconds).unwrap_or(u16::MAX)
    }

    /// The loop extension to write, or `None` to omit it (play once).
    pub(crate) fn repeat_mode(&self) -> Option<Repeat> {
        match self.repeat {
            0 => Some(Repeat::Infinite),
            count if count > 0 => Some(Repeat::Finite(
                u16::try_from(count).unwrap_or(u16::MAX),
            )),
            _ => None,
        }
    }
}

/// Lifecycle of a [`GifSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Every slot below the carried index has been committed or skipped.
    Accepting(usize),
    /// The trailer has been written.
    Finalized,
    /// An I/O failure ended the session. The destination is not usable.
    Aborted,
}

/// A sequential animated-GIF encoding session.
pub struct GifSession<W: Write> {
    encoder: Option<Encoder<W>>,
    state: SessionState,
    width: u16,
    height: u16,
    slot_count: usize,
    delay: u16,
    frames_written: usize,
    skipped: Vec<usize>,
}

impl<W: Write> GifSession<W> {
    /// Open a session over `destination` with a `width` x `height` canvas
    /// and `slot_count` sample slots.
    ///
    /// Writes the GIF header, logical screen descriptor, and (unless the
    /// options ask for a single play) the loop extension.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::EncodeFailed`] if the header cannot be
    /// written.
    pub fn open(
        destination: W,
        width: u16,
        height: u16,
        slot_count: usize,
        options: &GifOptions,
    ) -> Result<Self, ThumbnailError> {
        let width = width.max(1);
        let height = height.max(1);
        log::debug!(
            "Opening GIF session {}x{} ({} slots, delay={}ms, repeat={})",
            width,
            height,
            slot_count,
            options.delay_ms,
            options.repeat
        );

        let mut encoder = Encoder::new(destination, width, height, &[]).map_err(|e| {
            ThumbnailError::EncodeFailed(format!("Failed to create GIF encoder: {e}"))
        })?;
        if let Some(repeat) = options.repeat_mode() {
            encoder.set_repeat(repeat).map_err(|e| {
                ThumbnailError::EncodeFailed(format!("Failed to set GIF repeat: {e}"))
            })?;
        }

        Ok(Self {
            encoder: Some(encoder),
            state: SessionState::Accepting(0),
            width,
            height,
            slot_count,
            delay: options.delay_centiseconds(),
            frames_written: 0,
            skipped: Vec::new(),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Canvas size as `(width, height)`.
    pub fn dimensions(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Number of frames actually written so far.
    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Slots that produced no frame, in slot order.
    pub fn skipped(&self) -> &[usize] {
        &self.skipped
    }

    /// Append the frame for the next slot.
    ///
    /// A frame whose size differs from the canvas is scaled to fit it.
    ///
    /// # Errors
    ///
    /// - [`ThumbnailError::SessionClosed`] after finalize or abort.
    /// - [`ThumbnailError::FrameOutOfOrder`] if `frame.index` is not the next slot.
    /// - [`ThumbnailError::EncodeFailed`] if writing fails; the session is
    ///   then [`Aborted`](SessionState::Aborted).
    pub fn add_frame(&mut self, frame: ResizedFrame) -> Result<(), ThumbnailError> {
        let next = self.expect_slot(frame.index)?;

        let image = resize_to(frame.image, self.width as u32, self.height as u32);
        let mut pixels = image.into_rgba8().into_raw();
        let mut gif_frame =
            Frame::from_rgba_speed(self.width, self.height, &mut pixels, QUANTIZER_SPEED);
        gif_frame.delay = self.delay;

        let encoder = self.encoder.as_mut().ok_or(ThumbnailError::SessionClosed)?;
        if let Err(error) = encoder.write_frame(&gif_frame) {
            self.abort();
            return Err(ThumbnailError::EncodeFailed(format!(
                "Failed to write GIF frame {next}: {error}"
            )));
        }

        self.frames_written += 1;
        self.state = SessionState::Accepting(next + 1);
        Ok(())
    }

    /// Advance past `index` without writing a frame.
    ///
    /// # Errors
    ///
    /// Same ordering and state errors as [`add_frame`](GifSession::add_frame).
    pub fn skip(&mut self, index: usize) -> Result<(), ThumbnailError> {
        let next = self.expect_slot(index)?;
        self.skipped.push(next);
        self.state = SessionState::Accepting(next + 1);
        Ok(())
    }

    /// Drop the encoder without writing a trailer.
    pub fn abort(&mut self) {
        if self.state != SessionState::Finalized {
            self.encoder = None;
            self.state = SessionState::Aborted;
        }
    }

    /// Write the trailer and hand back the destination.
    ///
    /// Slots that were never visited are recorded as skipped. A session with
    /// no frames still produces a structurally valid, empty GIF.
    ///
    /// # Errors
    ///
    /// - [`ThumbnailError::SessionClosed`] if already finalized or aborted.
    /// - [`ThumbnailError::EncodeFailed`] if the trailer cannot be written;
    ///   the session is then aborted.
    pub fn finalize(&mut self) -> Result<W, ThumbnailError> {
        let SessionState::Accepting(next) = self.state else {
            return Err(ThumbnailError::SessionClosed);
        };
        let encoder = self.encoder.take().ok_or(ThumbnailError::SessionClosed)?;

        if next < self.slot_count {
            log::warn!(
                "Finalizing GIF with {} unvisited slot(s)",
                self.slot_count - next
            );
            self.skipped.extend(next..self.slot_count);
        }

        let mut writer = match encoder.into_inner() {
            Ok(writer) => writer,
            Err(error) => {
                self.state = SessionState::Aborted;
                return Err(ThumbnailError::EncodeFailed(format!(
                    "Failed to write GIF trailer: {error}"
                )));
            }
        };
        if let Err(error) = writer.flush() {
            self.state = SessionState::Aborted;
            return Err(ThumbnailError::EncodeFailed(format!(
                "Failed to flush GIF output: {error}"
            )));
        }

        self.state = SessionState::Finalized;
        log::debug!(
            "Finalized GIF: {} frame(s) written, {} skipped",
            self.frames_written,
            self.skipped.len()
        );
        Ok(writer)
    }

    fn expect_slot(&self, index: usize) -> Result<usize, ThumbnailError> {
        let SessionState::Accepting(next) = self.state else {
            return Err(ThumbnailError::SessionClosed);
        };
        if index != next || index >= self.slot_count {
            return Err(ThumbnailError::FrameOutOfOrder {
                expected: next,
                actual: index,
            });
        }
        Ok(next)
    }
}
