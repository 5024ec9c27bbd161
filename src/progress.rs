//! Progress reporting.
//!
//! A [`ProgressCallback`] attached through
//! [`ThumbnailerOptions::with_progress`](crate::ThumbnailerOptions::with_progress)
//! is told about every sample slot as it is committed to the encoder (or
//! skipped), in slot order.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use vidthumb::{ProgressCallback, ProgressInfo, ThumbnailerOptions};
//!
//! #[derive(Default)]
//! struct SkipCounter(AtomicUsize);
//!
//! impl ProgressCallback for SkipCounter {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if !info.frame_written {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//! }
//!
//! let options = ThumbnailerOptions::new().with_progress(Arc::new(SkipCounter::default()));
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

/// The kind of job being reported on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Producing a single still thumbnail.
    ThumbnailGeneration,
    /// Assembling an animated GIF.
    GifExport,
}

/// A snapshot of job progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of work is being performed.
    pub operation: OperationType,
    /// How many sample slots have been committed or skipped so far.
    pub current: u64,
    /// Total sample slots in the plan.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time since the job started encoding.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// The slot that was just handled.
    pub current_slot: Option<usize>,
    /// Whether that slot produced a frame.
    pub frame_written: bool,
}

/// Receives progress updates while a job runs.
///
/// Implementations must be [`Send`] and [`Sync`]: callbacks fire on the
/// blocking thread that drives the encoder, not on the caller's thread.
pub trait ProgressCallback: Send + Sync {
    /// Called once per handled sample slot.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. This is the default.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Tracks timing for one job and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: u64,
    current: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, operation: OperationType, total: u64) -> Self {
        Self {
            callback,
            operation,
            total,
            current: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one handled slot and fire the callback.
    pub(crate) fn advance(&mut self, slot: usize, frame_written: bool) {
        self.current += 1;
        let elapsed = self.start_time.elapsed();

        let percentage =
            (self.total > 0).then(|| (self.current as f32 / self.total as f32) * 100.0);
        let remaining = self.total.saturating_sub(self.current);
        let estimated_remaining = u32::try_from(remaining)
            .ok()
            .map(|remaining| (elapsed / self.current.max(1) as u32) * remaining);

        let info = ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: Some(self.total),
            percentage,
            elapsed,
            estimated_remaining,
            current_slot: Some(slot),
            frame_written,
        };
        self.callback.on_progress(&info);
    }
}
