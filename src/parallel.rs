//! Ordered frame acquisition.
//!
//! Decoding and resizing are independent per sample slot, so they run on
//! the rayon worker pool. The GIF encoder is a single writer that must see
//! slots in order, so completed slots are buffered here and handed to the
//! caller's `commit` closure only once every lower slot has been handed over.
//!
//! The public entry point is [`Thumbnailer`](crate::Thumbnailer); this
//! module contains only the scheduling.

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;

use rayon::ThreadPool;

use crate::acquire::FrameAcquirer;
use crate::error::ThumbnailError;
use crate::resize::{ResizedFrame, resize};
use crate::sampler::SampleTimestamp;

/// Target size forwarded to the resizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TargetSize {
    pub(crate) width: Option<u32>,
    pub(crate) height: Option<u32>,
}

/// Acquire and resize one slot, treating a decoder panic as a miss.
fn acquire_slot(
    acquirer: &dyn FrameAcquirer,
    source: &Path,
    sample: SampleTimestamp,
    target: TargetSize,
) -> Option<ResizedFrame> {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        acquirer
            .acquire(source, sample)
            .map(|frame| resize(frame, target.width, target.height))
    }));
    outcome.unwrap_or_else(|_| {
        log::warn!("Decoder panicked on slot {} at {}us", sample.index, sample.micros);
        None
    })
}

/// Decode every sample on `pool` and commit results in slot order.
///
/// `samples` must be indexed `0..samples.len()` in order. `commit` receives
/// each slot exactly once, with `None` for slots that produced no frame.
/// An error from `commit` stops draining immediately; workers still in
/// flight finish on their own and their results are discarded.
pub(crate) fn acquire_ordered<F>(
    pool: &ThreadPool,
    acquirer: Arc<dyn FrameAcquirer>,
    source: &Path,
    samples: &[SampleTimestamp],
    target: TargetSize,
    mut commit: F,
) -> Result<(), ThumbnailError>
where
    F: FnMut(usize, Option<ResizedFrame>) -> Result<(), ThumbnailError>,
{
    let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();

    for &sample in samples {
        let sender = sender.clone();
        let acquirer = Arc::clone(&acquirer);
        let source = source.to_path_buf();
        pool.spawn(move || {
            let frame = acquire_slot(acquirer.as_ref(), &source, sample, target);
            // The receiver is gone if the job already failed.
            let _ = sender.send((sample.index, frame));
        });
    }
    drop(sender);

    let mut pending: BTreeMap<usize, Option<ResizedFrame>> = BTreeMap::new();
    let mut next = 0;
    while next < samples.len() {
        let Some((index, frame)) = receiver.blocking_recv() else {
            break;
        };
        pending.insert(index, frame);
        while let Some(frame) = pending.remove(&next) {
            commit(next, frame)?;
            next += 1;
        }
    }

    // Only reachable if a worker vanished without reporting.
    while next < samples.len() {
        log::warn!("Slot {next} never reported back; skipping it");
        commit(next, None)?;
        next += 1;
    }
    Ok(())
}

/// Decode every sample one at a time on the calling thread.
pub(crate) fn acquire_sequential<F>(
    acquirer: &dyn FrameAcquirer,
    source: &Path,
    samples: &[SampleTimestamp],
    target: TargetSize,
    mut commit: F,
) -> Result<(), ThumbnailError>
where
    F: FnMut(usize, Option<ResizedFrame>) -> Result<(), ThumbnailError>,
{
    for &sample in samples {
        let frame = acquire_slot(acquirer, source, sample, target);
        commit(sample.index, frame)?;
    }
    Ok(())
}
