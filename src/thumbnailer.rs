//! Core [`Thumbnailer`] implementation.
//!
//! `Thumbnailer` is the main entry point for the crate. It owns the
//! process-wide resources (decode worker pool, HTTP client, asset cache) and
//! runs each [`ThumbnailRequest`] through the pipeline:
//!
//! ```text
//! validate ─► resolve ─► sample ─► acquire + resize ─► encode ─► done
//! ```
//!
//! Each stage can short-circuit with an error. Resolution is async; every
//! later stage runs on a blocking thread so the caller's task is never
//! blocked on decoding or encoding.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use serde_json::{Value, json};

use crate::acquire::FrameAcquirer;
use crate::configuration::ThumbnailerOptions;
use crate::error::{ErrorCode, ThumbnailError};
use crate::gif::{GifOptions, GifSession};
use crate::parallel::{TargetSize, acquire_ordered, acquire_sequential};
use crate::progress::{OperationType, ProgressCallback, ProgressTracker};
use crate::request::{MAX_STILL_DIMENSION, ThumbnailMode, ThumbnailRequest};
use crate::resize::{ResizedFrame, resize, resolve_dimensions};
use crate::sampler;
use crate::source::SourceResolver;
use crate::still::{self, ImageOptions};

/// Outcome of one thumbnail request. Produced once and never mutated.
///
/// An animated GIF that lost some (but not all) of its frames to decode
/// failures is still a success; [`is_partial`](ThumbnailResult::is_partial)
/// reports it and [`skipped_frames`](ThumbnailResult::skipped_frames) lists
/// the slots that were dropped.
#[derive(Debug)]
pub struct ThumbnailResult {
    output_path: Option<PathBuf>,
    error: Option<ThumbnailError>,
    frames_requested: usize,
    frames_written: usize,
    skipped_frames: Vec<usize>,
}

impl ThumbnailResult {
    fn succeeded(output_path: PathBuf, report: EncodeReport) -> Self {
        Self {
            output_path: Some(output_path),
            error: None,
            frames_requested: report.frames_requested,
            frames_written: report.frames_written,
            skipped_frames: report.skipped_frames,
        }
    }

    fn failed(error: ThumbnailError) -> Self {
        Self {
            output_path: None,
            error: Some(error),
            frames_requested: 0,
            frames_written: 0,
            skipped_frames: Vec::new(),
        }
    }

    /// Whether the output file was written.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Whether the job succeeded with one or more frames skipped.
    pub fn is_partial(&self) -> bool {
        self.is_success() && !self.skipped_frames.is_empty()
    }

    /// Path of the written file, on success.
    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&ThumbnailError> {
        self.error.as_ref()
    }

    /// Machine-readable failure classification, if any.
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(ThumbnailError::code)
    }

    /// Number of sample slots planned.
    pub fn frames_requested(&self) -> usize {
        self.frames_requested
    }

    /// Number of frames that made it into the output.
    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Slots that produced no frame, in slot order.
    pub fn skipped_frames(&self) -> &[usize] {
        &self.skipped_frames
    }

    /// Convert into a plain `Result` carrying the output path.
    pub fn into_result(self) -> Result<PathBuf, ThumbnailError> {
        match (self.error, self.output_path) {
            (Some(error), _) => Err(error),
            (None, Some(path)) => Ok(path),
            (None, None) => Err(ThumbnailError::EncodeFailed(
                "no output path recorded".to_string(),
            )),
        }
    }

    /// Render the result for the command layer.
    ///
    /// Success: `{"success": true, "path": ..., "framesRequested": ...,
    /// "framesWritten": ..., "skippedFrames": [...]}`.
    /// Failure: `{"success": false, "error": {"code": ..., "message": ...}}`.
    pub fn to_json(&self) -> Value {
        match &self.error {
            None => json!({
                "success": true,
                "path": self.output_path.as_ref().map(|path| path.display().to_string()),
                "framesRequested": self.frames_requested,
                "framesWritten": self.frames_written,
                "skippedFrames": self.skipped_frames,
            }),
            Some(error) => json!({
                "success": false,
                "error": {
                    "code": error.code().as_str(),
                    "message": error.to_string(),
                },
            }),
        }
    }
}

/// What the encoding stage produced.
#[derive(Debug)]
struct EncodeReport {
    frames_requested: usize,
    frames_written: usize,
    skipped_frames: Vec<usize>,
}

/// Runs thumbnail requests against one decoder backend.
///
/// Cheap to share behind an `Arc`; concurrent requests share the worker
/// pool and HTTP client but never an encoding session.
///
/// # Example
///
/// ```no_run
/// # #[cfg(feature = "ffmpeg")]
/// # async fn example() -> Result<(), vidthumb::ThumbnailError> {
/// use vidthumb::{ThumbnailRequest, Thumbnailer, ThumbnailerOptions};
///
/// let thumbnailer = Thumbnailer::with_ffmpeg(ThumbnailerOptions::new())?;
/// let request = ThumbnailRequest::gif("input.mp4", "preview.gif")
///     .with_width(320)
///     .with_frame_count(5)
///     .with_delay_ms(200);
/// let result = thumbnailer.generate(request).await;
/// println!("{}", result.to_json());
/// # Ok(())
/// # }
/// ```
pub struct Thumbnailer {
    acquirer: Arc<dyn FrameAcquirer>,
    resolver: SourceResolver,
    pool: Arc<ThreadPool>,
    options: ThumbnailerOptions,
}

impl Debug for Thumbnailer {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Thumbnailer")
            .field("resolver", &self.resolver)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Thumbnailer {
    /// Build a thumbnailer around `acquirer`.
    ///
    /// Starts the worker pool and the HTTP client. Both live as long as the
    /// returned value.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::IoError`] if the worker pool or HTTP client
    /// cannot be created.
    pub fn new(
        acquirer: Arc<dyn FrameAcquirer>,
        options: ThumbnailerOptions,
    ) -> Result<Self, ThumbnailError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(options.worker_threads)
            .thread_name(|index| format!("vidthumb-decode-{index}"))
            .build()
            .map_err(|error| io::Error::other(format!("Failed to start worker pool: {error}")))?;

        let mut client = reqwest::Client::builder();
        if let Some(timeout) = options.download_timeout {
            client = client.timeout(timeout);
        }
        let client = client
            .build()
            .map_err(|error| io::Error::other(format!("Failed to build HTTP client: {error}")))?;

        let resolver = SourceResolver::new(client, options.cache_dir.clone(), options.assets.clone());
        log::debug!(
            "Thumbnailer ready ({} worker threads, cache at {})",
            options.worker_threads,
            options.cache_dir.display()
        );

        Ok(Self {
            acquirer,
            resolver,
            pool: Arc::new(pool),
            options,
        })
    }

    /// Build a thumbnailer backed by FFmpeg.
    ///
    /// # Errors
    ///
    /// Fails if FFmpeg cannot be initialised, or as [`Thumbnailer::new`].
    #[cfg(feature = "ffmpeg")]
    pub fn with_ffmpeg(options: ThumbnailerOptions) -> Result<Self, ThumbnailError> {
        let acquirer = crate::ffmpeg::FfmpegAcquirer::new()?;
        Self::new(Arc::new(acquirer), options)
    }

    /// The options this thumbnailer was built with.
    pub fn options(&self) -> &ThumbnailerOptions {
        &self.options
    }

    /// The resolver used for video locators.
    pub fn resolver(&self) -> &SourceResolver {
        &self.resolver
    }

    /// Run one request to completion.
    ///
    /// Never panics and never returns early: every failure is folded into
    /// the returned [`ThumbnailResult`]. Temporary downloads and partial
    /// output files are removed before this resolves.
    pub async fn generate(&self, request: ThumbnailRequest) -> ThumbnailResult {
        let output_path = request.output_path.clone();
        match self.run(request).await {
            Ok(report) => {
                if report.skipped_frames.is_empty() {
                    log::info!("Wrote thumbnail {}", output_path.display());
                } else {
                    log::warn!(
                        "Wrote {} with {} of {} frame(s); skipped slots {:?}",
                        output_path.display(),
                        report.frames_written,
                        report.frames_requested,
                        report.skipped_frames
                    );
                }
                ThumbnailResult::succeeded(output_path, report)
            }
            Err(error) => {
                log::warn!(
                    "Thumbnail for {} failed [{}]: {error}",
                    output_path.display(),
                    error.code()
                );
                ThumbnailResult::failed(error)
            }
        }
    }

    async fn run(&self, request: ThumbnailRequest) -> Result<EncodeReport, ThumbnailError> {
        request.validate()?;
        let source = self.resolver.resolve(&request.source).await?;

        let job = EncodeJob {
            acquirer: Arc::clone(&self.acquirer),
            pool: Arc::clone(&self.pool),
            parallel: self.options.parallel_acquisition,
            progress: Arc::clone(&self.options.progress),
        };

        tokio::task::spawn_blocking(move || {
            let report = job.run(source.path(), &request);
            source.release();
            report
        })
        .await
        .map_err(|error| ThumbnailError::DecodeFailed(format!("Encoding task failed: {error}")))?
    }
}

/// Everything the blocking half of a job needs.
struct EncodeJob {
    acquirer: Arc<dyn FrameAcquirer>,
    pool: Arc<ThreadPool>,
    parallel: bool,
    progress: Arc<dyn ProgressCallback>,
}

impl EncodeJob {
    fn run(&self, source: &Path, request: &ThumbnailRequest) -> Result<EncodeReport, ThumbnailError> {
        let target = TargetSize {
            width: request.width,
            height: request.height,
        };
        match &request.mode {
            ThumbnailMode::Image(options) => {
                self.still(source, &request.output_path, target, options)
            }
            ThumbnailMode::Gif(options) => {
                self.animation(source, &request.output_path, target, options)
            }
        }
    }

    fn still(
        &self,
        source: &Path,
        output_path: &Path,
        target: TargetSize,
        options: &ImageOptions,
    ) -> Result<EncodeReport, ThumbnailError> {
        let mut tracker =
            ProgressTracker::new(Arc::clone(&self.progress), OperationType::ThumbnailGeneration, 1);

        let frame = sampler::still(options.time_micros())
            .into_iter()
            .next()
            .and_then(|sample| self.acquirer.acquire(source, sample));
        let frame = frame.ok_or_else(|| {
            ThumbnailError::DecodeFailed(format!(
                "No frame available at {}ms in {}",
                options.time_ms,
                source.display()
            ))
        })?;

        let (width, height) =
            resolve_dimensions(frame.width(), frame.height(), target.width, target.height);
        if width.max(height) > MAX_STILL_DIMENSION {
            return Err(ThumbnailError::InvalidArgument(format!(
                "Thumbnail of {width}x{height} exceeds the still limit of {MAX_STILL_DIMENSION} pixels"
            )));
        }
        let resized = resize(frame, Some(width), Some(height));
        still::save(&resized.image, output_path, options.format, options.quality)?;
        tracker.advance(0, true);

        Ok(EncodeReport {
            frames_requested: 1,
            frames_written: 1,
            skipped_frames: Vec::new(),
        })
    }

    fn animation(
        &self,
        source: &Path,
        output_path: &Path,
        target: TargetSize,
        options: &GifOptions,
    ) -> Result<EncodeReport, ThumbnailError> {
        let info = self.acquirer.probe(source)?;
        let samples = sampler::evenly_spaced(info.duration_micros, options.frame_count)?;
        log::debug!(
            "Sampling {} frame(s) from {} ({}us, {}x{})",
            samples.len(),
            source.display(),
            info.duration_micros,
            info.width,
            info.height
        );

        let (canvas_width, canvas_height) =
            resolve_dimensions(info.width, info.height, target.width, target.height);
        let canvas_width = gif_dimension(canvas_width)?;
        let canvas_height = gif_dimension(canvas_height)?;
        // Workers scale straight to the canvas so each frame is resized once.
        let target = TargetSize {
            width: Some(u32::from(canvas_width)),
            height: Some(u32::from(canvas_height)),
        };

        let temporary = still::temporary_sibling(output_path)?;
        let mut session = GifSession::open(
            BufWriter::new(temporary),
            canvas_width,
            canvas_height,
            samples.len(),
            options,
        )?;
        let mut tracker = ProgressTracker::new(
            Arc::clone(&self.progress),
            OperationType::GifExport,
            samples.len() as u64,
        );

        let commit = |index: usize, frame: Option<ResizedFrame>| -> Result<(), ThumbnailError> {
            let written = frame.is_some();
            match frame {
                Some(frame) => session.add_frame(frame)?,
                None => {
                    log::warn!("Skipping GIF slot {index}: no frame decoded");
                    session.skip(index)?;
                }
            }
            tracker.advance(index, written);
            Ok(())
        };
        let drained = if self.parallel {
            acquire_ordered(
                &self.pool,
                Arc::clone(&self.acquirer),
                source,
                &samples,
                target,
                commit,
            )
        } else {
            acquire_sequential(self.acquirer.as_ref(), source, &samples, target, commit)
        };
        if let Err(error) = drained {
            session.abort();
            return Err(error);
        }

        let writer = session.finalize()?;
        let frames_written = session.frames_written();
        let skipped_frames = session.skipped().to_vec();
        if frames_written == 0 {
            return Err(ThumbnailError::DecodeFailed(format!(
                "None of the {} requested frame(s) could be decoded from {}",
                samples.len(),
                source.display()
            )));
        }

        let temporary = writer.into_inner().map_err(|error| {
            ThumbnailError::EncodeFailed(format!("Failed to flush GIF output: {}", error.error()))
        })?;
        temporary
            .as_file()
            .sync_all()
            .map_err(|error| ThumbnailError::EncodeFailed(format!("Failed to sync GIF: {error}")))?;
        temporary.persist(output_path).map_err(|error| {
            ThumbnailError::EncodeFailed(format!(
                "Failed to move GIF into {}: {}",
                output_path.display(),
                error.error
            ))
        })?;

        Ok(EncodeReport {
            frames_requested: samples.len(),
            frames_written,
            skipped_frames,
        })
    }
}

fn gif_dimension(value: u32) -> Result<u16, ThumbnailError> {
    u16::try_from(value).map_err(|_| {
        ThumbnailError::EncodeFailed(format!(
            "GIF canvas dimension {value} exceeds {}",
            u16::MAX
        ))
    })
}
