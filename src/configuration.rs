//! Thumbnailer configuration.
//!
//! [`ThumbnailerOptions`] is a builder for the process-wide resources a
//! [`Thumbnailer`](crate::Thumbnailer) owns: the decode worker pool, the
//! HTTP client used for remote sources, the on-disk cache, and the bundled
//! asset store.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use vidthumb::ThumbnailerOptions;
//!
//! let options = ThumbnailerOptions::new()
//!     .with_worker_threads(4)
//!     .with_cache_dir("/tmp/thumbs")
//!     .with_download_timeout(Duration::from_secs(30));
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::progress::{NoOpProgress, ProgressCallback};
use crate::source::{AssetStore, DirectoryAssets};

/// Name of the cache directory created under the system temp dir.
const DEFAULT_CACHE_DIRECTORY: &str = "vidthumb";

/// Settings for a [`Thumbnailer`](crate::Thumbnailer).
///
/// All fields have sensible defaults: one worker per available CPU, a cache
/// under the system temp directory, no asset store, no download timeout,
/// and parallel frame acquisition.
#[derive(Clone)]
pub struct ThumbnailerOptions {
    pub(crate) worker_threads: usize,
    pub(crate) cache_dir: PathBuf,
    pub(crate) assets: Option<Arc<dyn AssetStore>>,
    pub(crate) download_timeout: Option<Duration>,
    pub(crate) parallel_acquisition: bool,
    pub(crate) progress: Arc<dyn ProgressCallback>,
}

impl Debug for ThumbnailerOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ThumbnailerOptions")
            .field("worker_threads", &self.worker_threads)
            .field("cache_dir", &self.cache_dir)
            .field("has_assets", &self.assets.is_some())
            .field("download_timeout", &self.download_timeout)
            .field("parallel_acquisition", &self.parallel_acquisition)
            .finish()
    }
}

impl Default for ThumbnailerOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ThumbnailerOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            worker_threads: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            cache_dir: std::env::temp_dir().join(DEFAULT_CACHE_DIRECTORY),
            assets: None,
            download_timeout: None,
            parallel_acquisition: true,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Set the size of the decode worker pool. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.max(1);
        self
    }

    /// Set the directory used for extracted assets and downloads.
    #[must_use]
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Serve `assets/...` locators from files under `root`.
    #[must_use]
    pub fn with_asset_root(self, root: impl Into<PathBuf>) -> Self {
        self.with_asset_store(Arc::new(DirectoryAssets::new(root)))
    }

    /// Serve `assets/...` locators from a custom store.
    #[must_use]
    pub fn with_asset_store(mut self, store: Arc<dyn AssetStore>) -> Self {
        self.assets = Some(store);
        self
    }

    /// Give up on a download after `timeout`.
    #[must_use]
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = Some(timeout);
        self
    }

    /// Decode GIF frames on the worker pool (`true`, the default) or one at
    /// a time on the encoding thread (`false`).
    #[must_use]
    pub fn with_parallel_acquisition(mut self, parallel: bool) -> Self {
        self.parallel_acquisition = parallel;
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Configured worker pool size.
    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    /// Configured cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}
