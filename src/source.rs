//! Source resolution.
//!
//! [`SourceResolver`] turns a [`VideoLocator`] into a local, seekable file:
//!
//! - local paths pass through after an existence check;
//! - bundled assets are extracted once into the cache directory and reused;
//! - remote URLs are downloaded into a uniquely named temporary file that is
//!   deleted when the returned [`ResolvedSource`] is dropped.
//!
//! No retries happen here. Any failure is reported as
//! [`ThumbnailError::SourceUnavailable`].

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use reqwest::Client;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

use crate::error::ThumbnailError;
use crate::request::VideoLocator;

/// Subdirectory of the cache holding extracted assets.
const ASSET_CACHE_DIRECTORY: &str = "assets";
/// Subdirectory of the cache holding in-flight downloads.
const DOWNLOAD_DIRECTORY: &str = "downloads";

/// Read access to bundled assets.
///
/// Implementations must be safe to call from several threads at once.
pub trait AssetStore: Send + Sync {
    /// Open the asset at `asset_path` (relative, prefix already stripped).
    fn open(&self, asset_path: &str) -> io::Result<Box<dyn Read + Send>>;
}

/// Assets laid out as plain files under a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    /// Serve assets from files under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetStore for DirectoryAssets {
    fn open(&self, asset_path: &str) -> io::Result<Box<dyn Read + Send>> {
        let file = File::open(self.root.join(asset_path))?;
        Ok(Box::new(file))
    }
}

/// A video available as a local file.
///
/// When the file was downloaded it is temporary and is deleted when this
/// value is dropped or [`release`](ResolvedSource::release)d.
pub struct ResolvedSource {
    path: PathBuf,
    temporary: Option<TempPath>,
}

impl Debug for ResolvedSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ResolvedSource")
            .field("path", &self.path)
            .field("temporary", &self.temporary.is_some())
            .finish()
    }
}

impl ResolvedSource {
    /// Path to the local file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file is a download that will be deleted on release.
    pub fn is_temporary(&self) -> bool {
        self.temporary.is_some()
    }

    /// Delete the file now if it is temporary, logging any failure.
    pub fn release(mut self) {
        if let Some(temporary) = self.temporary.take() {
            let path = temporary.to_path_buf();
            match temporary.close() {
                Ok(()) => log::debug!("Removed temporary download {}", path.display()),
                Err(error) => log::warn!(
                    "Failed to remove temporary download {}: {error}",
                    path.display()
                ),
            }
        }
    }
}

/// Resolves video locators to local files.
#[derive(Clone)]
pub struct SourceResolver {
    client: Client,
    cache_dir: PathBuf,
    assets: Option<Arc<dyn AssetStore>>,
}

impl Debug for SourceResolver {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SourceResolver")
            .field("cache_dir", &self.cache_dir)
            .field("has_assets", &self.assets.is_some())
            .finish_non_exhaustive()
    }
}

impl SourceResolver {
    /// Create a resolver that downloads with `client` and caches under `cache_dir`.
    pub fn new(
        client: Client,
        cache_dir: impl Into<PathBuf>,
        assets: Option<Arc<dyn AssetStore>>,
    ) -> Self {
        Self {
            client,
            cache_dir: cache_dir.into(),
            assets,
        }
    }

    /// Root of the on-disk cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Resolve `locator` to a local file.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError::SourceUnavailable`] if a local file does
    /// not exist, an asset cannot be extracted, or a download fails (network
    /// error, non-2xx status, or write failure).
    pub async fn resolve(&self, locator: &VideoLocator) -> Result<ResolvedSource, ThumbnailError> {
        log::debug!("Resolving video source {locator}");
        match locator {
            VideoLocator::LocalPath(path) => self.resolve_local(path, locator).await,
            VideoLocator::AssetPath(asset) => self.resolve_asset(asset, locator).await,
            VideoLocator::RemoteUrl(url) => self.download(url).await,
        }
    }

    async fn resolve_local(
        &self,
        path: &Path,
        locator: &VideoLocator,
    ) -> Result<ResolvedSource, ThumbnailError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|error| ThumbnailError::source_unavailable(&locator.to_string(), error))?;
        if !metadata.is_file() {
            return Err(ThumbnailError::source_unavailable(
                &locator.to_string(),
                "not a regular file",
            ));
        }
        Ok(ResolvedSource {
            path: path.to_path_buf(),
            temporary: None,
        })
    }

    async fn resolve_asset(
        &self,
        asset: &str,
        locator: &VideoLocator,
    ) -> Result<ResolvedSource, ThumbnailError> {
        let Some(store) = self.assets.clone() else {
            return Err(ThumbnailError::source_unavailable(
                &locator.to_string(),
                "no asset store configured",
            ));
        };
        let cache_dir = self.cache_dir.clone();
        let asset_path = asset.to_string();

        let path = tokio::task::spawn_blocking(move || {
            extract_asset(store.as_ref(), &cache_dir, &asset_path)
        })
        .await
        .map_err(|error| ThumbnailError::source_unavailable(&locator.to_string(), error))??;

        Ok(ResolvedSource {
            path,
            temporary: None,
        })
    }

    async fn download(&self, url: &str) -> Result<ResolvedSource, ThumbnailError> {
        let unavailable = |reason: String| ThumbnailError::source_unavailable(url, reason);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| unavailable(format!("request failed: {error}")))?;
        let mut response = response
            .error_for_status()
            .map_err(|error| unavailable(format!("bad response: {error}")))?;

        let directory = self.cache_dir.join(DOWNLOAD_DIRECTORY);
        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|error| unavailable(format!("cannot create {}: {error}", directory.display())))?;

        let suffix = format!(".{}", url_extension(url).unwrap_or("mp4"));
        let temporary = tempfile::Builder::new()
            .prefix("temp_video")
            .suffix(&suffix)
            .tempfile_in(&directory)
            .map_err(|error| unavailable(format!("cannot create temporary file: {error}")))?;
        let (file, temporary_path) = temporary.into_parts();
        let mut file = tokio::fs::File::from_std(file);

        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|error| unavailable(format!("download interrupted: {error}")))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|error| unavailable(format!("write failed: {error}")))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|error| unavailable(format!("write failed: {error}")))?;
        drop(file);

        log::debug!(
            "Downloaded {written} bytes from {url} to {}",
            temporary_path.display()
        );
        Ok(ResolvedSource {
            path: temporary_path.to_path_buf(),
            temporary: Some(temporary_path),
        })
    }
}

/// Extract `asset_path` from `store` into `cache_dir`, once.
///
/// Returns the cached copy if it already exists. Otherwise the asset is
/// copied into a temporary sibling and renamed into place, so concurrent
/// extractions of the same asset never expose a partial file (the last
/// rename wins, and every writer produced identical bytes).
///
/// # Errors
///
/// Returns [`ThumbnailError::SourceUnavailable`] for paths that escape the
/// cache, missing assets, or write failures.
pub fn extract_asset(
    store: &dyn AssetStore,
    cache_dir: &Path,
    asset_path: &str,
) -> Result<PathBuf, ThumbnailError> {
    let locator = format!("{}{asset_path}", crate::request::ASSET_PREFIX);
    let relative = Path::new(asset_path);
    if relative
        .components()
        .any(|component| !matches!(component, Component::Normal(_)))
    {
        return Err(ThumbnailError::source_unavailable(
            &locator,
            "asset path must be relative and must not contain '..'",
        ));
    }

    let cached = cache_dir.join(ASSET_CACHE_DIRECTORY).join(relative);
    if cached.is_file() {
        log::debug!("Reusing cached asset {}", cached.display());
        return Ok(cached);
    }

    let unavailable = |reason: String| ThumbnailError::source_unavailable(&locator, reason);
    let directory = cached
        .parent()
        .ok_or_else(|| unavailable("asset path has no parent directory".to_string()))?;
    fs::create_dir_all(directory)
        .map_err(|error| unavailable(format!("cannot create {}: {error}", directory.display())))?;

    let mut reader = store
        .open(asset_path)
        .map_err(|error| unavailable(format!("cannot open asset: {error}")))?;
    let mut temporary = tempfile::Builder::new()
        .prefix(".asset-")
        .tempfile_in(directory)
        .map_err(|error| unavailable(format!("cannot create temporary file: {error}")))?;
    io::copy(&mut reader, &mut temporary)
        .map_err(|error| unavailable(format!("cannot extract asset: {error}")))?;
    temporary
        .persist(&cached)
        .map_err(|error| unavailable(format!("cannot store asset: {}", error.error)))?;

    log::debug!("Extracted asset {asset_path} to {}", cached.display());
    Ok(cached)
}

/// Extension of the last path segment of `url`, if it looks like one.
fn url_extension(url: &str) -> Option<&str> {
    let without_query = url.split(['?', '#']).next()?;
    let segment = without_query.rsplit('/').next()?;
    let (_, extension) = segment.rsplit_once('.')?;
    let plausible = !extension.is_empty()
        && extension.len() <= 5
        && extension.chars().all(|c| c.is_ascii_alphanumeric());
    plausible.then_some(extension)
}
