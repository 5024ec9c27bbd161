//! Shared test helpers: an in-process decoder that paints gradient frames.

#![allow(dead_code)]

use std::collections::HashSet;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use image::{DynamicImage, Rgb, RgbImage};
use vidthumb::{FrameAcquirer, SourceInfo, ThumbnailError, Thumbnailer, ThumbnailerOptions};

/// Decoder double. Every timestamp yields a gradient frame unless it is
/// listed in `missing` (returns no frame), `failing` (returns an error) or
/// `panicking`.
#[derive(Debug)]
pub struct SyntheticAcquirer {
    pub duration_micros: u64,
    pub width: u32,
    pub height: u32,
    /// Decoded frame size when it differs from what `probe` reports.
    pub frame_size: Option<(u32, u32)>,
    /// Latency of the frame at timestamp 0; later frames decode faster.
    pub slowest_decode: Option<Duration>,
    pub missing: HashSet<u64>,
    pub failing: HashSet<u64>,
    pub panicking: HashSet<u64>,
    probes: AtomicUsize,
    decodes: AtomicUsize,
    completed: Mutex<Vec<u64>>,
}

impl SyntheticAcquirer {
    pub fn new(duration_micros: u64, width: u32, height: u32) -> Self {
        Self {
            duration_micros,
            width,
            height,
            frame_size: None,
            slowest_decode: None,
            missing: HashSet::new(),
            failing: HashSet::new(),
            panicking: HashSet::new(),
            probes: AtomicUsize::new(0),
            decodes: AtomicUsize::new(0),
            completed: Mutex::new(Vec::new()),
        }
    }

    /// Ten seconds of 640x360 video.
    pub fn ten_seconds() -> Self {
        Self::new(10_000_000, 640, 360)
    }

    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = Some((width, height));
        self
    }

    /// Make earlier timestamps take longer so workers finish in reverse order.
    pub fn with_reverse_latency(mut self, slowest: Duration) -> Self {
        self.slowest_decode = Some(slowest);
        self
    }

    pub fn with_missing(mut self, timestamps: &[u64]) -> Self {
        self.missing.extend(timestamps);
        self
    }

    pub fn with_failing(mut self, timestamps: &[u64]) -> Self {
        self.failing.extend(timestamps);
        self
    }

    pub fn with_panicking(mut self, timestamps: &[u64]) -> Self {
        self.panicking.extend(timestamps);
        self
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }

    /// Timestamps in the order their decodes finished.
    pub fn completion_order(&self) -> Vec<u64> {
        self.completed.lock().unwrap().clone()
    }
}

impl FrameAcquirer for SyntheticAcquirer {
    fn probe(&self, _source: &Path) -> Result<SourceInfo, ThumbnailError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(SourceInfo {
            duration_micros: self.duration_micros,
            width: self.width,
            height: self.height,
        })
    }

    fn frame_at(
        &self,
        _source: &Path,
        timestamp_micros: u64,
    ) -> Result<Option<DynamicImage>, ThumbnailError> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        if let Some(slowest) = self.slowest_decode {
            let remaining = self.duration_micros.saturating_sub(timestamp_micros);
            let fraction = remaining as f64 / self.duration_micros.max(1) as f64;
            std::thread::sleep(slowest.mul_f64(fraction));
        }
        if self.panicking.contains(&timestamp_micros) {
            panic!("synthetic decoder panic at {timestamp_micros}us");
        }
        if self.failing.contains(&timestamp_micros) {
            return Err(ThumbnailError::DecodeFailed(format!(
                "synthetic failure at {timestamp_micros}us"
            )));
        }
        if self.missing.contains(&timestamp_micros) {
            return Ok(None);
        }
        let (width, height) = self.frame_size.unwrap_or((self.width, self.height));
        let frame = gradient(width, height, timestamp_micros);
        self.completed.lock().unwrap().push(timestamp_micros);
        Ok(Some(frame))
    }
}

/// A horizontal/vertical gradient whose blue channel encodes the timestamp.
pub fn gradient(width: u32, height: u32, timestamp_micros: u64) -> DynamicImage {
    let blue = ((timestamp_micros / 1_000_000) % 256) as u8;
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            blue,
        ])
    });
    DynamicImage::ImageRgb8(image)
}

/// A thumbnailer over `acquirer` with its cache inside `cache_dir`.
pub fn thumbnailer(acquirer: Arc<SyntheticAcquirer>, cache_dir: &Path) -> Thumbnailer {
    thumbnailer_with(acquirer, ThumbnailerOptions::new().with_cache_dir(cache_dir))
}

pub fn thumbnailer_with(
    acquirer: Arc<SyntheticAcquirer>,
    options: ThumbnailerOptions,
) -> Thumbnailer {
    Thumbnailer::new(acquirer, options).expect("thumbnailer")
}

/// Create an empty placeholder video file; the synthetic decoder never reads it.
pub fn placeholder_video(directory: &Path, name: &str) -> std::path::PathBuf {
    let path = directory.join(name);
    std::fs::write(&path, b"not really a video").expect("write placeholder");
    path
}

/// Answer one HTTP request on a loopback port with `status` and `body`.
///
/// Returns the URL of `path` on that server.
pub fn serve_once(status: &str, body: &'static [u8], path: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let address = listener.local_addr().expect("local address");
    let status = status.to_string();
    std::thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut request = Vec::new();
        let mut buffer = [0u8; 1024];
        while !request.windows(4).any(|window| window == b"\r\n\r\n") {
            match stream.read(&mut buffer) {
                Ok(0) | Err(_) => break,
                Ok(read) => request.extend_from_slice(&buffer[..read]),
            }
        }
        let header = format!(
            "HTTP/1.1 {status}\r\nContent-Type: video/mp4\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let _ = stream.write_all(header.as_bytes());
        let _ = stream.write_all(body);
        let _ = stream.flush();
    });
    format!("http://{address}{path}")
}
