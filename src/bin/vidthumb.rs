use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use vidthumb::{
    FfmpegLogLevel, ImageFormat, ProgressCallback, ProgressInfo, ThumbnailRequest, Thumbnailer,
    ThumbnailerOptions,
};

const CLI_AFTER_HELP: &str = "Examples:\n  vidthumb image input.mp4 --out poster.png --width 320\n  vidthumb image https://example.com/clip.mp4 --out poster.jpg --format jpeg --quality 80 --time-ms 2500\n  vidthumb gif assets/intro.mp4 --asset-root bundle --out preview.gif --frames 8 --delay 150 --progress\n  vidthumb completions zsh > _vidthumb";

#[derive(Debug, Parser)]
#[command(
    name = "vidthumb",
    version,
    about = "Generate still and animated GIF thumbnails from videos",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Print the result as machine-readable JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Show a progress bar while frames are decoded.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, fatal, error, warning, info, debug).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Decode worker thread count.
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Directory for downloads and extracted assets.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Directory serving `assets/...` locators.
    #[arg(long, global = true)]
    asset_root: Option<PathBuf>,

    /// Download timeout in seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

/// Output size shared by both thumbnail kinds.
#[derive(Debug, Parser, Clone, Default)]
struct SizeOptions {
    /// Target width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Target height in pixels.
    #[arg(long)]
    height: Option<u32>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a single still frame.
    #[command(
        about = "Generate a still thumbnail",
        after_help = "Examples:\n  vidthumb image input.mp4 --out poster.png\n  vidthumb image input.mp4 --out poster.webp --format webp --height 240"
    )]
    Image {
        /// Video path, `assets/...` locator, or http(s) URL.
        input: String,
        /// Output file path.
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        size: SizeOptions,
        /// Output format: png | jpeg | webp.
        #[arg(long, default_value = "png")]
        format: String,
        /// Quality 1-100 (JPEG only).
        #[arg(long, default_value_t = 100)]
        quality: i32,
        /// Offset into the video in milliseconds.
        #[arg(long, default_value_t = 1000)]
        time_ms: u64,
    },

    /// Write an animated GIF of evenly spaced frames.
    #[command(
        about = "Generate an animated GIF thumbnail",
        after_help = "Examples:\n  vidthumb gif input.mp4 --out preview.gif --frames 5 --width 200\n  vidthumb gif input.mp4 --out once.gif --repeat -1"
    )]
    Gif {
        /// Video path, `assets/...` locator, or http(s) URL.
        input: String,
        /// Output file path.
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        size: SizeOptions,
        /// Number of frames to sample.
        #[arg(long, default_value_t = 10)]
        frames: u32,
        /// Delay between frames in milliseconds.
        #[arg(long, default_value_t = 100)]
        delay: u32,
        /// Loop count: 0 loops forever, negative plays once.
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        repeat: i32,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_image_format(value: &str) -> Option<ImageFormat> {
    match value.to_ascii_lowercase().as_str() {
        "png" => Some(ImageFormat::Png),
        "jpeg" | "jpg" => Some(ImageFormat::Jpeg),
        "webp" => Some(ImageFormat::Webp),
        _ => None,
    }
}

fn parse_log_level(value: &str) -> Option<FfmpegLogLevel> {
    match value.to_ascii_lowercase().as_str() {
        "quiet" => Some(FfmpegLogLevel::Quiet),
        "fatal" => Some(FfmpegLogLevel::Fatal),
        "error" => Some(FfmpegLogLevel::Error),
        "warning" | "warn" => Some(FfmpegLogLevel::Warning),
        "info" => Some(FfmpegLogLevel::Info),
        "debug" => Some(FfmpegLogLevel::Debug),
        _ => None,
    }
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn apply_size(mut request: ThumbnailRequest, size: &SizeOptions) -> ThumbnailRequest {
    if let Some(width) = size.width {
        request = request.with_width(width);
    }
    if let Some(height) = size.height {
        request = request.with_height(height);
    }
    request
}

fn init_logging(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    let default_filter = if global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Some(level) = &global.log_level {
        let parsed = parse_log_level(level).ok_or(format!("unsupported --log-level: {level}"))?;
        vidthumb::set_ffmpeg_log_level(parsed);
    }
    Ok(())
}

fn build_options(global: &GlobalOptions) -> Result<ThumbnailerOptions, Box<dyn std::error::Error>> {
    let mut options = ThumbnailerOptions::new();
    if let Some(threads) = global.threads {
        options = options.with_worker_threads(threads);
    }
    if let Some(cache_dir) = &global.cache_dir {
        options = options.with_cache_dir(cache_dir);
    }
    if let Some(asset_root) = &global.asset_root {
        options = options.with_asset_root(asset_root);
    }
    if let Some(seconds) = global.timeout {
        options = options.with_download_timeout(Duration::from_secs(seconds));
    }
    if global.progress {
        options = options.with_progress(Arc::new(TerminalProgress::new()?));
    }
    Ok(options)
}

/// Drives an indicatif bar from slot callbacks.
struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
        if !info.frame_written {
            if let Some(slot) = info.current_slot {
                self.bar.set_message(format!("skipped slot {slot}"));
            }
        }
        if info.total == Some(info.current) {
            self.bar.finish_and_clear();
        }
    }
}

fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.global)?;

    let request = match cli.command {
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "vidthumb", &mut std::io::stdout());
            return Ok(true);
        }
        Commands::Image {
            input,
            out,
            size,
            format,
            quality,
            time_ms,
        } => {
            ensure_writable_path(&out, cli.global.overwrite)?;
            let format =
                parse_image_format(&format).ok_or(format!("unsupported --format: {format}"))?;
            let request = ThumbnailRequest::image(input, out)
                .with_format(format)
                .with_quality(quality)
                .with_time_ms(time_ms);
            apply_size(request, &size)
        }
        Commands::Gif {
            input,
            out,
            size,
            frames,
            delay,
            repeat,
        } => {
            ensure_writable_path(&out, cli.global.overwrite)?;
            let request = ThumbnailRequest::gif(input, out)
                .with_frame_count(frames)
                .with_delay_ms(delay)
                .with_repeat(repeat);
            apply_size(request, &size)
        }
    };

    let thumbnailer = Thumbnailer::with_ffmpeg(build_options(&cli.global)?)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(thumbnailer.generate(request));

    if cli.global.json {
        println!("{}", serde_json::to_string_pretty(&result.to_json())?);
        return Ok(result.is_success());
    }

    match (result.output_path(), result.error()) {
        (_, Some(error)) => {
            eprintln!("{} [{}] {error}", "failed".red().bold(), error.code());
            Ok(false)
        }
        (Some(path), None) => {
            if result.is_partial() {
                eprintln!(
                    "{} {} of {} frames written; skipped {:?}",
                    "warning:".yellow().bold(),
                    result.frames_written(),
                    result.frames_requested(),
                    result.skipped_frames()
                );
            }
            println!("{} {}", "saved".green().bold(), path.display());
            Ok(true)
        }
        (None, None) => Ok(true),
    }
}

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(error) => {
            eprintln!("{} {error}", "error:".red().bold());
            std::process::exit(1);
        }
    }
}
