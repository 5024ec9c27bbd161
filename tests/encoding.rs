//! Still-image and GIF session tests. No decoder needed.

mod common;

use std::fs::File;
use std::io::Cursor;

use image::ImageFormat as FileFormat;
use vidthumb::still::{encode, normalize_quality, save};
use vidthumb::{
    ErrorCode, GifOptions, GifSession, ImageFormat, ResizedFrame, SessionState, ThumbnailError,
};

use common::gradient;

fn frame(index: usize, width: u32, height: u32) -> ResizedFrame {
    ResizedFrame {
        index,
        image: gradient(width, height, index as u64 * 1_000_000),
    }
}

fn count_gif_frames(bytes: &[u8]) -> usize {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = options.read_info(Cursor::new(bytes)).unwrap();
    let mut frames = 0;
    while decoder.read_next_frame().unwrap().is_some() {
        frames += 1;
    }
    frames
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Loop count from the NETSCAPE2.0 application extension, if present.
fn loop_count(bytes: &[u8]) -> Option<u16> {
    let marker = b"NETSCAPE2.0";
    let start = bytes
        .windows(marker.len())
        .position(|window| window == marker)?;
    // Sub-block: size (3), id (1), count (u16 LE).
    let block = &bytes[start + marker.len()..];
    (block[0] == 3 && block[1] == 1).then(|| u16::from_le_bytes([block[2], block[3]]))
}

// ── Still images ──────────────────────────────────────────────────

#[test]
fn format_codes() {
    assert_eq!(ImageFormat::from_code(0), ImageFormat::Png);
    assert_eq!(ImageFormat::from_code(1), ImageFormat::Jpeg);
    assert_eq!(ImageFormat::from_code(2), ImageFormat::Webp);
    assert_eq!(ImageFormat::from_code(7), ImageFormat::Jpeg);
    assert_eq!(ImageFormat::default(), ImageFormat::Png);
    assert_eq!(ImageFormat::Webp.code(), 2);
}

#[test]
fn quality_outside_range_falls_back_to_maximum() {
    assert_eq!(normalize_quality(85), 85);
    assert_eq!(normalize_quality(1), 1);
    assert_eq!(normalize_quality(100), 100);
    assert_eq!(normalize_quality(0), 100);
    assert_eq!(normalize_quality(-5), 100);
    assert_eq!(normalize_quality(150), 100);
}

#[test]
fn encoded_stills_decode_back() {
    let image = gradient(64, 36, 0);
    for (format, file_format) in [
        (ImageFormat::Png, FileFormat::Png),
        (ImageFormat::Jpeg, FileFormat::Jpeg),
        (ImageFormat::Webp, FileFormat::WebP),
    ] {
        let bytes = encode(&image, format, 80).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), file_format);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 36));
    }
}

#[test]
fn jpeg_quality_changes_output_size() {
    let image = gradient(128, 128, 0);
    let low = encode(&image, ImageFormat::Jpeg, 5).unwrap();
    let high = encode(&image, ImageFormat::Jpeg, 100).unwrap();
    assert!(low.len() < high.len());
}

#[test]
fn webp_quality_changes_output_size() {
    let image = gradient(128, 128, 0);
    let low = encode(&image, ImageFormat::Webp, 10).unwrap();
    let high = encode(&image, ImageFormat::Webp, 90).unwrap();
    assert_ne!(low, high);
    assert!(low.len() < high.len(), "q10={} q90={}", low.len(), high.len());

    // Out-of-range quality encodes exactly like 100.
    let fallback = encode(&image, ImageFormat::Webp, 0).unwrap();
    assert_eq!(fallback, encode(&image, ImageFormat::Webp, 100).unwrap());
}

#[test]
fn save_replaces_existing_file_without_leftovers() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("thumb.png");
    std::fs::write(&path, b"stale").unwrap();

    save(&gradient(20, 10, 0), &path, ImageFormat::Png, 100).unwrap();

    let decoded = image::open(&path).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (20, 10));
    let entries = std::fs::read_dir(directory.path()).unwrap().count();
    assert_eq!(entries, 1);
}

#[test]
fn save_into_missing_directory_is_an_encode_failure() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("missing").join("thumb.png");
    let error = save(&gradient(4, 4, 0), &path, ImageFormat::Png, 100).unwrap_err();
    assert_eq!(error.code(), ErrorCode::EncodeFailed);
    assert!(!path.exists());
}

// ── GIF options ───────────────────────────────────────────────────

#[test]
fn gif_defaults() {
    let options = GifOptions::default();
    assert_eq!(options.frame_count, 10);
    assert_eq!(options.delay_ms, 100);
    assert_eq!(options.repeat, 0);
}

#[test]
fn delay_rounds_to_centiseconds() {
    assert_eq!(GifOptions::new().with_delay_ms(100).delay_centiseconds(), 10);
    assert_eq!(GifOptions::new().with_delay_ms(125).delay_centiseconds(), 13);
    assert_eq!(GifOptions::new().with_delay_ms(124).delay_centiseconds(), 12);
    assert_eq!(GifOptions::new().with_delay_ms(0).delay_centiseconds(), 0);
}

// ── GIF session ───────────────────────────────────────────────────

#[test]
fn session_writes_frames_in_order() {
    let options = GifOptions::new().with_delay_ms(200);
    let mut session = GifSession::open(Vec::new(), 32, 18, 3, &options).unwrap();
    for index in 0..3 {
        session.add_frame(frame(index, 32, 18)).unwrap();
    }
    assert_eq!(session.state(), SessionState::Accepting(3));
    let bytes = session.finalize().unwrap();

    assert_eq!(session.state(), SessionState::Finalized);
    assert_eq!(session.frames_written(), 3);
    assert!(bytes.starts_with(b"GIF89a"));
    assert_eq!(count_gif_frames(&bytes), 3);

    let mut decoder = gif::DecodeOptions::new()
        .read_info(Cursor::new(&bytes))
        .unwrap();
    let first = decoder.read_next_frame().unwrap().unwrap();
    assert_eq!(first.delay, 20);
    assert_eq!((decoder.width(), decoder.height()), (32, 18));
}

#[test]
fn out_of_order_frame_is_rejected() {
    let mut session = GifSession::open(Vec::new(), 8, 8, 3, &GifOptions::new()).unwrap();
    let error = session.add_frame(frame(1, 8, 8)).unwrap_err();
    assert!(matches!(
        error,
        ThumbnailError::FrameOutOfOrder {
            expected: 0,
            actual: 1
        }
    ));
    assert_eq!(error.code(), ErrorCode::EncodeFailed);

    // The session is still usable after a rejected frame.
    session.add_frame(frame(0, 8, 8)).unwrap();
    let error = session.skip(0).unwrap_err();
    assert!(matches!(error, ThumbnailError::FrameOutOfOrder { expected: 1, .. }));
}

#[test]
fn index_beyond_slot_count_is_rejected() {
    let mut session = GifSession::open(Vec::new(), 8, 8, 1, &GifOptions::new()).unwrap();
    session.add_frame(frame(0, 8, 8)).unwrap();
    assert!(matches!(
        session.add_frame(frame(1, 8, 8)),
        Err(ThumbnailError::FrameOutOfOrder { .. })
    ));
}

#[test]
fn skipped_slots_shorten_the_animation() {
    let mut session = GifSession::open(Vec::new(), 16, 16, 4, &GifOptions::new()).unwrap();
    session.add_frame(frame(0, 16, 16)).unwrap();
    session.skip(1).unwrap();
    session.add_frame(frame(2, 16, 16)).unwrap();
    session.skip(3).unwrap();
    let bytes = session.finalize().unwrap();

    assert_eq!(session.skipped(), &[1, 3]);
    assert_eq!(session.frames_written(), 2);
    assert_eq!(count_gif_frames(&bytes), 2);
}

#[test]
fn unvisited_slots_are_recorded_as_skipped() {
    let mut session = GifSession::open(Vec::new(), 16, 16, 3, &GifOptions::new()).unwrap();
    session.add_frame(frame(0, 16, 16)).unwrap();
    session.finalize().unwrap();
    assert_eq!(session.skipped(), &[1, 2]);
}

#[test]
fn empty_session_still_produces_a_valid_gif() {
    let mut session = GifSession::open(Vec::new(), 10, 10, 0, &GifOptions::new()).unwrap();
    let bytes = session.finalize().unwrap();
    assert!(bytes.starts_with(b"GIF89a"));
    assert_eq!(bytes.last(), Some(&0x3B));
    assert_eq!(count_gif_frames(&bytes), 0);
}

#[test]
fn frames_of_other_sizes_are_scaled_to_canvas() {
    let mut session = GifSession::open(Vec::new(), 20, 10, 1, &GifOptions::new()).unwrap();
    session.add_frame(frame(0, 64, 64)).unwrap();
    let bytes = session.finalize().unwrap();

    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = options.read_info(Cursor::new(&bytes)).unwrap();
    let first = decoder.read_next_frame().unwrap().unwrap();
    assert_eq!((first.width, first.height), (20, 10));
}

#[test]
fn closed_session_rejects_everything() {
    let mut session = GifSession::open(Vec::new(), 8, 8, 2, &GifOptions::new()).unwrap();
    session.finalize().unwrap();
    assert!(matches!(
        session.add_frame(frame(0, 8, 8)),
        Err(ThumbnailError::SessionClosed)
    ));
    assert!(matches!(session.finalize(), Err(ThumbnailError::SessionClosed)));

    let mut aborted = GifSession::open(Vec::new(), 8, 8, 2, &GifOptions::new()).unwrap();
    aborted.abort();
    assert_eq!(aborted.state(), SessionState::Aborted);
    assert!(matches!(aborted.skip(0), Err(ThumbnailError::SessionClosed)));
    assert!(matches!(aborted.finalize(), Err(ThumbnailError::SessionClosed)));
}

#[test]
fn infinite_loop_writes_netscape_extension() {
    let mut session = GifSession::open(Vec::new(), 8, 8, 1, &GifOptions::new()).unwrap();
    session.add_frame(frame(0, 8, 8)).unwrap();
    let bytes = session.finalize().unwrap();
    assert_eq!(loop_count(&bytes), Some(0));
}

#[test]
fn finite_loop_count_is_written() {
    let options = GifOptions::new().with_repeat(3);
    let mut session = GifSession::open(Vec::new(), 8, 8, 1, &options).unwrap();
    session.add_frame(frame(0, 8, 8)).unwrap();
    let bytes = session.finalize().unwrap();
    assert_eq!(loop_count(&bytes), Some(3));
}

#[test]
fn negative_repeat_omits_loop_extension() {
    let options = GifOptions::new().with_repeat(-1);
    let mut session = GifSession::open(Vec::new(), 8, 8, 1, &options).unwrap();
    session.add_frame(frame(0, 8, 8)).unwrap();
    let bytes = session.finalize().unwrap();
    assert!(!contains(&bytes, b"NETSCAPE2.0"));
    assert_eq!(loop_count(&bytes), None);
}

#[test]
fn session_over_a_file() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("out.gif");
    let file = File::create(&path).unwrap();
    let mut session = GifSession::open(file, 12, 12, 2, &GifOptions::new()).unwrap();
    session.add_frame(frame(0, 12, 12)).unwrap();
    session.add_frame(frame(1, 12, 12)).unwrap();
    drop(session.finalize().unwrap());

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(count_gif_frames(&bytes), 2);
}
