//! Sample planning and resize policy tests. No decoder needed.

use vidthumb::sampler::{evenly_spaced, plan, still};
use vidthumb::{ErrorCode, GifOptions, ImageOptions, ThumbnailMode, resolve_dimensions};

// ── evenly_spaced ─────────────────────────────────────────────────

#[test]
fn five_samples_over_ten_seconds() {
    let samples = evenly_spaced(10_000_000, 5).unwrap();
    let offsets: Vec<u64> = samples.iter().map(|sample| sample.micros).collect();
    assert_eq!(offsets, vec![0, 2_000_000, 4_000_000, 6_000_000, 8_000_000]);
    let indices: Vec<usize> = samples.iter().map(|sample| sample.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
}

#[test]
fn samples_start_at_zero_increase_and_stay_inside_duration() {
    for (duration, count) in [(1_000_000, 7), (3_333_333, 10), (59_999_999, 24), (12, 12)] {
        let samples = evenly_spaced(duration, count).unwrap();
        assert_eq!(samples.len(), count as usize);
        assert_eq!(samples[0].micros, 0);
        assert!(
            samples.windows(2).all(|pair| pair[0].micros < pair[1].micros),
            "not strictly increasing for {duration}us / {count}"
        );
        assert!(samples.iter().all(|sample| sample.micros < duration));
    }
}

#[test]
fn single_sample_is_the_start() {
    let samples = evenly_spaced(5_000_000, 1).unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].micros, 0);
}

#[test]
fn shorter_than_count_clamps_interval() {
    let samples = evenly_spaced(3, 5).unwrap();
    let offsets: Vec<u64> = samples.iter().map(|sample| sample.micros).collect();
    assert_eq!(offsets, vec![0, 1, 2, 3, 4]);
}

#[test]
fn zero_count_is_invalid() {
    let error = evenly_spaced(10_000_000, 0).unwrap_err();
    assert_eq!(error.code(), ErrorCode::InvalidArgument);
}

#[test]
fn zero_duration_is_a_decode_failure() {
    let error = evenly_spaced(0, 5).unwrap_err();
    assert_eq!(error.code(), ErrorCode::DecodeFailed);
}

#[test]
fn still_plans_one_sample_at_offset() {
    let samples = still(2_500_000);
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].index, 0);
    assert_eq!(samples[0].micros, 2_500_000);
}

#[test]
fn plan_dispatches_on_mode() {
    let image = ThumbnailMode::Image(ImageOptions::default());
    let samples = plan(&image, 0).unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].micros, 1_000_000);

    let gif = ThumbnailMode::Gif(GifOptions::new().with_frame_count(4));
    let samples = plan(&gif, 8_000_000).unwrap();
    assert_eq!(samples.len(), 4);
    assert_eq!(samples[3].micros, 6_000_000);
}

// ── resolve_dimensions ────────────────────────────────────────────

#[test]
fn both_dimensions_are_used_exactly() {
    assert_eq!(resolve_dimensions(1920, 1080, Some(100), Some(100)), (100, 100));
}

#[test]
fn width_only_keeps_aspect_ratio() {
    assert_eq!(resolve_dimensions(1920, 1080, Some(100), None), (100, 56));
    assert_eq!(resolve_dimensions(640, 360, Some(320), None), (320, 180));
}

#[test]
fn height_only_keeps_aspect_ratio() {
    assert_eq!(resolve_dimensions(1920, 1080, None, Some(100)), (178, 100));
}

#[test]
fn no_target_keeps_source_size() {
    assert_eq!(resolve_dimensions(640, 360, None, None), (640, 360));
}

#[test]
fn derived_dimension_never_drops_to_zero() {
    assert_eq!(resolve_dimensions(10_000, 10, Some(1), None), (1, 1));
    assert_eq!(resolve_dimensions(10, 10_000, None, Some(1)), (1, 1));
}

#[test]
fn rounding_is_half_up() {
    // 3 * 1 / 2 = 1.5 rounds to 2.
    assert_eq!(resolve_dimensions(2, 1, Some(3), None), (3, 2));
}
