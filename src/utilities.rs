//! Internal utility functions.
//!
//! Helpers for pixel-data copying and timestamp conversion shared by the
//! FFmpeg-backed video source.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy pixel data from an RGB24 FFmpeg frame into a tightly-packed buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × 3).
/// This strips that padding so the result can be passed directly to
/// [`image::RgbImage::from_raw`].
pub(crate) fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let expected_stride = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == expected_stride {
        data[..expected_stride * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(expected_stride * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + expected_stride]);
        }
        buffer
    }
}

/// Convert a [`Rational`] rate to a float, or `None` when it is degenerate.
pub(crate) fn rational_to_f64(rate: Rational) -> Option<f64> {
    if rate.numerator() > 0 && rate.denominator() > 0 {
        Some(rate.numerator() as f64 / rate.denominator() as f64)
    } else {
        None
    }
}

/// Rescale a PTS value from stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Map a PTS value to the index of the frame it presents.
///
/// Rounds to the nearest index so a timestamp that lands a hair below the
/// frame boundary (float error, 1001-denominator rates) maps to the right
/// frame. `start_pts` is the stream's first timestamp, which many MP4 files
/// set to a non-zero value.
pub(crate) fn pts_to_frame_index(
    pts: i64,
    start_pts: i64,
    time_base: Rational,
    frames_per_second: f64,
) -> u64 {
    let seconds = pts_to_seconds(pts.saturating_sub(start_pts), time_base);
    (seconds * frames_per_second).round().max(0.0) as u64
}

/// Convert a frame index to a container seek target in AV_TIME_BASE
/// (microseconds).
///
/// `input_context.seek()` goes through `avformat_seek_file` with
/// `stream_index = -1`, which expects AV_TIME_BASE units, so the stream time
/// base is bypassed. `start_seconds` is the stream's start time.
pub(crate) fn frame_index_to_seek_timestamp(
    frame_index: u64,
    frames_per_second: f64,
    start_seconds: f64,
) -> i64 {
    let seconds = start_seconds + frame_index as f64 / frames_per_second;
    (seconds * 1_000_000.0) as i64
}
