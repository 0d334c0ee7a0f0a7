//! Seekable video handles.
//!
//! [`FrameSource`] is the capability the sampler needs from a video: a total
//! frame count and decode-at-index. [`VideoSource`] implements it on top of
//! FFmpeg via `ffmpeg-next`; tests substitute in-memory sources.
//!
//! A `VideoSource` owns its demuxer context. Dropping it closes the file, so
//! a source opened inside a function is released on every exit path.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    codec::context::Context as CodecContext,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, RgbImage};

use crate::{error::SampleError, utilities};

/// A decodable video exposing seek-and-read access to frames by index.
pub trait FrameSource {
    /// Path (or other identifier) of the underlying media, for error context.
    fn path(&self) -> &Path;

    /// Total number of frames in the video.
    ///
    /// Implementations return [`SampleError::InvalidMedia`] when the count
    /// cannot be determined. A returned `0` is treated the same way by the
    /// sampler.
    fn frame_count(&self) -> Result<u64, SampleError>;

    /// Seek to `position` and decode exactly that frame.
    ///
    /// Returns [`SampleError::FrameDecode`] when the frame cannot be
    /// produced. Implementations must not substitute a neighboring frame.
    fn decode_frame(&mut self, position: u64) -> Result<DynamicImage, SampleError>;
}

/// Properties of the selected video stream, read once at open time.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct VideoInfo {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Average frames per second (0.0 when unknown).
    pub frames_per_second: f64,
    /// Declared frame count, or `duration × fps` when the container does not
    /// declare one. Zero when neither is available.
    pub frame_count: u64,
    /// Codec name (e.g. `"h264"`).
    pub codec: String,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`).
    pub format: String,
    /// Container duration.
    pub duration: Duration,
}

/// An FFmpeg-backed [`FrameSource`].
///
/// # Example
///
/// ```no_run
/// use vidsift::{FrameSource, VideoSource};
///
/// let mut source = VideoSource::open("input.mp4")?;
/// println!("{} frames", source.frame_count()?);
/// let first = source.decode_frame(0)?;
/// first.save("first.png")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct VideoSource {
    input_context: Input,
    stream_index: usize,
    info: VideoInfo,
    /// Stream start time in the stream's time base (0 when unset).
    start_pts: i64,
    path: PathBuf,
}

impl Debug for VideoSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoSource")
            .field("path", &self.path)
            .field("stream_index", &self.stream_index)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl VideoSource {
    /// Open a video file.
    ///
    /// Initializes FFmpeg (idempotent), opens the container and selects the
    /// best video stream.
    ///
    /// # Errors
    ///
    /// - [`SampleError::UnreadableSource`] if the file cannot be opened.
    /// - [`SampleError::InvalidMedia`] if it has no usable video stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SampleError> {
        let path = path.as_ref().to_path_buf();

        log::debug!("Opening video: {}", path.display());

        ffmpeg_next::init().map_err(|error| SampleError::UnreadableSource {
            path: path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| SampleError::UnreadableSource {
                path: path.clone(),
                reason: error.to_string(),
            })?;

        let stream = input_context.streams().best(Type::Video).ok_or_else(|| {
            SampleError::InvalidMedia {
                path: path.clone(),
                reason: "no video stream found".to_string(),
            }
        })?;
        let stream_index = stream.index();

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| SampleError::InvalidMedia {
                path: path.clone(),
                reason: format!("cannot create decoder for stream {stream_index}: {error}"),
            })?;

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        let frames_per_second = utilities::rational_to_f64(stream.avg_frame_rate())
            .or_else(|| utilities::rational_to_f64(stream.rate()))
            .unwrap_or(0.0);

        let declared_frames = stream.frames();
        let frame_count = if declared_frames > 0 {
            declared_frames as u64
        } else if frames_per_second > 0.0 {
            (duration.as_secs_f64() * frames_per_second).round() as u64
        } else {
            0
        };

        let start_pts = match stream.start_time() {
            ffmpeg_next::ffi::AV_NOPTS_VALUE => 0,
            start => start,
        };

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let info = VideoInfo {
            width: decoder.width(),
            height: decoder.height(),
            frames_per_second,
            frame_count,
            codec,
            format: input_context.format().name().to_string(),
            duration,
        };

        log::info!(
            "Opened video: {} ({}x{}, {:.2} fps, {} frames, codec={})",
            path.display(),
            info.width,
            info.height,
            info.frames_per_second,
            info.frame_count,
            info.codec,
        );

        Ok(Self {
            input_context,
            stream_index,
            info,
            start_pts,
            path,
        })
    }

    /// Stream properties read at open time.
    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn decode_exact(&mut self, position: u64) -> Result<DynamicImage, SampleError> {
        let frames_per_second = self.info.frames_per_second;
        if frames_per_second <= 0.0 {
            return Err(SampleError::FrameDecode {
                position,
                reason: "frame rate unknown, cannot seek by index".to_string(),
            });
        }

        let stream = self
            .input_context
            .stream(self.stream_index)
            .ok_or_else(|| SampleError::FrameDecode {
                position,
                reason: "video stream disappeared".to_string(),
            })?;
        let time_base = stream.time_base();
        let mut decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        let start_seconds = utilities::pts_to_seconds(self.start_pts, time_base);
        let target =
            utilities::frame_index_to_seek_timestamp(position, frames_per_second, start_seconds);
        self.input_context.seek(target, ..target)?;

        log::debug!("Seeking to frame {position} (target={target}us)");

        let start_pts = self.start_pts;
        let mut decoded_frame = VideoFrame::empty();

        for (stream, packet) in self.input_context.packets() {
            if stream.index() != self.stream_index {
                continue;
            }

            decoder.send_packet(&packet)?;

            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                let pts = decoded_frame.timestamp().or(decoded_frame.pts()).unwrap_or(start_pts);
                let index =
                    utilities::pts_to_frame_index(pts, start_pts, time_base, frames_per_second);

                match landing(index, position) {
                    Landing::Before => {}
                    Landing::Exact => return convert_frame_to_image(&decoded_frame),
                    Landing::Past => {
                        return Err(SampleError::FrameDecode {
                            position,
                            reason: format!("decoder resumed at frame {index}, past the target"),
                        });
                    }
                }
            }
        }

        decoder.send_eof()?;
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            let pts = decoded_frame.timestamp().or(decoded_frame.pts()).unwrap_or(start_pts);
            let index = utilities::pts_to_frame_index(pts, start_pts, time_base, frames_per_second);
            match landing(index, position) {
                Landing::Before => {}
                Landing::Exact => return convert_frame_to_image(&decoded_frame),
                Landing::Past => break,
            }
        }

        Err(SampleError::FrameDecode {
            position,
            reason: "frame not found before end of stream".to_string(),
        })
    }
}

impl FrameSource for VideoSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn frame_count(&self) -> Result<u64, SampleError> {
        if self.info.frame_count == 0 {
            return Err(SampleError::InvalidMedia {
                path: self.path.clone(),
                reason: "frame count unavailable".to_string(),
            });
        }
        Ok(self.info.frame_count)
    }

    fn decode_frame(&mut self, position: u64) -> Result<DynamicImage, SampleError> {
        // Any failure at this position, FFmpeg's included, is a per-frame
        // decode failure the sampler may skip.
        self.decode_exact(position).map_err(|error| match error {
            SampleError::FrameDecode { .. } => error,
            other => SampleError::FrameDecode {
                position,
                reason: other.to_string(),
            },
        })
    }
}

/// Where a decoded frame sits relative to the requested position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Landing {
    /// Still rolling forward from the keyframe.
    Before,
    Exact,
    /// The target was skipped; never hand back a neighbor.
    Past,
}

fn landing(index: u64, position: u64) -> Landing {
    match index.cmp(&position) {
        std::cmp::Ordering::Less => Landing::Before,
        std::cmp::Ordering::Equal => Landing::Exact,
        std::cmp::Ordering::Greater => Landing::Past,
    }
}

/// Convert a decoded frame of any pixel format to an RGB8 image.
fn convert_frame_to_image(decoded_frame: &VideoFrame) -> Result<DynamicImage, SampleError> {
    let width = decoded_frame.width();
    let height = decoded_frame.height();

    let mut scaler = ScalingContext::get(
        decoded_frame.format(),
        width,
        height,
        Pixel::RGB24,
        width,
        height,
        ScalingFlags::BILINEAR,
    )?;
    let mut rgb_frame = VideoFrame::empty();
    scaler.run(decoded_frame, &mut rgb_frame)?;

    let buffer = utilities::frame_to_rgb_buffer(&rgb_frame, width, height);
    let rgb_image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        SampleError::Ffmpeg("Failed to construct RGB image from decoded frame data".to_string())
    })?;
    Ok(DynamicImage::ImageRgb8(rgb_image))
}

#[cfg(test)]
mod tests {
    use ffmpeg_next::Rational;

    use super::*;

    /// Frame indices a decoder produces after seeking to `keyframe` in a
    /// 30 fps MP4 with a 1/15360 time base (512 ticks per frame).
    fn decoded_run(keyframe: u64, last: u64) -> impl Iterator<Item = u64> {
        let time_base = Rational::new(1, 15_360);
        (keyframe..=last).map(move |frame| {
            utilities::pts_to_frame_index(frame as i64 * 512, 0, time_base, 30.0)
        })
    }

    #[test]
    fn mid_gop_target_is_reached_by_rolling_forward() {
        let verdicts: Vec<Landing> = decoded_run(30, 46).map(|index| landing(index, 45)).collect();

        assert!(verdicts[..15].iter().all(|verdict| *verdict == Landing::Before));
        assert_eq!(verdicts[15], Landing::Exact);
        assert_eq!(verdicts[16], Landing::Past);
        assert_eq!(
            verdicts.iter().filter(|verdict| **verdict == Landing::Exact).count(),
            1
        );
    }

    #[test]
    fn keyframe_target_lands_immediately() {
        assert_eq!(decoded_run(30, 30).map(|index| landing(index, 30)).next(), Some(Landing::Exact));
        assert_eq!(landing(0, 0), Landing::Exact);
    }

    #[test]
    fn overshoot_is_never_accepted() {
        // Seek landed on the keyframe after the target.
        let first = decoded_run(60, 60).next().map(|index| landing(index, 59));
        assert_eq!(first, Some(Landing::Past));
    }

    #[test]
    fn last_frame_needs_the_whole_gop() {
        let verdicts: Vec<Landing> = decoded_run(120, 149).map(|index| landing(index, 149)).collect();
        assert_eq!(verdicts.last(), Some(&Landing::Exact));
        assert_eq!(verdicts.iter().filter(|verdict| **verdict == Landing::Before).count(), 29);
    }
}
