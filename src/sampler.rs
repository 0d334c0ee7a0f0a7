//! The frame sampler.
//!
//! [`FrameSampler`] opens a video, picks positions with a
//! [`SamplingPolicy`](crate::SamplingPolicy), decodes each one and writes it
//! to the output directory as `frame_NNN.jpg`. [`sample`] is the one-call
//! form with default options.
//!
//! Decoding failures at individual positions are skipped: the result only
//! lists frames that were decoded and written, numbered contiguously in
//! output order. Failing to open the video or to read its frame count aborts
//! the run.

use std::{
    fs,
    path::{Path, PathBuf},
};

use image::{DynamicImage, codecs::jpeg::JpegEncoder, imageops::FilterType};

use crate::{
    configuration::SampleOptions,
    error::SampleError,
    progress::ProgressTracker,
    source::{FrameSource, VideoSource},
};

/// One frame written by a sampling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampledFrame {
    /// Position in the output sequence (0-based, matches the file name).
    pub index: usize,
    /// Source frame index the image was decoded from.
    pub position: u64,
    /// Where the JPEG was written.
    pub path: PathBuf,
}

/// File name for the frame at output `index`: `frame_000.jpg`, `frame_001.jpg`, …
pub fn frame_file_name(index: usize) -> String {
    format!("frame_{index:03}.jpg")
}

/// Sample `count` frames from `video_path` into `output_dir` with default
/// options.
///
/// # Errors
///
/// - [`SampleError::InvalidFrameCount`] if `count` is zero.
/// - [`SampleError::UnreadableSource`] if the video cannot be opened.
/// - [`SampleError::InvalidMedia`] if its frame count is unavailable.
/// - [`SampleError::Io`] / [`SampleError::Image`] if a frame cannot be written.
///
/// # Example
///
/// ```no_run
/// let frames = vidsift::sample("input.mp4", "frames", 7)?;
/// for frame in &frames {
///     println!("{} <- source frame {}", frame.path.display(), frame.position);
/// }
/// # Ok::<(), vidsift::SampleError>(())
/// ```
pub fn sample<P, Q>(video_path: P, output_dir: Q, count: u64) -> Result<Vec<SampledFrame>, SampleError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    FrameSampler::new(SampleOptions::new().with_count(count)).sample(video_path, output_dir)
}

/// Samples representative frames from videos.
#[derive(Debug, Clone, Default)]
pub struct FrameSampler {
    options: SampleOptions,
}

impl FrameSampler {
    /// Create a sampler with the given options.
    pub fn new(options: SampleOptions) -> Self {
        Self { options }
    }

    /// The options this sampler runs with.
    pub fn options(&self) -> &SampleOptions {
        &self.options
    }

    /// Open `video_path` and sample it into `output_dir`.
    ///
    /// The video is closed before this returns, on success and on error.
    ///
    /// # Errors
    ///
    /// See [`sample`].
    pub fn sample<P, Q>(&self, video_path: P, output_dir: Q) -> Result<Vec<SampledFrame>, SampleError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        if self.options.count == 0 {
            return Err(SampleError::InvalidFrameCount);
        }

        let mut source = VideoSource::open(video_path)?;
        self.sample_source(&mut source, output_dir.as_ref())
    }

    /// Sample an already-open [`FrameSource`] into `output_dir`.
    ///
    /// The caller keeps ownership of the source and is responsible for
    /// releasing it.
    ///
    /// # Errors
    ///
    /// See [`sample`].
    pub fn sample_source<S>(
        &self,
        source: &mut S,
        output_dir: &Path,
    ) -> Result<Vec<SampledFrame>, SampleError>
    where
        S: FrameSource + ?Sized,
    {
        let count = self.options.count;
        if count == 0 {
            return Err(SampleError::InvalidFrameCount);
        }

        let total = source.frame_count()?;
        if total == 0 {
            return Err(SampleError::InvalidMedia {
                path: source.path().to_path_buf(),
                reason: "video reports zero frames".to_string(),
            });
        }

        fs::create_dir_all(output_dir)?;

        let positions = self.options.policy.positions(total, count);
        log::debug!(
            "Sampling {} of {} frames from {} (policy={})",
            positions.len(),
            total,
            source.path().display(),
            self.options.policy,
        );

        let mut tracker = ProgressTracker::new(self.options.progress.clone(), positions.len() as u64);
        let mut frames = Vec::with_capacity(positions.len());

        for position in positions {
            let image = match source.decode_frame(position) {
                Ok(image) => image,
                Err(error) if error.is_decode_skip() => {
                    log::warn!("Skipping frame {position}: {error}");
                    tracker.advance(position, false);
                    continue;
                }
                Err(error) => return Err(error),
            };

            let index = frames.len();
            let path = output_dir.join(frame_file_name(index));
            self.write_jpeg(&image, &path)?;
            log::debug!("Saved frame {position} -> {}", path.display());

            frames.push(SampledFrame {
                index,
                position,
                path,
            });
            tracker.advance(position, true);
        }

        log::info!(
            "Sampled {} frame(s) from {} into {}",
            frames.len(),
            source.path().display(),
            output_dir.display(),
        );

        Ok(frames)
    }

    fn write_jpeg(&self, image: &DynamicImage, path: &Path) -> Result<(), SampleError> {
        let (width, height) = self.options.resolve_dimensions(image.width(), image.height());
        let rgb = if (width, height) == (image.width(), image.height()) {
            image.to_rgb8()
        } else {
            image.resize_exact(width, height, FilterType::Triangle).to_rgb8()
        };

        let mut bytes = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, self.options.jpeg_quality))?;
        fs::write(path, bytes)?;
        Ok(())
    }
}
