//! Sampling configuration.
//!
//! [`SampleOptions`] is a builder that threads the frame count, sampling
//! policy, output encoding and progress reporting through
//! [`FrameSampler`](crate::FrameSampler) without widening every signature.
//!
//! # Example
//!
//! ```
//! use vidsift::{SampleOptions, SamplingPolicy};
//!
//! let options = SampleOptions::new()
//!     .with_count(5)
//!     .with_policy(SamplingPolicy::FixedInterval)
//!     .with_jpeg_quality(80)
//!     .with_max_dimension(Some(1024));
//! assert_eq!(options.count(), 5);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::progress::{NoOpProgress, ProgressCallback};
use crate::sampling::SamplingPolicy;

/// Number of frames sampled when nothing else is requested.
pub const DEFAULT_FRAME_COUNT: u64 = 7;

/// JPEG quality used when nothing else is requested.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Options for a sampling run.
#[derive(Clone)]
pub struct SampleOptions {
    pub(crate) count: u64,
    pub(crate) policy: SamplingPolicy,
    pub(crate) jpeg_quality: u8,
    /// Longest edge of a written frame. `None` keeps the source size.
    pub(crate) max_dimension: Option<u32>,
    pub(crate) progress: Arc<dyn ProgressCallback>,
}

impl Debug for SampleOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SampleOptions")
            .field("count", &self.count)
            .field("policy", &self.policy)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("max_dimension", &self.max_dimension)
            .finish_non_exhaustive()
    }
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleOptions {
    /// Defaults: 7 frames, even spacing, JPEG quality 90, source size, no
    /// progress callback.
    pub fn new() -> Self {
        Self {
            count: DEFAULT_FRAME_COUNT,
            policy: SamplingPolicy::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_dimension: None,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Set the desired number of frames.
    ///
    /// Zero is accepted here and rejected when sampling starts, with
    /// [`SampleError::InvalidFrameCount`](crate::SampleError::InvalidFrameCount).
    #[must_use]
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    /// Choose how positions are spread across the video.
    #[must_use]
    pub fn with_policy(mut self, policy: SamplingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the JPEG quality, clamped to `1..=100`.
    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Downscale frames whose longest edge exceeds `max_dimension`,
    /// preserving aspect ratio. `None` (the default) or `Some(0)` keeps the
    /// source size.
    #[must_use]
    pub fn with_max_dimension(mut self, max_dimension: Option<u32>) -> Self {
        self.max_dimension = max_dimension.filter(|&value| value > 0);
        self
    }

    /// Attach a progress callback, fired once per attempted position.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Desired number of frames.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Selected sampling policy.
    pub fn policy(&self) -> SamplingPolicy {
        self.policy
    }

    /// JPEG quality in `1..=100`.
    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// Longest-edge limit for written frames.
    pub fn max_dimension(&self) -> Option<u32> {
        self.max_dimension
    }

    /// Output size for a `width × height` frame under the current limit.
    ///
    /// Frames already within the limit keep their size; larger ones are
    /// scaled down so the longest edge equals the limit.
    pub(crate) fn resolve_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        match self.max_dimension {
            Some(limit) if width.max(height) > limit && width > 0 && height > 0 => {
                let scale = limit as f64 / width.max(height) as f64;
                let new_width = ((width as f64) * scale).round() as u32;
                let new_height = ((height as f64) * scale).round() as u32;
                (new_width.max(1), new_height.max(1))
            }
            _ => (width, height),
        }
    }
}
