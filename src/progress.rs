//! Progress reporting for sampling runs.
//!
//! Attach a [`ProgressCallback`] to [`SampleOptions`](crate::SampleOptions)
//! to observe each selected position as the sampler works through it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vidsift::{FrameSampler, ProgressCallback, ProgressInfo, SampleOptions};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{}/{} (position {})", info.attempted, info.total, info.position);
//!     }
//! }
//!
//! let options = SampleOptions::new().with_progress(Arc::new(PrintProgress));
//! let frames = FrameSampler::new(options).sample("input.mp4", "frames")?;
//! # Ok::<(), vidsift::SampleError>(())
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

/// A snapshot taken after one selected position has been attempted.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// How many selected positions have been attempted so far.
    pub attempted: u64,
    /// Number of positions selected for this run.
    pub total: u64,
    /// Source frame index that was just attempted.
    pub position: u64,
    /// Whether that position was decoded and written (`false` means skipped).
    pub saved: bool,
    /// Completion percentage (0.0 – 100.0).
    pub percentage: f32,
    /// Wall-clock time elapsed since sampling started.
    pub elapsed: Duration,
}

/// Trait for receiving progress updates during sampling.
///
/// Callbacks observe but cannot halt the run.
pub trait ProgressCallback: Send + Sync {
    /// Called once per attempted position.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all notifications. The default when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Tracks timing for one sampling run and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: u64,
    attempted: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: u64) -> Self {
        Self {
            callback,
            total,
            attempted: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one attempted position and notify the callback.
    pub(crate) fn advance(&mut self, position: u64, saved: bool) {
        self.attempted += 1;

        let percentage = if self.total > 0 {
            (self.attempted as f32 / self.total as f32) * 100.0
        } else {
            100.0
        };

        self.callback.on_progress(&ProgressInfo {
            attempted: self.attempted,
            total: self.total,
            position,
            saved,
            percentage,
            elapsed: self.start_time.elapsed(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(u64, u64, bool, f32)>>);

    impl ProgressCallback for Recorder {
        fn on_progress(&self, info: &ProgressInfo) {
            self.0
                .lock()
                .unwrap()
                .push((info.attempted, info.position, info.saved, info.percentage));
        }
    }

    #[test]
    fn tracker_reports_every_position() {
        let recorder = Arc::new(Recorder::default());
        let mut tracker = ProgressTracker::new(recorder.clone(), 2);
        tracker.advance(0, true);
        tracker.advance(35, false);

        let seen = recorder.0.lock().unwrap().clone();
        assert_eq!(seen, vec![(1, 0, true, 50.0), (2, 35, false, 100.0)]);
    }
}
