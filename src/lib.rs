//! # vidsift
//!
//! Sample a small, evenly spread set of still frames from a video and,
//! optionally, have a vision model comment on each one.
//!
//! The core is a deterministic frame sampler built on FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate: given a video
//! and a desired count, it picks frame positions across the whole video,
//! decodes each one and writes it as a numbered JPEG. On top of that, the
//! `server` feature adds an HTTP service that accepts uploads, samples them,
//! sends every frame to an OpenAI-compatible chat endpoint and returns a JSON
//! report.
//!
//! ## Quick Start
//!
//! ### Sample Frames
//!
//! ```no_run
//! let frames = vidsift::sample("input.mp4", "frames", 7)?;
//! assert!(frames.len() <= 7);
//! # Ok::<(), vidsift::SampleError>(())
//! ```
//!
//! ### Choose a Policy and Output Size
//!
//! ```no_run
//! use vidsift::{FrameSampler, SampleOptions, SamplingPolicy};
//!
//! let sampler = FrameSampler::new(
//!     SampleOptions::new()
//!         .with_count(12)
//!         .with_policy(SamplingPolicy::FixedInterval)
//!         .with_max_dimension(Some(720)),
//! );
//! let frames = sampler.sample("input.mp4", "frames")?;
//! # Ok::<(), vidsift::SampleError>(())
//! ```
//!
//! ### Plan Without Decoding
//!
//! ```
//! use vidsift::SamplingPolicy;
//!
//! let positions = SamplingPolicy::EvenSpacing.positions(70, 7);
//! assert_eq!(positions, vec![0, 10, 20, 30, 40, 50, 60]);
//! ```
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `server` | [`pipeline`], [`analysis`], [`report`] and the axum [`server`] behind the `vidsift-server` binary |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

#[cfg(feature = "server")]
pub mod analysis;
pub mod configuration;
pub mod error;
pub mod ffmpeg;
#[cfg(feature = "server")]
pub mod pipeline;
pub mod progress;
#[cfg(feature = "server")]
pub mod report;
pub mod sampler;
pub mod sampling;
#[cfg(feature = "server")]
pub mod server;
pub mod source;
mod utilities;

#[cfg(feature = "server")]
pub use analysis::{AnalysisError, FrameAnalyzer, OpenAiVisionAnalyzer, VisionSettings};
pub use configuration::{DEFAULT_FRAME_COUNT, DEFAULT_JPEG_QUALITY, SampleOptions};
pub use error::SampleError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
#[cfg(feature = "server")]
pub use pipeline::{AnalysisPipeline, PipelineError, StoredUpload};
pub use progress::{ProgressCallback, ProgressInfo};
#[cfg(feature = "server")]
pub use report::{AnalysisReport, FrameAnalysis};
pub use sampler::{FrameSampler, SampledFrame, frame_file_name, sample};
pub use sampling::SamplingPolicy;
pub use source::{FrameSource, VideoInfo, VideoSource};
