//! Per-upload orchestration.
//!
//! [`AnalysisPipeline`] stores an uploaded video under a unique name, runs
//! the [`FrameSampler`](crate::FrameSampler) on Tokio's blocking pool under a
//! timeout, sends every produced frame to a [`FrameAnalyzer`] one after the
//! other, and assembles the [`AnalysisReport`].
//!
//! The pipeline knows nothing about HTTP; the server module maps its errors
//! to responses.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use thiserror::Error;
use uuid::Uuid;

use crate::{
    analysis::{AnalysisError, FrameAnalyzer},
    error::SampleError,
    report::{AnalysisReport, FrameAnalysis},
    sampler::{FrameSampler, SampledFrame},
};

/// URL prefix under which the upload directory is served.
pub const PUBLIC_UPLOADS_PREFIX: &str = "/uploads";

/// Errors from processing one upload.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// Frame sampling failed.
    #[error(transparent)]
    Sample(#[from] SampleError),

    /// A frame analysis call failed.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Reading or writing an upload failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Sampling did not finish within the configured limit.
    #[error("frame sampling timed out after {0:?}")]
    Timeout(Duration),

    /// The blocking sampling task panicked or was cancelled.
    #[error("sampling task failed: {0}")]
    Task(String),
}

/// An upload written to the upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    /// Generated file name, e.g. `3f2c…9a.mp4`.
    pub file_name: String,
    /// File name without extension; names the frames directory.
    pub stem: String,
    /// Full path on disk.
    pub path: PathBuf,
}

impl StoredUpload {
    /// Directory that receives this upload's frames: `<stem>-frames`.
    pub fn frames_dir_name(&self) -> String {
        format!("{}-frames", self.stem)
    }
}

/// Runs sample-then-analyze for uploads stored under one directory.
pub struct AnalysisPipeline {
    sampler: FrameSampler,
    analyzer: Arc<dyn FrameAnalyzer>,
    upload_dir: PathBuf,
    sample_timeout: Duration,
}

impl AnalysisPipeline {
    pub fn new(
        sampler: FrameSampler,
        analyzer: Arc<dyn FrameAnalyzer>,
        upload_dir: impl Into<PathBuf>,
        sample_timeout: Duration,
    ) -> Self {
        Self {
            sampler,
            analyzer,
            upload_dir: upload_dir.into(),
            sample_timeout,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Write `bytes` to the upload directory under a fresh unique name that
    /// keeps the original extension.
    pub async fn store_upload(
        &self,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredUpload, PipelineError> {
        let stem = Uuid::new_v4().simple().to_string();
        let file_name = match upload_extension(original_name) {
            Some(extension) => format!("{stem}.{extension}"),
            None => stem.clone(),
        };
        let path = self.upload_dir.join(&file_name);

        tracing::info!(path = %path.display(), bytes = bytes.len(), "Saving upload");
        tokio::fs::write(&path, bytes).await?;

        Ok(StoredUpload {
            file_name,
            stem,
            path,
        })
    }

    /// Sample frames from a stored upload, analyze each, and build the
    /// report.
    pub async fn process(&self, upload: &StoredUpload) -> Result<AnalysisReport, PipelineError> {
        let frames_dir_name = upload.frames_dir_name();
        let frames_dir = self.upload_dir.join(&frames_dir_name);

        let frames = self.sample_frames(&upload.path, &frames_dir).await?;
        tracing::info!(count = frames.len(), dir = %frames_dir.display(), "Extracted frames");

        let frame_analyses = self.analyze_frames(&frames).await?;

        let frame_urls = frames
            .iter()
            .filter_map(|frame| frame.path.file_name())
            .map(|name| {
                format!(
                    "{PUBLIC_UPLOADS_PREFIX}/{frames_dir_name}/{}",
                    name.to_string_lossy()
                )
            })
            .collect();

        Ok(AnalysisReport::video(
            format!("{PUBLIC_UPLOADS_PREFIX}/{}", upload.file_name),
            frame_urls,
            frame_analyses,
        ))
    }

    /// Run the sampler off the async runtime, bounded by the timeout.
    ///
    /// On timeout the blocking task is abandoned, not stopped: it finishes
    /// in the background and its frames stay on disk.
    pub async fn sample_frames(
        &self,
        video_path: &Path,
        frames_dir: &Path,
    ) -> Result<Vec<SampledFrame>, PipelineError> {
        let sampler = self.sampler.clone();
        let video_path = video_path.to_path_buf();
        let frames_dir = frames_dir.to_path_buf();

        let task = tokio::task::spawn_blocking(move || sampler.sample(&video_path, &frames_dir));

        let joined = tokio::time::timeout(self.sample_timeout, task)
            .await
            .map_err(|_| PipelineError::Timeout(self.sample_timeout))?;
        let sampled = joined.map_err(|error| PipelineError::Task(error.to_string()))?;
        Ok(sampled?)
    }

    /// Analyze frames sequentially, in output order.
    pub async fn analyze_frames(
        &self,
        frames: &[SampledFrame],
    ) -> Result<Vec<FrameAnalysis>, PipelineError> {
        let mut analyses = Vec::with_capacity(frames.len());
        for frame in frames {
            let bytes = tokio::fs::read(&frame.path).await?;
            let analysis = self.analyzer.analyze(&bytes).await?;
            tracing::debug!(index = frame.index, chars = analysis.len(), "Analyzed frame");
            analyses.push(FrameAnalysis { analysis });
        }
        Ok(analyses)
    }
}

/// Extension of an uploaded file name, kept only if it is short and
/// alphanumeric so it cannot smuggle path components.
fn upload_extension(original_name: &str) -> Option<String> {
    let extension = Path::new(original_name).extension()?.to_str()?;
    if extension.is_empty()
        || extension.len() > 10
        || !extension.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::upload_extension;

    #[test]
    fn extension_is_kept_and_lowercased() {
        assert_eq!(upload_extension("clip.MP4").as_deref(), Some("mp4"));
        assert_eq!(upload_extension("a.b.webm").as_deref(), Some("webm"));
    }

    #[test]
    fn odd_extensions_are_dropped() {
        assert_eq!(upload_extension("noext"), None);
        assert_eq!(upload_extension("evil.mp4/../x"), None);
        assert_eq!(upload_extension("weird.m p4"), None);
        assert_eq!(upload_extension(""), None);
    }
}
