//! The JSON document returned for an analyzed upload.

use serde::{Deserialize, Serialize};

/// Placeholder until audio transcription exists.
pub const AUDIO_TRANSCRIPT_PLACEHOLDER: &str = "Sample audio transcript would appear here.";
/// Placeholder until audio analysis exists.
pub const AUDIO_ANALYSIS_PLACEHOLDER: &str = "Sample audio analysis would appear here.";
/// Placeholder until an overall synthesis exists.
pub const OVERALL_ANALYSIS_PLACEHOLDER: &str =
    "This is an overall analysis of the video content.";

/// Commentary for one sampled frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    /// Model commentary, or the fallback text when it answered with nothing.
    pub analysis: String,
}

/// Aggregate result for one uploaded video.
///
/// Serialized in camelCase with a constant `"type": "video"` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Always `"video"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Public URL of the stored upload.
    pub video_path: String,
    /// Public URLs of the sampled frames, in output order.
    pub frames: Vec<String>,
    /// One entry per frame, same order as `frames`.
    pub frame_analyses: Vec<FrameAnalysis>,
    /// [`AUDIO_TRANSCRIPT_PLACEHOLDER`].
    pub audio_transcript: String,
    /// [`AUDIO_ANALYSIS_PLACEHOLDER`].
    pub audio_analysis: String,
    /// [`OVERALL_ANALYSIS_PLACEHOLDER`].
    pub overall_analysis: String,
}

impl AnalysisReport {
    /// Build a video report with the audio and overall fields stubbed.
    pub fn video(
        video_path: String,
        frames: Vec<String>,
        frame_analyses: Vec<FrameAnalysis>,
    ) -> Self {
        Self {
            kind: "video".to_string(),
            video_path,
            frames,
            frame_analyses,
            audio_transcript: AUDIO_TRANSCRIPT_PLACEHOLDER.to_string(),
            audio_analysis: AUDIO_ANALYSIS_PLACEHOLDER.to_string(),
            overall_analysis: OVERALL_ANALYSIS_PLACEHOLDER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_original_field_names() {
        let report = AnalysisReport::video(
            "/uploads/abc.mp4".to_string(),
            vec!["/uploads/abc-frames/frame_000.jpg".to_string()],
            vec![FrameAnalysis {
                analysis: "Calm.".to_string(),
            }],
        );

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["type"], "video");
        assert_eq!(value["videoPath"], "/uploads/abc.mp4");
        assert_eq!(value["frames"][0], "/uploads/abc-frames/frame_000.jpg");
        assert_eq!(value["frameAnalyses"][0]["analysis"], "Calm.");
        assert_eq!(value["audioTranscript"], AUDIO_TRANSCRIPT_PLACEHOLDER);
        assert_eq!(value["audioAnalysis"], AUDIO_ANALYSIS_PLACEHOLDER);
        assert_eq!(value["overallAnalysis"], OVERALL_ANALYSIS_PLACEHOLDER);
    }
}
