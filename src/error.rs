//! Error types for the `vidsift` crate.
//!
//! This module defines [`SampleError`], the error type returned by the frame
//! sampler and the video handle it drives. Errors carry enough context (file
//! paths, frame positions, upstream messages) to be reported without extra
//! logging at the call site.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The error type for frame sampling operations.
///
/// Only [`UnreadableSource`](SampleError::UnreadableSource) and
/// [`InvalidMedia`](SampleError::InvalidMedia) are expected to reach callers
/// of [`sample`](crate::sample) in normal operation.
/// [`FrameDecode`](SampleError::FrameDecode) is produced by
/// [`FrameSource`](crate::FrameSource) implementations for a single position
/// and absorbed by the sampler, which skips that position.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SampleError {
    /// The video could not be opened as decodable media.
    #[error("Unreadable source {path}: {reason}")]
    UnreadableSource {
        /// Path that was passed to [`VideoSource::open`](crate::VideoSource::open).
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The video's frame count is unavailable or not positive.
    #[error("Invalid media {path}: {reason}")]
    InvalidMedia {
        /// Path of the offending video.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// A frame count of zero was requested.
    #[error("Frame count must be greater than zero")]
    InvalidFrameCount,

    /// The frame at a selected position could not be decoded.
    #[error("Failed to decode frame at position {position}: {reason}")]
    FrameDecode {
        /// Source frame index that was being decoded.
        position: u64,
        /// Why decoding failed.
        reason: String,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    /// An I/O error occurred while creating directories or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// An error from the `image` crate while encoding a frame.
    #[error("Image processing error: {0}")]
    Image(#[from] ImageError),
}

impl SampleError {
    /// Returns `true` for the per-frame error the sampler skips over.
    pub fn is_decode_skip(&self) -> bool {
        matches!(self, SampleError::FrameDecode { .. })
    }
}

impl From<FfmpegError> for SampleError {
    fn from(error: FfmpegError) -> Self {
        SampleError::Ffmpeg(error.to_string())
    }
}
