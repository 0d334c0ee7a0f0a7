//! Server configuration.
//!
//! [`ServerConfig`] starts from defaults, takes overrides from the
//! environment and then from command-line flags, and is validated once at
//! startup. A bad value or an unusable upload directory stops the process
//! before it binds a socket.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `VIDSIFT_HOST` | `host` |
//! | `VIDSIFT_PORT` | `port` |
//! | `VIDSIFT_UPLOAD_DIR` | `upload_dir` |
//! | `VIDSIFT_UPLOAD_DIR_MODE` | `upload_dir_mode` (octal, e.g. `775`) |
//! | `VIDSIFT_FRAME_COUNT` | `frame_count` |
//! | `VIDSIFT_JPEG_QUALITY` | `jpeg_quality` |
//! | `VIDSIFT_MAX_UPLOAD_BYTES` | `max_upload_bytes` |
//! | `VIDSIFT_SAMPLE_TIMEOUT_SECS` | `sample_timeout` |
//! | `VIDSIFT_FFMPEG_LOG_LEVEL` | `ffmpeg_log_level` |
//! | `VIDSIFT_MODEL` | `vision.model` |
//! | `VIDSIFT_API_BASE` | `vision.api_base` |
//! | `VIDSIFT_MAX_TOKENS` | `vision.max_tokens` |
//! | `OPENAI_API_KEY` | `vision.api_key` |

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use thiserror::Error;

use crate::{
    analysis::VisionSettings,
    configuration::{DEFAULT_FRAME_COUNT, DEFAULT_JPEG_QUALITY},
    ffmpeg::FfmpegLogLevel,
};

/// Default request body cap: 200 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

const PERMISSION_PROBE: &str = ".permission_test";

/// Startup configuration errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A setting has an unusable value.
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        /// Setting or environment variable name.
        key: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// `OPENAI_API_KEY` is unset or blank.
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,

    /// The upload directory cannot be created or written.
    #[error("upload directory {path} is not usable: {reason}")]
    UploadDir {
        /// The configured upload directory.
        path: PathBuf,
        /// What failed.
        reason: String,
    },
}

/// Everything the server needs, fixed at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address, default `0.0.0.0`.
    pub host: String,
    /// Listen port, default `5000`.
    pub port: u16,
    /// Where uploads and their frame directories live. Served at `/uploads`.
    pub upload_dir: PathBuf,
    /// Unix permission bits applied to the upload directory at startup.
    pub upload_dir_mode: Option<u32>,
    /// Frames sampled per upload.
    pub frame_count: u64,
    /// JPEG quality of the sampled frames.
    pub jpeg_quality: u8,
    /// Request body cap for `/api/analyze`.
    pub max_upload_bytes: usize,
    /// Upper bound on one sampling run.
    pub sample_timeout: Duration,
    /// FFmpeg's own stderr verbosity.
    pub ffmpeg_log_level: FfmpegLogLevel,
    /// Vision endpoint, model and credentials.
    pub vision: VisionSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            upload_dir: PathBuf::from("public/uploads"),
            upload_dir_mode: None,
            frame_count: DEFAULT_FRAME_COUNT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            sample_timeout: Duration::from_secs(120),
            ffmpeg_log_level: FfmpegLogLevel::Error,
            vision: VisionSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults with process environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    ///
    /// Unset or blank variables leave the field unchanged.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get("VIDSIFT_HOST") {
            self.host = value;
        }
        if let Some(value) = get("VIDSIFT_PORT") {
            self.port = parse_value("VIDSIFT_PORT", &value)?;
        }
        if let Some(value) = get("VIDSIFT_UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(value);
        }
        if let Some(value) = get("VIDSIFT_UPLOAD_DIR_MODE") {
            self.upload_dir_mode = Some(parse_mode("VIDSIFT_UPLOAD_DIR_MODE", &value)?);
        }
        if let Some(value) = get("VIDSIFT_FRAME_COUNT") {
            self.frame_count = parse_value("VIDSIFT_FRAME_COUNT", &value)?;
        }
        if let Some(value) = get("VIDSIFT_JPEG_QUALITY") {
            self.jpeg_quality = parse_value("VIDSIFT_JPEG_QUALITY", &value)?;
        }
        if let Some(value) = get("VIDSIFT_MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = parse_value("VIDSIFT_MAX_UPLOAD_BYTES", &value)?;
        }
        if let Some(value) = get("VIDSIFT_SAMPLE_TIMEOUT_SECS") {
            self.sample_timeout =
                Duration::from_secs(parse_value("VIDSIFT_SAMPLE_TIMEOUT_SECS", &value)?);
        }
        if let Some(value) = get("VIDSIFT_FFMPEG_LOG_LEVEL") {
            self.ffmpeg_log_level = parse_value("VIDSIFT_FFMPEG_LOG_LEVEL", &value)?;
        }
        if let Some(value) = get("VIDSIFT_MODEL") {
            self.vision.model = value;
        }
        if let Some(value) = get("VIDSIFT_API_BASE") {
            self.vision.api_base = value;
        }
        if let Some(value) = get("VIDSIFT_MAX_TOKENS") {
            self.vision.max_tokens = parse_value("VIDSIFT_MAX_TOKENS", &value)?;
        }
        if let Some(value) = get("OPENAI_API_KEY") {
            self.vision.api_key = value;
        }
        Ok(())
    }

    /// Check values that do not touch the filesystem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_count == 0 {
            return Err(invalid("frame_count", "0", "must be at least 1"));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(invalid(
                "jpeg_quality",
                &self.jpeg_quality.to_string(),
                "must be within 1..=100",
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(invalid("max_upload_bytes", "0", "must be positive"));
        }
        if self.sample_timeout.is_zero() {
            return Err(invalid("sample_timeout", "0", "must be positive"));
        }
        if self.vision.model.trim().is_empty() {
            return Err(invalid("model", "", "must not be empty"));
        }
        if self.vision.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(())
    }

    /// Create the upload directory, apply the configured mode, and prove it
    /// is writable by creating and removing a probe file.
    pub fn prepare_upload_dir(&self) -> Result<(), ConfigError> {
        let path = &self.upload_dir;
        let upload_error = |reason: String| ConfigError::UploadDir {
            path: path.clone(),
            reason,
        };

        fs::create_dir_all(path).map_err(|error| upload_error(error.to_string()))?;

        if let Some(mode) = self.upload_dir_mode {
            set_mode(path, mode).map_err(|error| upload_error(format!("chmod {mode:o}: {error}")))?;
        }

        let probe = path.join(PERMISSION_PROBE);
        fs::write(&probe, b"test").map_err(|error| upload_error(format!("not writable: {error}")))?;
        fs::remove_file(&probe).map_err(|error| upload_error(error.to_string()))?;

        tracing::info!(path = %path.display(), "Upload directory is writable");
        Ok(())
    }

    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_value<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|error: T::Err| invalid(key, value, &error.to_string()))
}

fn parse_mode(key: &'static str, value: &str) -> Result<u32, ConfigError> {
    let digits = value.trim().trim_start_matches("0o");
    let mode = u32::from_str_radix(digits, 8).map_err(|error| invalid(key, value, &error.to_string()))?;
    if mode > 0o7777 {
        return Err(invalid(key, value, "not a permission mode"));
    }
    Ok(mode)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    tracing::warn!("upload_dir_mode is ignored on this platform");
    Ok(())
}
