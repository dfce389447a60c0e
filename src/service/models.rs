use std::env;
use std::path::PathBuf;

use serde::Deserialize;

use crate::domain::MediaFormat;

/// Progress event emitted by the download service while a transfer runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// e.g. "downloading", "finished", "error"
    pub phase: String,
    pub percent: String,
}

impl ProgressEvent {
    pub fn new(phase: impl Into<String>, percent: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            percent: percent.into(),
        }
    }

    pub fn is_downloading(&self) -> bool {
        self.phase == "downloading"
    }
}

/// Subset of the yt-dlp progress dictionary we care about
#[derive(Debug, Clone, Deserialize)]
pub struct RawProgress {
    pub status: String,
    #[serde(rename = "_percent_str", default)]
    pub percent_str: Option<String>,
}

/// Options handed to the download service for one url
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Audio codec to extract and transcode to
    pub codec_postprocessing: Option<String>,
    /// Container the downloaded format must use
    pub container_format: Option<String>,
    pub output_name_template: String,
    pub output_dir: PathBuf,
}

impl DownloadOptions {
    pub fn for_format(format: MediaFormat, config: &ServiceConfig) -> Self {
        let (codec_postprocessing, container_format) = match format {
            MediaFormat::Audio => (Some(config.audio_codec.clone()), None),
            MediaFormat::Video => (None, Some(config.container.clone())),
        };

        Self {
            codec_postprocessing,
            container_format,
            output_name_template: config.output_template.clone(),
            output_dir: config.output_dir.clone(),
        }
    }
}

pub const PROGRAM_ENV: &str = "MEDIA_QUEUE_YT_DLP";
pub const OUTPUT_DIR_ENV: &str = "MEDIA_QUEUE_OUTPUT_DIR";

/// Configuration for the download service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub program: PathBuf,
    pub output_dir: PathBuf,
    pub output_template: String,
    pub audio_codec: String,
    pub container: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let program = if cfg!(target_os = "windows") {
            "yt-dlp.exe"
        } else {
            "yt-dlp"
        };

        Self {
            program: PathBuf::from(program),
            output_dir: PathBuf::from("."),
            output_template: "%(title)s.%(ext)s".to_string(),
            audio_codec: "mp3".to_string(),
            container: "mp4".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Defaults, overridden by `MEDIA_QUEUE_YT_DLP` and `MEDIA_QUEUE_OUTPUT_DIR`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(program) = env::var_os(PROGRAM_ENV).filter(|v| !v.is_empty()) {
            config.program = PathBuf::from(program);
        }
        if let Some(dir) = env::var_os(OUTPUT_DIR_ENV).filter(|v| !v.is_empty()) {
            config.output_dir = PathBuf::from(dir);
        }
        config
    }
}
