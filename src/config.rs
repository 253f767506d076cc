use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration for the face swap pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Video decode/encode settings
    pub video: VideoConfig,

    /// Audio remux settings
    pub remux: RemuxConfig,

    /// Batch directory settings
    pub batch: BatchConfig,

    /// External inference command
    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.video.validate()?;
        self.remux.validate()?;
        self.batch.validate()?;
        Ok(())
    }
}

/// Video processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Encoder for the video-only intermediate file (mpeg4 matches the classic mp4v fourcc)
    pub codec: String,

    /// Pixel format handed to the encoder
    pub pixel_format: String,

    /// Report progress every N frames
    pub progress_interval: u64,

    /// ffmpeg executable used for decoding, encoding and remuxing
    pub ffmpeg_path: PathBuf,

    /// ffprobe executable used to read stream properties
    pub ffprobe_path: PathBuf,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            codec: "mpeg4".to_string(),
            pixel_format: "yuv420p".to_string(),
            progress_interval: 10,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
        }
    }
}

impl VideoConfig {
    fn validate(&self) -> Result<()> {
        if self.codec.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "video.codec".to_string(),
                value: self.codec.clone()
            }.into());
        }

        if self.progress_interval == 0 {
            return Err(ConfigError::InvalidValue {
                key: "video.progress_interval".to_string(),
                value: self.progress_interval.to_string()
            }.into());
        }

        Ok(())
    }
}

/// Audio remux configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemuxConfig {
    /// Audio encoder for the muxed output
    pub audio_codec: String,

    /// Fail the job when the remux process exits unsuccessfully
    pub strict: bool,
}

impl Default for RemuxConfig {
    fn default() -> Self {
        Self {
            audio_codec: "aac".to_string(),
            strict: false,
        }
    }
}

impl RemuxConfig {
    fn validate(&self) -> Result<()> {
        if self.audio_codec.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "remux.audio_codec".to_string(),
                value: self.audio_codec.clone()
            }.into());
        }
        Ok(())
    }
}

/// Batch directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Accepted image extensions, compared case-insensitively
    pub extensions: Vec<String>,

    /// Prefix for files written to the output directory
    pub output_prefix: String,

    /// Sort directory listings by file name so "first image" is stable across platforms
    pub sort_entries: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            extensions: ["png", "jpg", "jpeg", "bmp", "webp"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            output_prefix: "swapped_".to_string(),
            sort_entries: true,
        }
    }
}

impl BatchConfig {
    fn validate(&self) -> Result<()> {
        if self.extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "batch.extensions".to_string(),
                value: "[]".to_string()
            }.into());
        }

        if self.output_prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "batch.output_prefix".to_string(),
                value: String::new()
            }.into());
        }

        Ok(())
    }
}

/// External inference program used by [`CommandEngine`](crate::face::CommandEngine)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Program to run; unset means no engine is configured
    pub command: Option<PathBuf>,

    /// Arguments placed before the `detect`/`swap` verb
    pub args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_config.toml");

        let mut original_config = Config::default();
        original_config.remux.strict = true;
        original_config.engine.command = Some(PathBuf::from("/opt/swapper/run"));

        original_config.save_to_file(&file_path).unwrap();
        let loaded_config = Config::from_file(&file_path).unwrap();

        assert!(loaded_config.remux.strict);
        assert_eq!(loaded_config.video.codec, "mpeg4");
        assert_eq!(loaded_config.engine.command, original_config.engine.command);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("partial.toml");
        std::fs::write(&file_path, "[batch]\noutput_prefix = \"fs_\"\n").unwrap();

        let config = Config::from_file(&file_path).unwrap();
        assert_eq!(config.batch.output_prefix, "fs_");
        assert_eq!(config.batch.extensions.len(), 5);
        assert_eq!(config.video.progress_interval, 10);
    }

    #[test]
    fn test_invalid_progress_interval() {
        let mut config = Config::default();
        config.video.progress_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_extension_list_rejected() {
        let mut config = Config::default();
        config.batch.extensions.clear();
        assert!(config.validate().is_err());
    }
}
