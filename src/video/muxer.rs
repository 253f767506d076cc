use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::config::Config;
use crate::error::{ExternalToolError, Result};

/// Combines a video-only file with the audio track of another file
pub trait AudioMuxer {
    /// Write `output` with the video stream of `video_only` and the audio of
    /// `audio_source`; a missing audio track must not be an error
    fn remux(&self, video_only: &Path, audio_source: &Path, output: &Path) -> Result<()>;
}

/// [`AudioMuxer`] running ffmpeg
///
/// The video stream is copied as-is, audio is re-encoded, the audio mapping
/// is optional and the output stops at the shorter of the two streams.
pub struct FfmpegMuxer {
    ffmpeg: PathBuf,
    audio_codec: String,
}

impl FfmpegMuxer {
    pub fn new<P: Into<PathBuf>>(ffmpeg: P, audio_codec: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            audio_codec: audio_codec.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.video.ffmpeg_path.clone(), config.remux.audio_codec.clone())
    }

    /// Full ffmpeg argument list for one remux
    pub fn arguments(&self, video_only: &Path, audio_source: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error"]
            .into_iter()
            .map(OsString::from)
            .collect();

        args.push("-i".into());
        args.push(video_only.into());
        args.push("-i".into());
        args.push(audio_source.into());

        for arg in ["-c:v", "copy", "-c:a"] {
            args.push(arg.into());
        }
        args.push(self.audio_codec.as_str().into());

        for arg in ["-map", "0:v:0", "-map", "1:a:0?", "-shortest", "-y"] {
            args.push(arg.into());
        }
        args.push(output.into());
        args
    }
}

impl AudioMuxer for FfmpegMuxer {
    fn remux(&self, video_only: &Path, audio_source: &Path, output: &Path) -> Result<()> {
        let tool = self.ffmpeg.display().to_string();
        debug!("Remuxing {:?} + audio of {:?} -> {:?}", video_only, audio_source, output);

        let result = Command::new(&self.ffmpeg)
            .args(self.arguments(video_only, audio_source, output))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ExternalToolError::SpawnFailed {
                tool: tool.clone(),
                reason: e.to_string(),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ExternalToolError::NonZeroExit {
                tool,
                status: result.status.to_string(),
                stderr: stderr.trim().to_string(),
            }.into());
        }

        Ok(())
    }
}
