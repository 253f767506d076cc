use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::VideoConfig;
use crate::error::{MediaError, Result};
use crate::media::{ColorSpace, Image};
use crate::video::backend::{FrameSink, FrameSource, VideoBackend};
use crate::video::types::VideoProperties;

/// [`VideoBackend`] that decodes and encodes through external ffmpeg processes
///
/// Frames travel as raw `bgr24` over the child's stdin/stdout, one frame at
/// a time. Stream properties come from ffprobe.
pub struct FfmpegBackend {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    codec: String,
    pixel_format: String,
}

impl FfmpegBackend {
    pub fn new(config: &VideoConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_path.clone(),
            ffprobe: config.ffprobe_path.clone(),
            codec: config.codec.clone(),
            pixel_format: config.pixel_format.clone(),
        }
    }

    /// Check that both ffmpeg and ffprobe can be started
    pub fn check_available(&self) -> bool {
        [&self.ffmpeg, &self.ffprobe].iter().all(|program| {
            Command::new(program)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|status| status.success())
                .unwrap_or(false)
        })
    }

    fn probe(&self, path: &Path) -> Result<VideoProperties> {
        let open_failed = |reason: String| MediaError::VideoOpenFailed {
            path: path.display().to_string(),
            reason,
        };

        let output = Command::new(&self.ffprobe)
            .args([
                "-v", "quiet",
                "-print_format", "json",
                "-show_streams",
                "-select_streams", "v:0",
            ])
            .arg(path)
            .output()
            .map_err(|e| open_failed(format!("ffprobe failed to start: {}", e)))?;

        if !output.status.success() {
            return Err(open_failed(format!("ffprobe exited with {}", output.status)).into());
        }

        parse_probe_output(&output.stdout).map_err(|reason| open_failed(reason).into())
    }
}

impl VideoBackend for FfmpegBackend {
    fn open_source(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        let properties = self.probe(path)?;
        info!(
            "Video metadata: {}x{} @ {:.2}fps, ~{} frames",
            properties.width, properties.height, properties.fps, properties.frame_count_estimate
        );

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(path)
            .arg("-an")
            .arg("-f")
            .arg("rawvideo")
            .arg("-pix_fmt")
            .arg("bgr24")
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = cmd.spawn().map_err(|e| MediaError::VideoOpenFailed {
            path: path.display().to_string(),
            reason: format!("ffmpeg failed to start: {}", e),
        })?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(MediaError::VideoOpenFailed {
                    path: path.display().to_string(),
                    reason: "failed to capture ffmpeg stdout".to_string(),
                }.into());
            }
        };

        Ok(Box::new(FfmpegFrameSource {
            properties,
            child: Some(child),
            stdout: Some(stdout),
        }))
    }

    fn open_sink(&self, path: &Path, properties: &VideoProperties) -> Result<Box<dyn FrameSink>> {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-f")
            .arg("rawvideo")
            .arg("-pix_fmt")
            .arg("bgr24")
            .arg("-s")
            .arg(format!("{}x{}", properties.width, properties.height))
            .arg("-r")
            .arg(properties.fps.to_string())
            .arg("-i")
            .arg("-")
            .arg("-an")
            .arg("-c:v")
            .arg(&self.codec)
            .arg("-pix_fmt")
            .arg(&self.pixel_format)
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        debug!("Encoding video-only stream to {:?} with {}", path, self.codec);

        let mut child = cmd.spawn().map_err(|e| MediaError::EncodingFailed {
            reason: format!("ffmpeg failed to start: {}", e),
        })?;

        let stdin = match child.stdin.take() {
            Some(stdin) => stdin,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(MediaError::EncodingFailed {
                    reason: "failed to capture ffmpeg stdin".to_string(),
                }.into());
            }
        };

        Ok(Box::new(FfmpegFrameSink {
            size: (properties.width, properties.height),
            child: Some(child),
            stdin: Some(stdin),
        }))
    }
}

struct FfmpegFrameSource {
    properties: VideoProperties,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
}

impl FrameSource for FfmpegFrameSource {
    fn properties(&self) -> &VideoProperties {
        &self.properties
    }

    fn read_frame(&mut self) -> Result<Option<Image>> {
        let stdout = match self.stdout.as_mut() {
            Some(stdout) => stdout,
            None => return Ok(None),
        };

        let mut buffer = vec![0u8; Image::buffer_len(self.properties.width, self.properties.height)];
        match stdout.read_exact(&mut buffer) {
            Ok(()) => {
                let frame = Image::from_raw(self.properties.width, self.properties.height, ColorSpace::Bgr, buffer)?;
                Ok(Some(frame))
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                // A trailing partial frame is dropped.
                self.stdout = None;
                Ok(None)
            }
            Err(e) => Err(MediaError::DecodingFailed { reason: e.to_string() }.into()),
        }
    }

    fn close(&mut self) -> Result<()> {
        let finished = self.stdout.is_none();
        self.stdout = None;

        if let Some(mut child) = self.child.take() {
            if !finished {
                let _ = child.kill();
            }
            let status = child.wait()?;
            if finished && !status.success() {
                warn!("ffmpeg decoder exited with {}", status);
            }
        }
        Ok(())
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

struct FfmpegFrameSink {
    size: (u32, u32),
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl FrameSink for FfmpegFrameSink {
    fn write_frame(&mut self, frame: &Image) -> Result<()> {
        if frame.dimensions() != self.size {
            return Err(MediaError::FrameSizeMismatch {
                expected: self.size,
                actual: frame.dimensions(),
            }.into());
        }

        let stdin = self.stdin.as_mut().ok_or_else(|| MediaError::EncodingFailed {
            reason: "sink already closed".to_string(),
        })?;

        let written = match frame.color_space() {
            ColorSpace::Bgr => stdin.write_all(frame.as_bytes()),
            ColorSpace::Rgb => stdin.write_all(frame.clone().to_bgr().as_bytes()),
        };
        written.map_err(|e| MediaError::EncodingFailed { reason: e.to_string() })?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        // Dropping stdin signals end of stream to the encoder.
        self.stdin = None;

        if let Some(mut child) = self.child.take() {
            let status = child.wait()?;
            if !status.success() {
                return Err(MediaError::EncodingFailed {
                    reason: format!("ffmpeg exited with {}", status),
                }.into());
            }
        }
        Ok(())
    }
}

impl Drop for FfmpegFrameSink {
    fn drop(&mut self) {
        self.stdin = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
}

#[derive(Debug, Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

impl ProbeStream {
    /// Display rotation in degrees, from the display matrix or the legacy `rotate` tag
    fn rotation(&self) -> f64 {
        self.side_data_list
            .iter()
            .find_map(|side_data| side_data.rotation)
            .or_else(|| self.tags.get("rotate").and_then(|r| r.trim().parse().ok()))
            .unwrap_or(0.0)
    }
}

/// Turn ffprobe's JSON into stream properties
fn parse_probe_output(json: &[u8]) -> std::result::Result<VideoProperties, String> {
    let probe: ProbeOutput = serde_json::from_slice(json).map_err(|e| format!("invalid ffprobe output: {}", e))?;
    let stream = probe.streams.into_iter().next().ok_or("no video stream")?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err("video stream has no dimensions".to_string()),
    };

    // ffmpeg autorotates while decoding, so quarter-turn streams arrive transposed.
    let quarter_turns = (stream.rotation() / 90.0).round() as i64;
    let (width, height) = if quarter_turns.rem_euclid(2) == 1 {
        (height, width)
    } else {
        (width, height)
    };

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .ok_or("video stream has no frame rate")?;

    let frame_count_estimate = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .or_else(|| {
            stream
                .duration
                .as_deref()
                .and_then(|d| d.parse::<f64>().ok())
                .map(|seconds| (seconds * fps).round() as u64)
        })
        .unwrap_or(0);

    Ok(VideoProperties { width, height, fps, frame_count_estimate })
}

/// Parse ffprobe rates like "30000/1001" or "25"
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let fps = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };

    (fps.is_finite() && fps > 0.0).then_some(fps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("24"), Some(24.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }

    #[test]
    fn test_probe_prefers_nb_frames() {
        let json = br#"{"streams":[{"width":1280,"height":720,"avg_frame_rate":"30/1",
            "r_frame_rate":"30/1","nb_frames":"301","duration":"10.0"}]}"#;
        let props = parse_probe_output(json).unwrap();
        assert_eq!((props.width, props.height), (1280, 720));
        assert_eq!(props.fps, 30.0);
        assert_eq!(props.frame_count_estimate, 301);
    }

    #[test]
    fn test_probe_estimates_from_duration() {
        // Matroska streams usually carry no nb_frames.
        let json = br#"{"streams":[{"width":640,"height":480,"avg_frame_rate":"0/0",
            "r_frame_rate":"25/1","duration":"4.0"}]}"#;
        let props = parse_probe_output(json).unwrap();
        assert_eq!(props.fps, 25.0);
        assert_eq!(props.frame_count_estimate, 100);
    }

    #[test]
    fn test_display_matrix_rotation_swaps_dimensions() {
        let json = br#"{"streams":[{"width":1920,"height":1080,"r_frame_rate":"30/1",
            "side_data_list":[{"side_data_type":"Display Matrix","rotation":-90}]}]}"#;
        let props = parse_probe_output(json).unwrap();
        assert_eq!((props.width, props.height), (1080, 1920));

        let json = br#"{"streams":[{"width":1920,"height":1080,"r_frame_rate":"30/1",
            "side_data_list":[{"side_data_type":"Display Matrix","rotation":180}]}]}"#;
        let props = parse_probe_output(json).unwrap();
        assert_eq!((props.width, props.height), (1920, 1080));
    }

    #[test]
    fn test_legacy_rotate_tag_swaps_dimensions() {
        let json = br#"{"streams":[{"width":640,"height":360,"r_frame_rate":"25/1",
            "tags":{"rotate":"270","language":"und"}}]}"#;
        let props = parse_probe_output(json).unwrap();
        assert_eq!((props.width, props.height), (360, 640));
    }

    #[test]
    fn test_probe_unknown_frame_count() {
        let json = br#"{"streams":[{"width":8,"height":8,"r_frame_rate":"10/1"}]}"#;
        assert_eq!(parse_probe_output(json).unwrap().frame_count_estimate, 0);
    }

    #[test]
    fn test_probe_without_video_stream() {
        assert!(parse_probe_output(br#"{"streams":[]}"#).is_err());
        assert!(parse_probe_output(b"{}").is_err());
        assert!(parse_probe_output(b"not json").is_err());
    }

    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, body: &str) -> VideoConfig {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        VideoConfig {
            ffmpeg_path: path,
            ..VideoConfig::default()
        }
    }

    #[cfg(unix)]
    fn small_properties() -> VideoProperties {
        VideoProperties {
            width: 200,
            height: 200,
            fps: 25.0,
            frame_count_estimate: 0,
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_chatty_encoder_does_not_stall_writes() {
        let dir = tempfile::tempdir().unwrap();
        // Far more diagnostics than a pipe buffer holds, before reading any frame.
        let config = fake_ffmpeg(dir.path(), "head -c 1000000 /dev/zero >&2\ncat > /dev/null");
        let backend = FfmpegBackend::new(&config);

        let mut sink = backend.open_sink(&dir.path().join("out.mp4"), &small_properties()).unwrap();
        let frame = Image::new_filled(200, 200, ColorSpace::Bgr, [1, 2, 3]);
        for _ in 0..5 {
            sink.write_frame(&frame).unwrap();
        }
        sink.close().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_encoder_is_reported_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let config = fake_ffmpeg(dir.path(), "cat > /dev/null\nexit 1");
        let backend = FfmpegBackend::new(&config);

        let mut sink = backend.open_sink(&dir.path().join("out.mp4"), &small_properties()).unwrap();
        sink.write_frame(&Image::new_filled(200, 200, ColorSpace::Bgr, [0, 0, 0])).unwrap();

        let err = sink.close().unwrap_err();
        assert!(matches!(
            err,
            crate::error::FaceSwapError::Media(MediaError::EncodingFailed { .. })
        ));
    }

    #[test]
    fn test_missing_ffprobe_fails_open() {
        let config = VideoConfig {
            ffprobe_path: PathBuf::from("/nonexistent/ffprobe"),
            ..VideoConfig::default()
        };
        let backend = FfmpegBackend::new(&config);

        let err = backend.open_source(Path::new("clip.mp4")).err().unwrap();
        assert!(matches!(
            err,
            crate::error::FaceSwapError::Media(MediaError::VideoOpenFailed { .. })
        ));
    }
}
