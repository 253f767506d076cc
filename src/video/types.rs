use std::fmt;
use std::path::PathBuf;

/// Stream properties read once when a video is opened
#[derive(Debug, Clone, PartialEq)]
pub struct VideoProperties {
    pub width: u32,
    pub height: u32,
    pub fps: f64,

    /// Container's frame count, or an estimate from duration; 0 when unknown.
    /// Only ever used for progress reporting.
    pub frame_count_estimate: u64,
}

/// Where a video job currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoStage {
    Init,
    DetectSource,
    OpenVideo,
    StreamFrames,
    Remux,
    Done,
    Failed,
}

impl fmt::Display for VideoStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::DetectSource => "detect-source",
            Self::OpenVideo => "open-video",
            Self::StreamFrames => "stream-frames",
            Self::Remux => "remux",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Mutable state of one video swap
#[derive(Debug, Clone)]
pub struct VideoJob {
    pub stage: VideoStage,
    pub target: PathBuf,
    pub properties: Option<VideoProperties>,
    pub frames_processed: u64,
    pub faces_swapped: u64,
    pub temp_video: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

impl VideoJob {
    pub fn new<P: Into<PathBuf>>(target: P) -> Self {
        Self {
            stage: VideoStage::Init,
            target: target.into(),
            properties: None,
            frames_processed: 0,
            faces_swapped: 0,
            temp_video: None,
            output: None,
        }
    }

    pub fn frame_count_estimate(&self) -> u64 {
        self.properties.as_ref().map(|p| p.frame_count_estimate).unwrap_or(0)
    }

    /// Overall job progress while streaming frames
    ///
    /// Frame streaming owns the 0.1..0.8 band of the job; setup sits below it
    /// and remuxing above. An unknown or undercounted total never pushes the
    /// value outside the band.
    pub fn stream_fraction(&self) -> f32 {
        let total = self.frame_count_estimate();
        if total == 0 {
            return STREAM_START;
        }
        let done = (self.frames_processed as f64 / total as f64).min(1.0) as f32;
        STREAM_START + done * STREAM_SPAN
    }
}

pub(crate) const STREAM_START: f32 = 0.1;
pub(crate) const STREAM_SPAN: f32 = 0.7;

/// Result of a completed video swap
#[derive(Debug, Clone)]
pub struct VideoSummary {
    pub output: PathBuf,
    pub frames_processed: u64,
    pub faces_swapped: u64,

    /// False when the remux step failed and the output may lack audio
    pub audio_muxed: bool,
}

impl VideoSummary {
    pub fn status(&self) -> String {
        let mut status = format!(
            "Success! Processed {} frames, swapped {} face instances.",
            self.frames_processed, self.faces_swapped
        );
        if !self.audio_muxed {
            status.push_str(" Warning: audio could not be added.");
        }
        status
    }
}
