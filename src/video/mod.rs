//! # Video Module
//!
//! Frame-by-frame video face swapping. Frames are streamed through a
//! [`VideoBackend`] one at a time, swapped, encoded into a temporary
//! video-only file, and the original audio is muxed back in by an
//! [`AudioMuxer`].

pub mod backend;
pub mod ffmpeg;
pub mod muxer;
pub mod progress;
pub mod swapper;
pub mod types;

pub use backend::{FrameSink, FrameSource, VideoBackend};
pub use ffmpeg::FfmpegBackend;
pub use muxer::{AudioMuxer, FfmpegMuxer};
pub use progress::{FnProgress, LogProgress, NoProgress, ProgressObserver};
pub use swapper::VideoSwapper;
pub use types::{VideoJob, VideoProperties, VideoStage, VideoSummary};
