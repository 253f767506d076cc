use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{FaceRole, FaceSwapError, Result};
use crate::face::{composite_faces, FaceEngine, SelectionPolicy, SourceFace};
use crate::media::Image;
use crate::video::backend::VideoBackend;
use crate::video::ffmpeg::FfmpegBackend;
use crate::video::muxer::{AudioMuxer, FfmpegMuxer};
use crate::video::progress::ProgressObserver;
use crate::video::types::{VideoJob, VideoStage, VideoSummary, STREAM_START};

/// Swaps one source face into every face of every frame of a video
///
/// The job runs `Init -> DetectSource -> OpenVideo -> StreamFrames -> Remux
/// -> Done`. Frames are decoded, swapped and encoded one at a time into a
/// temporary video-only file, then the original audio is muxed back in.
/// Decoder and encoder processes and the temporary file are released on
/// every exit path.
pub struct VideoSwapper<'a> {
    engine: &'a dyn FaceEngine,
    backend: Box<dyn VideoBackend + 'a>,
    muxer: Box<dyn AudioMuxer + 'a>,
    progress_interval: u64,
    strict_remux: bool,
}

impl<'a> VideoSwapper<'a> {
    pub fn new(
        engine: &'a dyn FaceEngine,
        backend: Box<dyn VideoBackend + 'a>,
        muxer: Box<dyn AudioMuxer + 'a>,
    ) -> Self {
        Self {
            engine,
            backend,
            muxer,
            progress_interval: 10,
            strict_remux: false,
        }
    }

    /// ffmpeg-backed swapper configured from `config`
    pub fn with_ffmpeg(engine: &'a dyn FaceEngine, config: &Config) -> Self {
        Self::new(
            engine,
            Box::new(FfmpegBackend::new(&config.video)),
            Box::new(FfmpegMuxer::from_config(config)),
        )
        .progress_interval(config.video.progress_interval)
        .strict_remux(config.remux.strict)
    }

    /// Report streaming progress every `frames` frames
    pub fn progress_interval(mut self, frames: u64) -> Self {
        self.progress_interval = frames.max(1);
        self
    }

    /// Fail the job when the audio remux fails instead of returning a silent video
    pub fn strict_remux(mut self, strict: bool) -> Self {
        self.strict_remux = strict;
        self
    }

    /// Swap the largest face of `source` into every face of `target_video`
    ///
    /// The result is written to `output`, or to a new temporary `.mp4` file
    /// that is left in place for the caller when `output` is `None`.
    pub fn swap(
        &self,
        source: Image,
        target_video: &Path,
        output: Option<&Path>,
        progress: &mut dyn ProgressObserver,
    ) -> Result<VideoSummary> {
        let mut job = VideoJob::new(target_video);
        progress.report(0.0, "Starting video face swap...");

        let result = self.run_job(&mut job, source, output, progress);
        if let Err(e) = &result {
            warn!("Video job failed during {}: {}", job.stage, e);
            job.stage = VideoStage::Failed;
        }
        result
    }

    fn run_job(
        &self,
        job: &mut VideoJob,
        source: Image,
        output: Option<&Path>,
        progress: &mut dyn ProgressObserver,
    ) -> Result<VideoSummary> {
        let source = source.to_bgr();

        self.enter(job, VideoStage::DetectSource);
        progress.report(0.0, "Detecting source face...");
        let source_face = self.detect_source(&source)?;

        self.enter(job, VideoStage::OpenVideo);
        progress.report(0.05, "Opening video file...");
        let mut frames_in = self.backend.open_source(&job.target)?;
        let properties = frames_in.properties().clone();
        job.properties = Some(properties.clone());

        let temp_video = tempfile::Builder::new()
            .prefix("face_swap_")
            .suffix("_temp.mp4")
            .tempfile()?
            .into_temp_path();
        job.temp_video = Some(temp_video.to_path_buf());
        let mut frames_out = self.backend.open_sink(&temp_video, &properties)?;

        self.enter(job, VideoStage::StreamFrames);
        progress.report(
            STREAM_START,
            &format!("Processing frames (0/{})...", properties.frame_count_estimate),
        );

        while let Some(frame) = frames_in.read_frame()? {
            job.frames_processed += 1;

            let faces = self.engine.detect(&frame)?;
            let frame = if faces.is_empty() {
                frame
            } else {
                let swapped = composite_faces(self.engine, frame, &faces, &source_face)?;
                job.faces_swapped += faces.len() as u64;
                swapped
            };

            frames_out.write_frame(&frame)?;
            debug!("Frame {}: {} face(s)", job.frames_processed, faces.len());

            if job.frames_processed % self.progress_interval == 0 {
                progress.report(
                    job.stream_fraction(),
                    &format!(
                        "Processing frames ({}/{})...",
                        job.frames_processed, properties.frame_count_estimate
                    ),
                );
            }
        }

        self.enter(job, VideoStage::Remux);
        frames_in.close()?;
        frames_out.close()?;
        drop(frames_in);
        drop(frames_out);

        progress.report(0.85, "Adding audio to video...");
        let (output, pending_output) = match output {
            Some(path) => (path.to_path_buf(), None),
            None => {
                let pending = Self::temporary_output()?;
                (pending.to_path_buf(), Some(pending))
            }
        };
        job.output = Some(output.clone());

        let audio_muxed = self.remux(temp_video, &job.target, &output)?;
        if let Some(pending) = pending_output {
            pending.keep().map_err(|e| e.error)?;
        }

        self.enter(job, VideoStage::Done);
        progress.report(1.0, "Video processing complete!");

        let summary = VideoSummary {
            output,
            frames_processed: job.frames_processed,
            faces_swapped: job.faces_swapped,
            audio_muxed,
        };
        info!("{}", summary.status());
        Ok(summary)
    }

    fn enter(&self, job: &mut VideoJob, stage: VideoStage) {
        debug!("Video job {:?}: {} -> {}", job.target, job.stage, stage);
        job.stage = stage;
    }

    fn detect_source(&self, source: &Image) -> Result<SourceFace> {
        let detections = self.engine.detect(source)?;
        SelectionPolicy::LargestArea
            .select(&detections)
            .ok_or(FaceSwapError::NoFaceDetected(FaceRole::Source))
    }

    /// Fresh `.mp4` path, deleted on drop unless the job completes
    fn temporary_output() -> Result<TempPath> {
        let path = tempfile::Builder::new()
            .prefix("face_swap_")
            .suffix(".mp4")
            .tempfile()?
            .into_temp_path();
        Ok(path)
    }

    /// Mux the original audio back in, then delete the video-only file
    ///
    /// Returns whether the remux succeeded. In strict mode a failed remux is
    /// an error and any partial output is removed; otherwise the job still
    /// completes and the output may lack audio.
    fn remux(&self, temp_video: TempPath, target: &Path, output: &Path) -> Result<bool> {
        let result = self.muxer.remux(&temp_video, target, output);

        if let Err(e) = temp_video.close() {
            warn!("Failed to remove temporary video: {}", e);
        }

        match result {
            Ok(()) => Ok(true),
            Err(e) if self.strict_remux => {
                if output.exists() {
                    if let Err(remove_err) = std::fs::remove_file(output) {
                        warn!("Failed to remove partial output {:?}: {}", output, remove_err);
                    }
                }
                Err(e)
            }
            Err(e) => {
                warn!("Audio remux failed, output may have no audio: {}", e);
                Ok(false)
            }
        }
    }
}
