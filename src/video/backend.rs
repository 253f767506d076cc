use std::path::Path;

use crate::error::Result;
use crate::media::Image;
use crate::video::types::VideoProperties;

/// Sequential reader of decoded BGR frames
pub trait FrameSource {
    fn properties(&self) -> &VideoProperties;

    /// Next frame in stream order, or `None` once the stream is exhausted
    fn read_frame(&mut self) -> Result<Option<Image>>;

    /// Release the decoder; safe to call more than once
    fn close(&mut self) -> Result<()>;
}

/// Sequential writer of frames into a video-only file
pub trait FrameSink {
    /// Append one frame; its size must match the sink's fixed dimensions
    fn write_frame(&mut self, frame: &Image) -> Result<()>;

    /// Flush and finalize the file; safe to call more than once
    fn close(&mut self) -> Result<()>;
}

/// Opens frame sources and sinks for a video job
pub trait VideoBackend {
    fn open_source(&self, path: &Path) -> Result<Box<dyn FrameSource>>;

    fn open_sink(&self, path: &Path, properties: &VideoProperties) -> Result<Box<dyn FrameSink>>;
}
