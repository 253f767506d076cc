use tracing::debug;

use crate::error::{EngineError, Result};
use crate::face::types::{FaceDetection, SourceFace};
use crate::media::Image;

/// Face detection and identity swap capability
///
/// Implementations receive and return BGR images. The pipeline only ever
/// issues one call at a time and never mutates the engine, so an engine
/// handle can be shared by reference across sequential jobs.
pub trait FaceEngine: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str {
        "face-engine"
    }

    /// Detect every face in `image`, in the detector's enumeration order
    fn detect(&self, image: &Image) -> std::result::Result<Vec<FaceDetection>, EngineError>;

    /// Replace the face at `target` with the `source` identity and paste it back
    /// into a full-resolution copy of `image`
    fn swap(
        &self,
        image: Image,
        target: &FaceDetection,
        source: &SourceFace,
    ) -> std::result::Result<Image, EngineError>;
}

/// Paste `source` over every face in `targets`, in order
///
/// Each swap operates on the previous swap's output, which is what lets
/// several faces land in the same frame. Overlapping detections therefore
/// see each other's pasted pixels.
pub fn composite_faces(
    engine: &dyn FaceEngine,
    canvas: Image,
    targets: &[FaceDetection],
    source: &SourceFace,
) -> Result<Image> {
    let expected = canvas.dimensions();
    let mut canvas = canvas;

    for (index, target) in targets.iter().enumerate() {
        canvas = engine.swap(canvas, target, source)?;

        if canvas.dimensions() != expected {
            return Err(EngineError::DimensionsChanged {
                expected,
                actual: canvas.dimensions(),
            }.into());
        }

        debug!("Pasted face {}/{} at {:?}", index + 1, targets.len(), target.bbox);
    }

    Ok(canvas)
}
