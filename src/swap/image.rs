use std::path::Path;

use tracing::{debug, info};

use crate::error::{FaceRole, FaceSwapError, Result};
use crate::face::{composite_faces, FaceEngine, SelectionPolicy};
use crate::media::{Image, MediaLoader};

/// A successfully swapped image, always RGB and at the target's resolution
#[derive(Debug, Clone)]
pub struct SwappedImage {
    image: Image,
    faces_swapped: usize,
}

impl SwappedImage {
    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn into_image(self) -> Image {
        self.image
    }

    /// Number of target faces the source was pasted into
    pub fn faces_swapped(&self) -> usize {
        self.faces_swapped
    }

    pub fn status(&self) -> String {
        format!(
            "Success! Swapped {} face(s). Output matches target image resolution ({}x{}).",
            self.faces_swapped,
            self.image.width(),
            self.image.height()
        )
    }
}

/// Human-readable status for either outcome of a swap
pub fn status_line(result: &Result<SwappedImage>) -> String {
    match result {
        Ok(swapped) => swapped.status(),
        Err(e) => format!("Error: {}", e.user_message()),
    }
}

/// Swaps one source face into every face of a single target image
pub struct SingleImageSwapper<'a> {
    engine: &'a dyn FaceEngine,
}

impl<'a> SingleImageSwapper<'a> {
    pub fn new(engine: &'a dyn FaceEngine) -> Self {
        Self { engine }
    }

    /// Swap the largest face of `source` into every face of `target`
    ///
    /// Either input may be RGB or BGR. On error no image is returned, so a
    /// half-swapped target can never be mistaken for a result.
    pub fn swap(&self, source: Image, target: Image) -> Result<SwappedImage> {
        let source = source.to_bgr();
        let target = target.to_bgr();
        let original_size = target.dimensions();

        let source_faces = self.engine.detect(&source)?;
        let source_face = SelectionPolicy::LargestArea
            .select(&source_faces)
            .ok_or(FaceSwapError::NoFaceDetected(FaceRole::Source))?;
        debug!(
            "Selected source face {:?} out of {} detection(s)",
            source_face.detection().bbox,
            source_faces.len()
        );

        let target_faces = self.engine.detect(&target)?;
        if target_faces.is_empty() {
            return Err(FaceSwapError::NoFaceDetected(FaceRole::Target));
        }

        let result = composite_faces(self.engine, target, &target_faces, &source_face)?.to_rgb();
        debug_assert_eq!(result.dimensions(), original_size);

        info!(
            "Swapped {} face(s) at {}x{} using {} engine",
            target_faces.len(),
            original_size.0,
            original_size.1,
            self.engine.name()
        );

        Ok(SwappedImage {
            image: result,
            faces_swapped: target_faces.len(),
        })
    }

    /// Load `source` and `target` from disk, swap, and write the result to `output`
    pub fn swap_files<P: AsRef<Path>>(&self, source: P, target: P, output: P) -> Result<SwappedImage> {
        let source = MediaLoader::load(source)?;
        let target = MediaLoader::load(target)?;

        let swapped = self.swap(source, target)?;
        MediaLoader::save(swapped.image(), output.as_ref())?;

        info!("Saved swapped image to {:?}", output.as_ref());
        Ok(swapped)
    }
}
