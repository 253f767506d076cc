//! In-process engine for unit tests.
//!
//! Faces are encoded in the image itself: the red value of pixel (0, 0) is
//! the number of faces, and a red value of 255 makes detection fail. Every
//! swap bumps the blue value of pixel (0, 0), so the marker counts how many
//! swaps a buffer has been through.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::EngineError;
use crate::face::{BoundingBox, FaceDetection, FaceEngine, SourceFace};
use crate::media::{ColorSpace, Image};

pub(crate) const FAIL_DETECTION: u8 = 255;

pub(crate) struct ScriptedEngine {
    detect_calls: AtomicUsize,
    swap_calls: AtomicUsize,
    rgb_inputs: AtomicUsize,
    shrink: bool,
}

impl ScriptedEngine {
    pub(crate) fn pixel_coded() -> Self {
        Self {
            detect_calls: AtomicUsize::new(0),
            swap_calls: AtomicUsize::new(0),
            rgb_inputs: AtomicUsize::new(0),
            shrink: false,
        }
    }

    /// Swaps return an image one pixel narrower than their input
    pub(crate) fn shrinking_swaps(mut self) -> Self {
        self.shrink = true;
        self
    }

    /// An RGB image whose pixel (0, 0) announces `faces` faces
    pub(crate) fn image_with_faces(width: u32, height: u32, faces: u8) -> Image {
        let mut image = Image::new_filled(width, height, ColorSpace::Rgb, [40, 80, 120]);
        image.set_pixel(0, 0, [faces, 0, 0]);
        image
    }

    pub(crate) fn swap_marker(image: &Image) -> u8 {
        image.rgb_at(0, 0)[2]
    }

    pub(crate) fn detect_calls(&self) -> usize {
        self.detect_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn swap_calls(&self) -> usize {
        self.swap_calls.load(Ordering::SeqCst)
    }

    /// Number of calls that received an image not tagged BGR
    pub(crate) fn rgb_inputs(&self) -> usize {
        self.rgb_inputs.load(Ordering::SeqCst)
    }

    fn note_color(&self, image: &Image) {
        if image.color_space() != ColorSpace::Bgr {
            self.rgb_inputs.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl FaceEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn detect(&self, image: &Image) -> Result<Vec<FaceDetection>, EngineError> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        self.note_color(image);

        let count = image.rgb_at(0, 0)[0];
        if count == FAIL_DETECTION {
            return Err(EngineError::DetectionFailed {
                reason: "scripted failure".to_string(),
            });
        }

        // Later faces are larger, so largest-area and first-detected disagree.
        Ok((0..count)
            .map(|i| {
                let i = f32::from(i);
                FaceDetection::from_bbox(BoundingBox::new(i * 10.0, 0.0, i * 10.0 + 5.0 + i, 5.0 + i))
            })
            .collect())
    }

    fn swap(&self, image: Image, _target: &FaceDetection, _source: &SourceFace) -> Result<Image, EngineError> {
        self.swap_calls.fetch_add(1, Ordering::SeqCst);
        self.note_color(&image);

        let mut image = image;
        let [b, g, r] = image.pixel(0, 0);
        match image.color_space() {
            ColorSpace::Bgr => image.set_pixel(0, 0, [b.saturating_add(1), g, r]),
            ColorSpace::Rgb => image.set_pixel(0, 0, [b, g, r.saturating_add(1)]),
        }

        if self.shrink {
            let (w, h) = image.dimensions();
            return Ok(Image::new_filled(w.saturating_sub(1), h, image.color_space(), [0, 0, 0]));
        }
        Ok(image)
    }
}
