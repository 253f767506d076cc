use serde::{Deserialize, Serialize};

/// Axis-aligned face bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    /// Area of the box; degenerate boxes have zero area
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from([x0, y0, x1, y1]: [f32; 4]) -> Self {
        Self::new(x0, y0, x1, y1)
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x0, b.y0, b.x1, b.y1]
    }
}

/// One face found by a [`FaceEngine`](crate::face::FaceEngine)
///
/// Landmarks and embedding belong to the engine; the pipeline only reads the
/// bounding box and hands the rest back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    pub bbox: BoundingBox,

    #[serde(default)]
    pub score: f32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub landmarks: Vec<[f32; 2]>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

impl FaceDetection {
    /// A detection with only a bounding box
    pub fn from_bbox(bbox: BoundingBox) -> Self {
        Self {
            bbox,
            score: 1.0,
            landmarks: Vec::new(),
            embedding: Vec::new(),
        }
    }

    pub fn area(&self) -> f32 {
        self.bbox.area()
    }
}

/// The identity injected into every target face of a job
///
/// Chosen once per job and never re-detected; the wrapped detection is only
/// reachable by shared reference.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFace(FaceDetection);

impl SourceFace {
    pub fn detection(&self) -> &FaceDetection {
        &self.0
    }
}

/// How a source face is picked from the source image's detections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Largest bounding-box area; the first of equal maxima wins.
    /// Used for single images and videos.
    LargestArea,

    /// The detector's first detection. Used by batch runs.
    FirstDetected,
}

impl SelectionPolicy {
    /// Pick the source face, or `None` when there are no detections
    pub fn select(self, detections: &[FaceDetection]) -> Option<SourceFace> {
        let chosen = match self {
            Self::FirstDetected => detections.first(),
            Self::LargestArea => detections.iter().fold(None, |best: Option<&FaceDetection>, face| {
                match best {
                    Some(current) if current.area() >= face.area() => Some(current),
                    _ => Some(face),
                }
            }),
        };

        chosen.cloned().map(SourceFace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(x0: f32, y0: f32, x1: f32, y1: f32) -> FaceDetection {
        FaceDetection::from_bbox(BoundingBox::new(x0, y0, x1, y1))
    }

    #[test]
    fn test_bbox_area() {
        assert_eq!(BoundingBox::new(10.0, 20.0, 30.0, 25.0).area(), 100.0);
        assert_eq!(BoundingBox::new(5.0, 5.0, 1.0, 9.0).area(), 0.0);
    }

    #[test]
    fn test_largest_area_wins() {
        let faces = vec![face(0.0, 0.0, 10.0, 10.0), face(0.0, 0.0, 30.0, 30.0), face(0.0, 0.0, 20.0, 20.0)];
        let chosen = SelectionPolicy::LargestArea.select(&faces).unwrap();
        assert_eq!(chosen.detection(), &faces[1]);
    }

    #[test]
    fn test_largest_area_tie_keeps_first() {
        let faces = vec![face(0.0, 0.0, 10.0, 10.0), face(50.0, 50.0, 60.0, 60.0)];
        let chosen = SelectionPolicy::LargestArea.select(&faces).unwrap();
        assert_eq!(chosen.detection().bbox.x0, 0.0);
    }

    #[test]
    fn test_first_detected_ignores_size() {
        let faces = vec![face(0.0, 0.0, 5.0, 5.0), face(0.0, 0.0, 50.0, 50.0)];
        let chosen = SelectionPolicy::FirstDetected.select(&faces).unwrap();
        assert_eq!(chosen.detection(), &faces[0]);
    }

    #[test]
    fn test_selection_is_idempotent() {
        let faces = vec![face(1.0, 1.0, 8.0, 9.0), face(2.0, 2.0, 9.0, 10.0)];
        let first = SelectionPolicy::LargestArea.select(&faces).unwrap();
        let second = SelectionPolicy::LargestArea.select(&faces).unwrap();
        assert_eq!(first.detection().bbox, second.detection().bbox);
    }

    #[test]
    fn test_empty_detections_select_nothing() {
        assert!(SelectionPolicy::LargestArea.select(&[]).is_none());
        assert!(SelectionPolicy::FirstDetected.select(&[]).is_none());
    }

    #[test]
    fn test_detection_json_shape() {
        let json = r#"{"bbox":[1,2,3,4],"score":0.9}"#;
        let detection: FaceDetection = serde_json::from_str(json).unwrap();
        assert_eq!(detection.bbox, BoundingBox::new(1.0, 2.0, 3.0, 4.0));
        assert!(detection.landmarks.is_empty());
    }
}
