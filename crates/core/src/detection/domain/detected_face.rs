use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::bounding_box::BoundingBox;

/// One face found by a detector in one frame.
///
/// `landmarks` is the auxiliary descriptor swap and embedding backends use
/// for alignment; detectors without keypoints leave it empty.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedFace {
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub landmarks: Option<FaceLandmarks>,
}

impl DetectedFace {
    pub fn new(bbox: BoundingBox, confidence: f64) -> Self {
        Self {
            bbox,
            confidence,
            landmarks: None,
        }
    }

    pub fn with_landmarks(mut self, landmarks: FaceLandmarks) -> Self {
        self.landmarks = Some(landmarks);
        self
    }
}

/// Sorts faces by ascending top-left corner (x, then y).
///
/// Detector output order is not stable across frames; this gives every
/// frame the same left-to-right compositing order.
pub fn order_by_position(mut faces: Vec<DetectedFace>) -> Vec<DetectedFace> {
    faces.sort_by(|a, b| a.bbox.cmp_top_left(&b.bbox));
    faces
}

/// The face with the highest confidence. Ties keep the earliest face.
pub fn most_confident(faces: &[DetectedFace]) -> Option<&DetectedFace> {
    faces.iter().fold(None, |best: Option<&DetectedFace>, face| match best {
        Some(b) if b.confidence >= face.confidence => Some(b),
        _ => Some(face),
    })
}
