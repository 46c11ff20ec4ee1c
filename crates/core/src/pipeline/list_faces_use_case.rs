use std::sync::Arc;

use serde::Serialize;

use crate::animation::domain::still_image_reader::StillImageReader;
use crate::detection::domain::detected_face::{order_by_position, DetectedFace};
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::swap_error::SwapError;

/// Face rectangle as reported to callers: top-left corner plus size.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FaceBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FaceSummary {
    pub index: usize,
    pub bbox: FaceBox,
    pub confidence: f64,
}

impl FaceSummary {
    fn from_face(index: usize, face: &DetectedFace) -> Self {
        Self {
            index,
            bbox: FaceBox {
                x: face.bbox.x1,
                y: face.bbox.y1,
                width: face.bbox.width(),
                height: face.bbox.height(),
            },
            confidence: face.confidence,
        }
    }
}

/// Detects faces in a single image so a caller can check a reference
/// before submitting a swap.
///
/// Faces are listed in the same left-to-right order the swap pipeline
/// composites them in.
pub struct ListFacesUseCase {
    image_reader: Arc<dyn StillImageReader>,
    detector: Arc<dyn FaceDetector>,
}

impl ListFacesUseCase {
    pub fn new(image_reader: Arc<dyn StillImageReader>, detector: Arc<dyn FaceDetector>) -> Self {
        Self {
            image_reader,
            detector,
        }
    }

    pub fn execute(&self, image_bytes: &[u8]) -> Result<Vec<FaceSummary>, SwapError> {
        let frame = self
            .image_reader
            .read(image_bytes)
            .map_err(|e| SwapError::ImageLoad(e.to_string()))?
            .to_rgb();
        let faces = self
            .detector
            .detect(&frame)
            .map_err(|e| SwapError::Inference(format!("face detection: {e}")))?;

        log::debug!("Listed {} face(s)", faces.len());
        Ok(order_by_position(faces)
            .iter()
            .enumerate()
            .map(|(i, face)| FaceSummary::from_face(i, face))
            .collect())
    }
}
