use std::sync::Arc;

use crate::detection::domain::detected_face::most_confident;
use crate::detection::domain::face_detector::FaceDetector;
use crate::identity::domain::face_embedder::FaceEmbedder;
use crate::identity::domain::identity::Identity;
use crate::shared::frame::Frame;
use crate::shared::swap_error::SwapError;

/// Locks the single source identity of a request from its reference image.
///
/// When the reference shows several faces, the most confident detection
/// wins (earliest on ties).
pub struct IdentityExtractor {
    detector: Arc<dyn FaceDetector>,
    embedder: Arc<dyn FaceEmbedder>,
}

impl IdentityExtractor {
    pub fn new(detector: Arc<dyn FaceDetector>, embedder: Arc<dyn FaceEmbedder>) -> Self {
        Self { detector, embedder }
    }

    pub fn extract(&self, reference: &Frame) -> Result<Identity, SwapError> {
        let rgb = reference.to_rgb();
        let faces = self
            .detector
            .detect(&rgb)
            .map_err(|e| SwapError::Inference(format!("reference face detection: {e}")))?;

        let face = most_confident(&faces).ok_or(SwapError::NoFaceDetected)?;
        log::info!(
            "Reference image: {} face(s), locked face at ({:.0}, {:.0}) with confidence {:.3}",
            faces.len(),
            face.bbox.x1,
            face.bbox.y1,
            face.confidence
        );

        let embedding = self
            .embedder
            .embed(&rgb, face)
            .map_err(|e| SwapError::Inference(format!("reference face embedding: {e}")))?;
        if embedding.is_empty() {
            return Err(SwapError::Inference("embedder returned an empty vector".into()));
        }

        Ok(Identity::new(embedding, face.confidence, face.bbox))
    }
}
