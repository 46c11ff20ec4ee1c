use crate::detection::domain::detected_face::DetectedFace;
use crate::shared::frame::Frame;
use crate::shared::swap_error::DynError;

/// Domain interface for turning one detected face into an identity embedding.
pub trait FaceEmbedder: Send + Sync {
    fn embed(&self, frame: &Frame, face: &DetectedFace) -> Result<Vec<f32>, DynError>;
}
