use crate::detection::domain::detected_face::DetectedFace;
use crate::shared::frame::Frame;
use crate::shared::swap_error::DynError;

/// Domain interface for face detection.
///
/// One detector instance serves every worker of every request, so
/// implementations must be stateless from the caller's view (`&self`) and
/// safe to call concurrently. Backends whose sessions need exclusive access
/// serialize internally.
pub trait FaceDetector: Send + Sync {
    /// Returns every face in `frame`, possibly none. Must not modify `frame`.
    fn detect(&self, frame: &Frame) -> Result<Vec<DetectedFace>, DynError>;
}
