use crate::detection::domain::detected_face::DetectedFace;
use crate::identity::domain::identity::Identity;
use crate::shared::frame::Frame;
use crate::shared::swap_error::DynError;

/// Domain interface for pixel-level face replacement.
///
/// Returns a new frame with `target`'s region redrawn using `identity`'s
/// appearance; the input frame is left untouched. Implementations are shared
/// across worker threads.
pub trait FaceSwapper: Send + Sync {
    fn swap(&self, frame: &Frame, target: &DetectedFace, identity: &Identity)
        -> Result<Frame, DynError>;
}
