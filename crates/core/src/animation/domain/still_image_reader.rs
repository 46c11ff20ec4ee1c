use crate::shared::frame::Frame;
use crate::shared::swap_error::DynError;

/// Decodes a single still image (the reference face, or an image to
/// inspect) into a frame with index 0.
pub trait StillImageReader: Send + Sync {
    fn read(&self, bytes: &[u8]) -> Result<Frame, DynError>;
}
