use crate::shared::animation_metadata::AnimationMetadata;
use crate::shared::frame::Frame;
use crate::shared::swap_error::DynError;

/// Encodes 3-channel frames back into animation bytes, using the per-frame
/// delays in `metadata`.
pub trait AnimationWriter: Send + Sync {
    fn write(&self, frames: &[Frame], metadata: &AnimationMetadata) -> Result<Vec<u8>, DynError>;
}
