use crate::shared::animation_metadata::AnimationMetadata;
use crate::shared::frame::Frame;
use crate::shared::swap_error::DynError;

/// A fully buffered animation: every frame composited to the full canvas.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedAnimation {
    pub frames: Vec<Frame>,
    pub metadata: AnimationMetadata,
}

/// Decodes animation bytes into ordered frames plus timing.
///
/// Implementations own the container details; frame `i` of the result has
/// index `i` and the delay at `metadata.frame_delays_ms[i]`.
pub trait AnimationReader: Send + Sync {
    fn read(&self, bytes: &[u8]) -> Result<DecodedAnimation, DynError>;
}
