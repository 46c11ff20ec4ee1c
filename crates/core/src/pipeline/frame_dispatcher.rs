use std::sync::Arc;

use crate::identity::domain::identity::Identity;
use crate::pipeline::frame_processor::FrameProcessor;
use crate::pipeline::processed_frame::ProcessedFrame;
use crate::shared::frame::Frame;

/// Abstracts how sampled frames are fanned out to the frame processor.
///
/// This is a port (application-layer interface). Infrastructure provides the
/// concrete scheduling (a long-lived bounded worker pool).
///
/// Contract: the result has exactly one entry per input frame, in input
/// order, whatever order the work completes in. Per-frame failures come back
/// as [`ProcessedFrame::Degraded`]; there is no batch-level failure.
pub trait FrameDispatcher: Send + Sync {
    /// `on_progress(completed, total)` is called on the caller's thread as
    /// results arrive.
    fn dispatch_all(
        &self,
        frames: Vec<Frame>,
        identity: Arc<Identity>,
        processor: Arc<FrameProcessor>,
        on_progress: &mut dyn FnMut(usize, usize),
    ) -> Vec<ProcessedFrame>;
}
