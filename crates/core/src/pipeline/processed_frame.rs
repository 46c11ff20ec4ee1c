use crate::shared::frame::Frame;

/// Outcome of processing one sampled frame.
///
/// Both variants carry a 3-channel frame: a failed frame is never dropped,
/// it degrades to its channel-normalized original.
#[derive(Clone, Debug, PartialEq)]
pub enum ProcessedFrame {
    Success {
        frame: Frame,
        /// Faces that received the identity.
        swapped: usize,
        /// Faces left as they were because their swap call failed.
        skipped: usize,
    },
    Degraded {
        frame: Frame,
        cause: String,
    },
}

impl ProcessedFrame {
    pub fn degraded(original: &Frame, cause: impl Into<String>) -> Self {
        ProcessedFrame::Degraded {
            frame: original.to_rgb(),
            cause: cause.into(),
        }
    }

    pub fn frame(&self) -> &Frame {
        match self {
            ProcessedFrame::Success { frame, .. } | ProcessedFrame::Degraded { frame, .. } => frame,
        }
    }

    pub fn into_frame(self) -> Frame {
        match self {
            ProcessedFrame::Success { frame, .. } | ProcessedFrame::Degraded { frame, .. } => frame,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ProcessedFrame::Degraded { .. })
    }

    pub fn swapped_faces(&self) -> usize {
        match self {
            ProcessedFrame::Success { swapped, .. } => *swapped,
            ProcessedFrame::Degraded { .. } => 0,
        }
    }
}
