use crate::pipeline::frame_sampler::SampleIndex;
use crate::pipeline::processed_frame::ProcessedFrame;
use crate::shared::frame::Frame;
use crate::shared::swap_error::SwapError;

/// Full-length output of one request: one 3-channel frame per input frame,
/// in input order, each indexed by its output position.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputSequence {
    frames: Vec<Frame>,
}

impl OutputSequence {
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Expands the sparse processed set back to every original position.
///
/// A skipped frame shows the result of the nearest earlier sample, never its
/// own raw pixels, so the identity cannot flicker between swapped and
/// unswapped frames. `processed` must hold one entry per sample, in sample
/// order.
pub fn reconstruct(
    original_count: usize,
    samples: &SampleIndex,
    processed: Vec<ProcessedFrame>,
    originals: &[Frame],
) -> Result<OutputSequence, SwapError> {
    if processed.len() != samples.len() {
        return Err(SwapError::Internal(format!(
            "{} processed frames for {} samples",
            processed.len(),
            samples.len()
        )));
    }
    if samples.frame_count() != original_count {
        return Err(SwapError::Internal(format!(
            "sample index covers {} frames, sequence has {original_count}",
            samples.frame_count()
        )));
    }

    let mut frames = Vec::with_capacity(original_count);
    for i in 0..original_count {
        let reused = samples
            .fallback_position(i)
            .and_then(|pos| processed.get(pos))
            .map(ProcessedFrame::frame);

        let frame = match reused {
            Some(frame) => frame.with_index(i),
            None => {
                let original = originals.get(i).ok_or_else(|| {
                    SwapError::Internal(format!("frame {i} has neither a sample nor an original"))
                })?;
                log::warn!("Frame {i}: no processed sample to reuse, emitting original");
                original.to_rgb().with_index(i)
            }
        };
        frames.push(frame);
    }

    Ok(OutputSequence { frames })
}
