use crate::shared::constants::DEFAULT_STRIDE;
use crate::shared::swap_error::SwapError;

/// Chooses which frames get full inference: every `stride`-th frame,
/// starting at 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSampler {
    stride: usize,
}

impl FrameSampler {
    pub fn new(stride: usize) -> Result<Self, SwapError> {
        if stride < 1 {
            return Err(SwapError::InvalidInput("stride must be >= 1".into()));
        }
        Ok(Self { stride })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn sample(&self, frame_count: usize) -> SampleIndex {
        SampleIndex {
            indices: (0..frame_count).step_by(self.stride).collect(),
            frame_count,
            stride: self.stride,
        }
    }
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self {
            stride: DEFAULT_STRIDE,
        }
    }
}

/// Sampled frame indices of one request plus the skipped-frame mapping.
///
/// `indices` is strictly increasing and starts at 0 for any non-empty
/// sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleIndex {
    indices: Vec<usize>,
    frame_count: usize,
    stride: usize,
}

impl SampleIndex {
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn is_sampled(&self, index: usize) -> bool {
        index < self.frame_count && index % self.stride == 0
    }

    /// The sampled index whose result frame `index` reuses: the largest
    /// sampled index `<= index`. Never a later sample.
    pub fn fallback(&self, index: usize) -> Option<usize> {
        if index >= self.frame_count {
            return None;
        }
        Some(index - index % self.stride)
    }

    /// Position within `indices()` of the sample frame `index` reuses.
    pub fn fallback_position(&self, index: usize) -> Option<usize> {
        self.fallback(index).map(|sampled| sampled / self.stride)
    }
}
