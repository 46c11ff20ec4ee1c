use crate::shared::constants::DEFAULT_FRAME_DELAY_MS;

/// Canvas size and per-frame timing of an animated image.
///
/// `frame_delays_ms[i]` is how long frame `i` stays on screen. A still image
/// is represented as a one-frame animation with a zero delay.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationMetadata {
    pub width: u32,
    pub height: u32,
    pub frame_delays_ms: Vec<u32>,
}

impl AnimationMetadata {
    pub fn frame_count(&self) -> usize {
        self.frame_delays_ms.len()
    }

    /// Delay for frame `index`, substituting the player default for zero or
    /// missing delays.
    pub fn delay_for(&self, index: usize) -> u32 {
        match self.frame_delays_ms.get(index) {
            Some(&ms) if ms > 0 => ms,
            _ => DEFAULT_FRAME_DELAY_MS,
        }
    }

    pub fn total_duration_ms(&self) -> u64 {
        (0..self.frame_count())
            .map(|i| self.delay_for(i) as u64)
            .sum()
    }
}
