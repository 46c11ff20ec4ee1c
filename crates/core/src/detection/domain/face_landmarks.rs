//! 5-point face landmarks: left eye, right eye, nose, left mouth corner,
//! right mouth corner, in frame pixel coordinates.

/// Points with x <= 0 are treated as invisible.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    points: [(f64, f64); 5],
}

impl FaceLandmarks {
    pub fn new(points: [(f64, f64); 5]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64); 5] {
        &self.points
    }

    /// True when every landmark is visible, which alignment requires.
    pub fn is_complete(&self) -> bool {
        self.points.iter().all(|(x, _)| *x > 0.0)
    }
}
