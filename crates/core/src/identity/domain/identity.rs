use crate::shared::bounding_box::BoundingBox;

/// The locked source identity of one swap request.
///
/// Built once from the reference image and shared read-only by every frame
/// job of the request. The embedding is always L2-normalized.
#[derive(Clone, Debug, PartialEq)]
pub struct Identity {
    embedding: Vec<f32>,
    confidence: f64,
    source_bbox: BoundingBox,
}

impl Identity {
    pub fn new(mut embedding: Vec<f32>, confidence: f64, source_bbox: BoundingBox) -> Self {
        l2_normalize(&mut embedding);
        Self {
            embedding,
            confidence,
            source_bbox,
        }
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    /// Detection confidence of the reference face this identity came from.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn source_bbox(&self) -> &BoundingBox {
        &self.source_bbox
    }
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
