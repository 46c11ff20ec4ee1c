/// ArcFace identity embedder using ONNX Runtime.
///
/// Aligns the face to the 112x112 ArcFace template before inference, so the
/// embedding depends on who the face is rather than where it sits in the
/// image.
use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;

use crate::detection::domain::detected_face::DetectedFace;
use crate::detection::infrastructure::execution_provider::build_session;
use crate::identity::domain::face_embedder::FaceEmbedder;
use crate::identity::domain::identity::l2_normalize;
use crate::shared::face_alignment::{warp_to_crop, SimilarityTransform};
use crate::shared::frame::Frame;
use crate::shared::swap_error::DynError;

const INPUT_SIZE: u32 = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

pub struct OnnxArcFaceEmbedder {
    session: Mutex<ort::session::Session>,
}

impl OnnxArcFaceEmbedder {
    pub fn new(model_path: &Path, workers: usize) -> Result<Self, DynError> {
        Ok(Self {
            session: Mutex::new(build_session(model_path, workers)?),
        })
    }
}

impl FaceEmbedder for OnnxArcFaceEmbedder {
    fn embed(&self, frame: &Frame, face: &DetectedFace) -> Result<Vec<f32>, DynError> {
        let transform = SimilarityTransform::for_face(face, INPUT_SIZE)
            .ok_or("cannot align a face with an empty bounding box")?;
        let crop = warp_to_crop(frame, &transform, INPUT_SIZE).ok_or("degenerate alignment")?;

        let input_value = ort::value::Tensor::from_array(preprocess(&crop))?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        let embedding_array = outputs[0].try_extract_array::<f32>()?;
        let mut embedding = embedding_array
            .as_slice()
            .ok_or("Cannot get embedding slice")?
            .to_vec();

        l2_normalize(&mut embedding);
        Ok(embedding)
    }
}

/// RGB crop → NCHW float tensor in [-1, 1].
fn preprocess(crop: &Frame) -> Array4<f32> {
    let size = crop.width() as usize;
    let pixels = crop.as_ndarray();
    Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
        (pixels[[y, x, c]] as f32 - NORM_MEAN) / NORM_STD
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_preprocess_shape() {
        let crop = Frame::new(vec![128u8; 112 * 112 * 3], 112, 112, 3, 0);
        assert_eq!(preprocess(&crop).shape(), &[1, 3, 112, 112]);
    }

    #[test]
    fn test_preprocess_range() {
        let mut data = vec![0u8; 2 * 2 * 3];
        data[3..6].copy_from_slice(&[255, 255, 255]);
        let crop = Frame::new(data, 2, 2, 3, 0);

        let tensor = preprocess(&crop);

        assert_relative_eq!(tensor[[0, 0, 0, 0]], -1.0);
        assert_relative_eq!(tensor[[0, 2, 0, 1]], 1.0);
    }

    #[test]
    fn test_preprocess_keeps_channel_order() {
        let crop = Frame::new(vec![255, 0, 0], 1, 1, 3, 0);
        let tensor = preprocess(&crop);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], 1.0);
        assert_relative_eq!(tensor[[0, 1, 0, 0]], -1.0);
    }

    #[test]
    fn test_missing_model_errors() {
        assert!(OnnxArcFaceEmbedder::new(Path::new("/nonexistent/w600k_r50.onnx"), 1).is_err());
    }
}
