/// Face swapper backed by the InsightFace `inswapper_128` ONNX model.
///
/// Per face: align the target to a 128x128 crop, project the identity
/// embedding through the model's `emap` matrix, run the model, and blend the
/// generated crop back into the frame through the inverse alignment.
use std::path::Path;
use std::sync::Mutex;

use ndarray::{Array2, Array4};

use crate::detection::domain::detected_face::DetectedFace;
use crate::detection::infrastructure::execution_provider::build_session;
use crate::identity::domain::identity::{l2_normalize, Identity};
use crate::shared::face_alignment::{sample_bilinear, warp_to_crop, SimilarityTransform};
use crate::shared::frame::Frame;
use crate::shared::swap_error::DynError;
use crate::swapping::domain::face_swapper::FaceSwapper;
use crate::swapping::infrastructure::onnx_initializer::{read_last_initializer, TensorInitializer};

const CROP_SIZE: u32 = 128;

/// Width of the blend ramp at the crop border, in crop pixels.
const FEATHER_PX: f64 = 12.0;

/// Square matrix mapping an ArcFace embedding into the swap model's latent space.
#[derive(Clone, Debug, PartialEq)]
pub struct Emap {
    dim: usize,
    weights: Vec<f32>,
}

impl Emap {
    pub fn from_initializer(tensor: TensorInitializer) -> Result<Self, DynError> {
        match tensor.dims.as_slice() {
            [rows, cols] if rows == cols && *rows > 0 => Ok(Self {
                dim: *rows as usize,
                weights: tensor.data,
            }),
            dims => Err(format!("emap {} has shape {dims:?}, expected square", tensor.name).into()),
        }
    }

    /// `normalize(embedding · emap)`.
    pub fn project(&self, embedding: &[f32]) -> Result<Vec<f32>, DynError> {
        if embedding.len() != self.dim {
            return Err(format!(
                "identity embedding has {} values, swap model expects {}",
                embedding.len(),
                self.dim
            )
            .into());
        }
        let mut latent = vec![0.0f32; self.dim];
        for (i, &e) in embedding.iter().enumerate() {
            let row = &self.weights[i * self.dim..(i + 1) * self.dim];
            for (out, &w) in latent.iter_mut().zip(row) {
                *out += e * w;
            }
        }
        l2_normalize(&mut latent);
        Ok(latent)
    }
}

pub struct OnnxInswapper {
    session: Mutex<ort::session::Session>,
    emap: Emap,
}

impl OnnxInswapper {
    pub fn new(model_path: &Path, workers: usize) -> Result<Self, DynError> {
        let emap = Emap::from_initializer(read_last_initializer(model_path)?)?;
        let session = build_session(model_path, workers)?;
        Ok(Self {
            session: Mutex::new(session),
            emap,
        })
    }

    fn generate(&self, crop: &Frame, latent: Vec<f32>) -> Result<Frame, DynError> {
        let target = ort::value::Tensor::from_array(crop_to_tensor(crop))?;
        let source = ort::value::Tensor::from_array(Array2::from_shape_vec(
            (1, latent.len()),
            latent,
        )?)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs!["target" => target, "source" => source])?;
        let output = outputs[0].try_extract_array::<f32>()?;
        let shape = output.shape();
        if shape != [1, 3, CROP_SIZE as usize, CROP_SIZE as usize] {
            return Err(format!("Unexpected swap output shape: {shape:?}").into());
        }

        let n = CROP_SIZE as usize;
        let mut data = Vec::with_capacity(n * n * 3);
        for y in 0..n {
            for x in 0..n {
                for c in 0..3 {
                    data.push((output[[0, c, y, x]] * 255.0).round().clamp(0.0, 255.0) as u8);
                }
            }
        }
        Ok(Frame::new(data, CROP_SIZE, CROP_SIZE, 3, crop.index()))
    }
}

impl FaceSwapper for OnnxInswapper {
    fn swap(
        &self,
        frame: &Frame,
        target: &DetectedFace,
        identity: &Identity,
    ) -> Result<Frame, DynError> {
        let transform = SimilarityTransform::for_face(target, CROP_SIZE)
            .ok_or("cannot align a face with an empty bounding box")?;
        let crop = warp_to_crop(frame, &transform, CROP_SIZE).ok_or("degenerate alignment")?;
        let latent = self.emap.project(identity.embedding())?;

        let generated = self.generate(&crop, latent)?;
        paste_back(frame, &generated, &transform)
    }
}

/// RGB crop → NCHW float tensor in [0, 1].
fn crop_to_tensor(crop: &Frame) -> Array4<f32> {
    let size = crop.width() as usize;
    let pixels = crop.as_ndarray();
    Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
        pixels[[y, x, c]] as f32 / 255.0
    })
}

/// Blend weight of crop position `(x, y)`: 1 inside, ramping to 0 at the border.
fn feather(x: f64, y: f64, size: f64) -> f64 {
    let edge = x.min(y).min(size - 1.0 - x).min(size - 1.0 - y);
    (edge / FEATHER_PX).clamp(0.0, 1.0)
}

/// Composites `generated` (in crop space) over `frame` (in frame space).
///
/// Only frame pixels inside the crop's footprint are visited; everything
/// else is copied unchanged. The result is always RGB.
fn paste_back(
    frame: &Frame,
    generated: &Frame,
    transform: &SimilarityTransform,
) -> Result<Frame, DynError> {
    let inverse = transform.inverse().ok_or("degenerate alignment")?;
    let size = generated.width() as f64;

    let corners = [(0.0, 0.0), (size, 0.0), (0.0, size), (size, size)].map(|p| inverse.apply(p));
    let (min_x, max_x, min_y, max_y) = corners.iter().fold(
        (f64::MAX, f64::MIN, f64::MAX, f64::MIN),
        |(lx, hx, ly, hy), &(x, y)| (lx.min(x), hx.max(x), ly.min(y), hy.max(y)),
    );
    let w = frame.width() as usize;
    let h = frame.height() as usize;
    let x0 = min_x.floor().max(0.0) as usize;
    let y0 = min_y.floor().max(0.0) as usize;
    let x1 = (max_x.ceil().max(0.0) as usize).min(w);
    let y1 = (max_y.ceil().max(0.0) as usize).min(h);

    let mut data = frame.to_rgb().into_data();
    for y in y0..y1 {
        for x in x0..x1 {
            let (cx, cy) = transform.apply((x as f64, y as f64));
            let alpha = feather(cx, cy, size);
            if alpha <= 0.0 {
                continue;
            }
            let Some(swapped) = sample_bilinear(generated, cx, cy) else {
                continue;
            };
            let offset = (y * w + x) * 3;
            for c in 0..3 {
                let original = data[offset + c] as f64;
                let blended = original * (1.0 - alpha) + swapped[c] as f64 * alpha;
                data[offset + c] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    Ok(Frame::new(
        data,
        frame.width(),
        frame.height(),
        3,
        frame.index(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tensor(name: &str, dims: Vec<i64>, data: Vec<f32>) -> TensorInitializer {
        TensorInitializer {
            name: name.to_string(),
            dims,
            data,
        }
    }

    fn shift(tx: f64, ty: f64) -> SimilarityTransform {
        SimilarityTransform {
            a: 1.0,
            b: 0.0,
            tx,
            ty,
        }
    }

    #[test]
    fn test_emap_requires_square_matrix() {
        assert!(Emap::from_initializer(tensor("emap", vec![2, 3], vec![0.0; 6])).is_err());
        assert!(Emap::from_initializer(tensor("emap", vec![4], vec![0.0; 4])).is_err());
        assert!(Emap::from_initializer(tensor("emap", vec![2, 2], vec![0.0; 4])).is_ok());
    }

    #[test]
    fn test_project_multiplies_and_normalizes() {
        // [1, 1] · [[3, 0], [0, 4]] = [3, 4] → [0.6, 0.8]
        let emap = Emap::from_initializer(tensor("emap", vec![2, 2], vec![3.0, 0.0, 0.0, 4.0]))
            .unwrap();
        let latent = emap.project(&[1.0, 1.0]).unwrap();
        assert_relative_eq!(latent[0], 0.6, epsilon = 1e-6);
        assert_relative_eq!(latent[1], 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_project_row_major_orientation() {
        // [1, 0] picks the first row.
        let emap = Emap::from_initializer(tensor("emap", vec![2, 2], vec![0.0, 2.0, 5.0, 0.0]))
            .unwrap();
        let latent = emap.project(&[1.0, 0.0]).unwrap();
        assert_relative_eq!(latent[0], 0.0);
        assert_relative_eq!(latent[1], 1.0);
    }

    #[test]
    fn test_project_rejects_wrong_length() {
        let emap = Emap::from_initializer(tensor("emap", vec![2, 2], vec![1.0; 4])).unwrap();
        assert!(emap.project(&[1.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_crop_to_tensor_scales_to_unit_range() {
        let crop = Frame::new(vec![255, 0, 51], 1, 1, 3, 0);
        let t = crop_to_tensor(&crop);
        assert_eq!(t.shape(), &[1, 3, 1, 1]);
        assert_relative_eq!(t[[0, 0, 0, 0]], 1.0);
        assert_relative_eq!(t[[0, 1, 0, 0]], 0.0);
        assert_relative_eq!(t[[0, 2, 0, 0]], 0.2);
    }

    #[test]
    fn test_feather_ramps_at_border() {
        assert_relative_eq!(feather(0.0, 64.0, 128.0), 0.0);
        assert_relative_eq!(feather(6.0, 64.0, 128.0), 0.5);
        assert_relative_eq!(feather(64.0, 64.0, 128.0), 1.0);
        assert_relative_eq!(feather(127.0, 64.0, 128.0), 0.0);
    }

    #[test]
    fn test_paste_back_replaces_center_and_keeps_outside() {
        // 128x128 white crop placed at (100, 50) in a 400x300 black frame.
        let frame = Frame::new(vec![0; 400 * 300 * 3], 400, 300, 3, 9);
        let generated = Frame::new(vec![255; 128 * 128 * 3], 128, 128, 3, 0);

        let out = paste_back(&frame, &generated, &shift(-100.0, -50.0)).unwrap();

        let px = |x: usize, y: usize| out.data()[(y * 400 + x) * 3];
        assert_eq!(px(164, 114), 255);
        assert_eq!(px(100, 114), 0);
        assert!(px(106, 114) > 0 && px(106, 114) < 255);
        assert_eq!(px(10, 10), 0);
        assert_eq!(px(300, 250), 0);
        assert_eq!(out.index(), 9);
        assert_eq!(out.channels(), 3);
    }

    #[test]
    fn test_paste_back_clips_to_frame() {
        // Crop hangs off the top-left corner.
        let frame = Frame::new(vec![0; 50 * 50 * 4], 50, 50, 4, 0);
        let generated = Frame::new(vec![255; 128 * 128 * 3], 128, 128, 3, 0);

        let out = paste_back(&frame, &generated, &shift(100.0, 100.0)).unwrap();

        assert_eq!((out.width(), out.height(), out.channels()), (50, 50, 3));
        assert_eq!(out.data()[(10 * 50 + 10) * 3], 255);
    }
}
