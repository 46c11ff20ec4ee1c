//! YOLO face-pose detector using ONNX Runtime via `ort`.
//!
//! Letterbox preprocessing, inference, confidence filtering, NMS, and
//! mapping boxes and 5-point keypoints back to frame coordinates.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;

use crate::detection::domain::detected_face::DetectedFace;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::detection::infrastructure::execution_provider::build_session;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::shared::swap_error::DynError;

/// Fallback input resolution when the model doesn't declare one.
const DEFAULT_INPUT_SIZE: u32 = 640;

const NMS_IOU_THRESH: f64 = 0.45;

/// 5 landmarks × (x, y, conf).
const NUM_KEYPOINT_VALUES: usize = 15;

/// Minimum keypoint confidence to treat a landmark as visible.
const KEYPOINT_CONF_THRESH: f64 = 0.5;

/// Letterbox padding gray, YOLO convention.
const PAD_VALUE: f32 = 114.0 / 255.0;

pub struct OnnxYoloDetector {
    session: Mutex<ort::session::Session>,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Loads the model. The input resolution is read from its NCHW input
    /// shape, falling back to 640 when the shape is dynamic.
    pub fn new(model_path: &Path, confidence: f64, workers: usize) -> Result<Self, DynError> {
        let session = build_session(model_path, workers)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { shape, .. } if shape.len() >= 4 && shape[2] > 0 => {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        Ok(Self {
            session: Mutex::new(session),
            confidence,
            input_size,
        })
    }
}

impl FaceDetector for OnnxYoloDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<DetectedFace>, DynError> {
        let letterboxed = Letterbox::apply(frame, self.input_size);
        let input_value = ort::value::Tensor::from_array(letterboxed.tensor.clone())?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor
            .as_standard_layout()
            .as_slice()
            .ok_or("Cannot get tensor slice")?
            .to_vec();
        drop(outputs);
        drop(session);

        let rows = OutputRows::new(&shape, &data)?;
        let mut candidates = parse_candidates(&rows, self.confidence, &letterboxed);
        let kept = nms(&mut candidates, NMS_IOU_THRESH);

        Ok(kept
            .into_iter()
            .map(|c| {
                let bbox = c.bbox.clamped(frame.width(), frame.height());
                let face = DetectedFace::new(bbox, c.confidence);
                match c.keypoints {
                    Some(points) => face.with_landmarks(FaceLandmarks::new(points)),
                    None => face,
                }
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// A frame resized into a square model input, plus the mapping back.
struct Letterbox {
    tensor: Array4<f32>,
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    /// Nearest-neighbor resize into a `size` x `size` NCHW tensor in [0, 1],
    /// aspect preserved, centered on gray padding.
    fn apply(frame: &Frame, size: u32) -> Self {
        let fw = frame.width() as f64;
        let fh = frame.height() as f64;
        let target = size as f64;

        let scale = (target / fw).min(target / fh);
        let new_w = ((fw * scale).round() as u32).min(size);
        let new_h = ((fh * scale).round() as u32).min(size);
        let pad_x = (size - new_w) / 2;
        let pad_y = (size - new_h) / 2;

        let mut tensor = Array4::<f32>::from_elem((1, 3, size as usize, size as usize), PAD_VALUE);
        let src = frame.as_ndarray();
        let src_h = frame.height() as usize;
        let src_w = frame.width() as usize;

        for y in 0..new_h as usize {
            let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
            for x in 0..new_w as usize {
                let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
                for c in 0..3 {
                    tensor[[0, c, pad_y as usize + y, pad_x as usize + x]] =
                        src[[src_y, src_x, c]] as f32 / 255.0;
                }
            }
        }

        Self {
            tensor,
            scale,
            pad_x,
            pad_y,
        }
    }

    fn to_frame(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

/// Row view over a `[1, features, detections]` or `[1, detections, features]`
/// output. Exported YOLO models use the transposed layout.
struct OutputRows<'a> {
    data: &'a [f32],
    num_dets: usize,
    num_feats: usize,
    transposed: bool,
}

impl<'a> OutputRows<'a> {
    fn new(shape: &[usize], data: &'a [f32]) -> Result<Self, DynError> {
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        if data.len() < num_dets * num_feats {
            return Err("YOLO output shorter than its shape".into());
        }
        Ok(Self {
            data,
            num_dets,
            num_feats,
            transposed,
        })
    }

    /// Row format: `[cx, cy, w, h, conf, kp0_x, kp0_y, kp0_conf, ...]`.
    fn row(&self, i: usize) -> Vec<f32> {
        if self.transposed {
            (0..self.num_feats)
                .map(|f| self.data[f * self.num_dets + i])
                .collect()
        } else {
            self.data[i * self.num_feats..(i + 1) * self.num_feats].to_vec()
        }
    }
}

#[derive(Clone, Debug)]
struct Candidate {
    bbox: BoundingBox,
    confidence: f64,
    keypoints: Option<[(f64, f64); 5]>,
}

fn parse_candidates(rows: &OutputRows<'_>, min_confidence: f64, lb: &Letterbox) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for i in 0..rows.num_dets {
        let row = rows.row(i);
        if row.len() < 5 {
            continue;
        }
        let confidence = row[4] as f64;
        if confidence < min_confidence {
            continue;
        }

        let (cx, cy, w, h) = (row[0] as f64, row[1] as f64, row[2] as f64, row[3] as f64);
        let (x1, y1) = lb.to_frame((cx - w / 2.0, cy - h / 2.0));
        let (x2, y2) = lb.to_frame((cx + w / 2.0, cy + h / 2.0));

        // Invisible keypoints stay at (0, 0), which FaceLandmarks treats as missing.
        let keypoints = (row.len() >= 5 + NUM_KEYPOINT_VALUES).then(|| {
            let mut pts = [(0.0, 0.0); 5];
            for (k, pt) in pts.iter_mut().enumerate() {
                let base = 5 + k * 3;
                if row[base + 2] as f64 >= KEYPOINT_CONF_THRESH {
                    *pt = lb.to_frame((row[base] as f64, row[base + 1] as f64));
                }
            }
            pts
        });

        candidates.push(Candidate {
            bbox: BoundingBox::new(x1, y1, x2, y2),
            confidence,
            keypoints,
        });
    }
    candidates
}

/// Greedy NMS: highest confidence first, suppress boxes overlapping a kept one.
fn nms(candidates: &mut [Candidate], iou_thresh: f64) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in candidates.iter() {
        if keep
            .iter()
            .all(|kept| kept.bbox.iou(&candidate.bbox) <= iou_thresh)
        {
            keep.push(candidate.clone());
        }
    }
    keep
}
