//! Similarity-transform face alignment shared by the embedding and swap
//! backends.
//!
//! Both models expect a face cropped so its five landmarks land on the
//! canonical ArcFace positions. The transform is estimated from detected
//! landmarks when they are complete, and from the bounding box otherwise.

use crate::detection::domain::detected_face::DetectedFace;
use crate::shared::frame::Frame;

/// Canonical landmark positions (eyes, nose, mouth corners) in a 112x112 crop.
pub const ARCFACE_TEMPLATE_112: [(f64, f64); 5] = [
    (38.2946, 51.6963),
    (73.5318, 51.5014),
    (56.0252, 71.7366),
    (41.5493, 92.3655),
    (70.7299, 92.2041),
];

/// Template for a square crop of `size` pixels.
///
/// Multiples of 112 scale the template; other sizes scale relative to 128
/// and shift right by 8 scaled pixels, matching how the swap model was
/// trained.
pub fn arcface_template(size: u32) -> [(f64, f64); 5] {
    let (ratio, shift_x) = if size % 112 == 0 {
        (size as f64 / 112.0, 0.0)
    } else {
        let ratio = size as f64 / 128.0;
        (ratio, 8.0 * ratio)
    };
    ARCFACE_TEMPLATE_112.map(|(x, y)| (x * ratio + shift_x, y * ratio))
}

/// Rotation + uniform scale + translation:
/// `x' = a*x - b*y + tx`, `y' = b*x + a*y + ty`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimilarityTransform {
    pub a: f64,
    pub b: f64,
    pub tx: f64,
    pub ty: f64,
}

impl SimilarityTransform {
    /// Least-squares fit mapping `src` points onto `dst` points.
    ///
    /// Returns `None` when the source points are degenerate (all equal) or
    /// the slices are empty or of different lengths.
    pub fn estimate(src: &[(f64, f64)], dst: &[(f64, f64)]) -> Option<Self> {
        if src.is_empty() || src.len() != dst.len() {
            return None;
        }
        let n = src.len() as f64;
        let mean = |pts: &[(f64, f64)]| {
            let (sx, sy) = pts
                .iter()
                .fold((0.0, 0.0), |(ax, ay), &(x, y)| (ax + x, ay + y));
            (sx / n, sy / n)
        };
        let (msx, msy) = mean(src);
        let (mdx, mdy) = mean(dst);

        let mut dot = 0.0;
        let mut cross = 0.0;
        let mut norm = 0.0;
        for (&(sx, sy), &(dx, dy)) in src.iter().zip(dst) {
            let (xs, ys) = (sx - msx, sy - msy);
            let (xd, yd) = (dx - mdx, dy - mdy);
            dot += xs * xd + ys * yd;
            cross += xs * yd - ys * xd;
            norm += xs * xs + ys * ys;
        }
        if norm <= f64::EPSILON {
            return None;
        }

        let a = dot / norm;
        let b = cross / norm;
        Some(Self {
            a,
            b,
            tx: mdx - (a * msx - b * msy),
            ty: mdy - (b * msx + a * msy),
        })
    }

    /// Maps `bbox` onto a centered `size` x `size` square, keeping aspect.
    pub fn from_box(face: &DetectedFace, size: u32) -> Option<Self> {
        let side = face.bbox.width().max(face.bbox.height());
        if side <= 0.0 {
            return None;
        }
        let a = size as f64 / side;
        let (cx, cy) = face.bbox.center();
        let half = size as f64 / 2.0;
        Some(Self {
            a,
            b: 0.0,
            tx: half - a * cx,
            ty: half - a * cy,
        })
    }

    /// Frame-to-crop transform for `face`, from its landmarks when all five
    /// are visible, else from its bounding box.
    pub fn for_face(face: &DetectedFace, size: u32) -> Option<Self> {
        match &face.landmarks {
            Some(landmarks) if landmarks.is_complete() => {
                Self::estimate(landmarks.points(), &arcface_template(size))
            }
            _ => Self::from_box(face, size),
        }
    }

    pub fn apply(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (
            self.a * x - self.b * y + self.tx,
            self.b * x + self.a * y + self.ty,
        )
    }

    pub fn scale(&self) -> f64 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    pub fn inverse(&self) -> Option<Self> {
        let det = self.a * self.a + self.b * self.b;
        if det <= f64::EPSILON {
            return None;
        }
        let a = self.a / det;
        let b = -self.b / det;
        Some(Self {
            a,
            b,
            tx: -(a * self.tx - b * self.ty),
            ty: -(b * self.tx + a * self.ty),
        })
    }
}

/// Renders the `size` x `size` RGB crop that `transform` maps `frame` onto.
///
/// Bilinear sampling; pixels that fall outside the frame are black.
pub fn warp_to_crop(frame: &Frame, transform: &SimilarityTransform, size: u32) -> Option<Frame> {
    let inverse = transform.inverse()?;
    let n = size as usize;
    let mut data = Vec::with_capacity(n * n * 3);
    for y in 0..n {
        for x in 0..n {
            let (sx, sy) = inverse.apply((x as f64, y as f64));
            data.extend_from_slice(&sample_bilinear(frame, sx, sy).unwrap_or([0, 0, 0]));
        }
    }
    Some(Frame::new(data, size, size, 3, frame.index()))
}

/// Bilinear RGB sample at fractional pixel `(x, y)`; `None` outside the frame.
pub fn sample_bilinear(frame: &Frame, x: f64, y: f64) -> Option<[u8; 3]> {
    let w = frame.width() as f64;
    let h = frame.height() as f64;
    if x < 0.0 || y < 0.0 || x > w - 1.0 || y > h - 1.0 {
        return None;
    }

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(frame.width() as usize - 1);
    let y1 = (y0 + 1).min(frame.height() as usize - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let stride = frame.channels() as usize;
    let row = frame.width() as usize;
    let data = frame.data();
    let px = |xi: usize, yi: usize, c: usize| data[(yi * row + xi) * stride + c] as f64;

    let mut out = [0u8; 3];
    for (c, slot) in out.iter_mut().enumerate() {
        let top = px(x0, y0, c) * (1.0 - fx) + px(x1, y0, c) * fx;
        let bottom = px(x0, y1, c) * (1.0 - fx) + px(x1, y1, c) * fx;
        *slot = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Some(out)
}
