use std::sync::Arc;

use crate::detection::domain::detected_face::order_by_position;
use crate::detection::domain::face_detector::FaceDetector;
use crate::identity::domain::identity::Identity;
use crate::pipeline::processed_frame::ProcessedFrame;
use crate::shared::frame::Frame;
use crate::swapping::domain::face_swapper::FaceSwapper;

/// Swaps every face of one sampled frame against the request's identity.
///
/// This is the unit of parallel work. It never returns an error: a failed
/// detection degrades the whole frame, a failed swap skips that one face.
pub struct FrameProcessor {
    detector: Arc<dyn FaceDetector>,
    swapper: Arc<dyn FaceSwapper>,
}

impl FrameProcessor {
    pub fn new(detector: Arc<dyn FaceDetector>, swapper: Arc<dyn FaceSwapper>) -> Self {
        Self { detector, swapper }
    }

    pub fn process_one(&self, frame: &Frame, identity: &Identity) -> ProcessedFrame {
        let index = frame.index();
        let normalized = frame.to_rgb();

        let faces = match self.detector.detect(&normalized) {
            Ok(faces) => faces,
            Err(e) => {
                log::warn!("Frame {index}: face detection failed, keeping original: {e}");
                return ProcessedFrame::Degraded {
                    frame: normalized,
                    cause: e.to_string(),
                };
            }
        };

        if faces.is_empty() {
            log::debug!("Frame {index}: no faces detected");
            return ProcessedFrame::Success {
                frame: normalized,
                swapped: 0,
                skipped: 0,
            };
        }

        let mut composite = normalized;
        let mut swapped = 0;
        let mut skipped = 0;

        // Each swap composites onto the previous swap's output.
        for (order, face) in order_by_position(faces).iter().enumerate() {
            match self.swapper.swap(&composite, face, identity) {
                Ok(result) => {
                    let (rw, rh) = (result.width(), result.height());
                    match conform(result, &composite) {
                        Some(next) => {
                            composite = next;
                            swapped += 1;
                        }
                        None => {
                            log::warn!(
                                "Frame {index}: face #{order} swap returned {rw}x{rh}, not {}x{}",
                                composite.width(),
                                composite.height()
                            );
                            skipped += 1;
                        }
                    }
                }
                Err(e) => {
                    log::warn!(
                        "Frame {index}: failed to swap face #{order} at ({:.0}, {:.0}): {e}",
                        face.bbox.x1,
                        face.bbox.y1
                    );
                    skipped += 1;
                }
            }
        }

        log::debug!("Frame {index}: {swapped} face(s) swapped, {skipped} skipped");
        ProcessedFrame::Success {
            frame: composite,
            swapped,
            skipped,
        }
    }
}

/// Brings a swapper's output back to the compositing frame's layout.
///
/// Returns `None` when the dimensions changed, which no alpha stripping or
/// re-indexing can repair.
fn conform(result: Frame, reference: &Frame) -> Option<Frame> {
    if result.width() != reference.width() || result.height() != reference.height() {
        return None;
    }
    let rgb = if result.channels() == 3 {
        result
    } else {
        result.to_rgb()
    };
    if rgb.index() == reference.index() {
        Some(rgb)
    } else {
        Some(rgb.with_index(reference.index()))
    }
}
