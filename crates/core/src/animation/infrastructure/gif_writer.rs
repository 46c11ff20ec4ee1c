use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, RgbaImage};

use crate::animation::domain::animation_writer::AnimationWriter;
use crate::shared::animation_metadata::AnimationMetadata;
use crate::shared::constants::DEFAULT_ENCODER_SPEED;
use crate::shared::frame::Frame;
use crate::shared::swap_error::DynError;

/// Encodes frames as a looping GIF with the `image` crate.
///
/// `speed` trades palette quality for encode time (1 = best, 30 = fastest).
pub struct GifWriter {
    speed: i32,
}

impl GifWriter {
    pub fn new(speed: i32) -> Self {
        Self {
            speed: speed.clamp(1, 30),
        }
    }

    pub fn speed(&self) -> i32 {
        self.speed
    }
}

impl Default for GifWriter {
    fn default() -> Self {
        Self::new(DEFAULT_ENCODER_SPEED)
    }
}

impl AnimationWriter for GifWriter {
    fn write(&self, frames: &[Frame], metadata: &AnimationMetadata) -> Result<Vec<u8>, DynError> {
        if frames.is_empty() {
            return Err("cannot encode an animation with no frames".into());
        }

        let mut gif_frames = Vec::with_capacity(frames.len());
        for (i, frame) in frames.iter().enumerate() {
            let delay = Delay::from_numer_denom_ms(metadata.delay_for(i), 1);
            gif_frames.push(image::Frame::from_parts(to_rgba_image(frame)?, 0, 0, delay));
        }

        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new_with_speed(&mut bytes, self.speed);
            encoder.set_repeat(Repeat::Infinite)?;
            encoder.encode_frames(gif_frames)?;
        }

        log::debug!(
            "Encoded GIF: {} frame(s), {} bytes",
            frames.len(),
            bytes.len()
        );
        Ok(bytes)
    }
}

fn to_rgba_image(frame: &Frame) -> Result<RgbaImage, DynError> {
    let data = match frame.channels() {
        4 => frame.data().to_vec(),
        3 => {
            let mut rgba = Vec::with_capacity(frame.data().len() / 3 * 4);
            for px in frame.data().chunks_exact(3) {
                rgba.extend_from_slice(px);
                rgba.push(255);
            }
            rgba
        }
        n => return Err(format!("frame {}: unsupported channel count {n}", frame.index()).into()),
    };
    RgbaImage::from_raw(frame.width(), frame.height(), data)
        .ok_or_else(|| format!("frame {}: pixel data does not match size", frame.index()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::domain::animation_reader::AnimationReader;
    use crate::animation::infrastructure::gif_reader::GifReader;

    fn solid_frame(index: usize, rgb: [u8; 3]) -> Frame {
        let data = rgb.iter().copied().cycle().take(10 * 6 * 3).collect();
        Frame::new(data, 10, 6, 3, index)
    }

    fn metadata(delays: Vec<u32>) -> AnimationMetadata {
        AnimationMetadata {
            width: 10,
            height: 6,
            frame_delays_ms: delays,
        }
    }

    #[test]
    fn test_output_decodes_with_same_shape_and_timing() {
        let frames = vec![
            solid_frame(0, [255, 0, 0]),
            solid_frame(1, [0, 255, 0]),
            solid_frame(2, [0, 0, 255]),
        ];
        let bytes = GifWriter::default()
            .write(&frames, &metadata(vec![50, 120, 200]))
            .unwrap();

        let decoded = GifReader::new().read(&bytes).unwrap();
        assert_eq!(decoded.frames.len(), 3);
        assert_eq!((decoded.metadata.width, decoded.metadata.height), (10, 6));
        assert_eq!(decoded.metadata.frame_delays_ms, vec![50, 120, 200]);
    }

    #[test]
    fn test_zero_and_missing_delays_use_default() {
        let frames = vec![solid_frame(0, [9, 9, 9]), solid_frame(1, [200, 9, 9])];
        let bytes = GifWriter::default().write(&frames, &metadata(vec![0])).unwrap();

        let decoded = GifReader::new().read(&bytes).unwrap();
        assert_eq!(decoded.metadata.frame_delays_ms, vec![100, 100]);
    }

    #[test]
    fn test_solid_colors_survive_encoding() {
        let frames = vec![solid_frame(0, [255, 0, 0])];
        let bytes = GifWriter::new(1).write(&frames, &metadata(vec![100])).unwrap();

        let decoded = GifReader::new().read(&bytes).unwrap();
        assert_eq!(&decoded.frames[0].data()[..3], &[255, 0, 0]);
    }

    #[test]
    fn test_empty_sequence_errors() {
        assert!(GifWriter::default().write(&[], &metadata(vec![])).is_err());
    }

    #[test]
    fn test_speed_is_clamped() {
        assert_eq!(GifWriter::new(0).speed(), 1);
        assert_eq!(GifWriter::new(99).speed(), 30);
    }

    #[test]
    fn test_rejects_unsupported_channels() {
        let frame = Frame::new(vec![0; 4], 2, 2, 1, 0);
        assert!(to_rgba_image(&frame).is_err());
    }
}
