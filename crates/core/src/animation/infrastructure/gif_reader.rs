use std::io::Cursor;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageDecoder};

use crate::animation::domain::animation_reader::{AnimationReader, DecodedAnimation};
use crate::shared::animation_metadata::AnimationMetadata;
use crate::shared::frame::Frame;
use crate::shared::swap_error::DynError;

/// Decodes GIFs with the `image` crate.
///
/// Frames come out as RGBA at full canvas size, with partial frames already
/// composited over their predecessors according to their disposal method.
pub struct GifReader;

impl GifReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GifReader {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationReader for GifReader {
    fn read(&self, bytes: &[u8]) -> Result<DecodedAnimation, DynError> {
        let decoder = GifDecoder::new(Cursor::new(bytes))?;
        let (width, height) = decoder.dimensions();
        let decoded = decoder.into_frames().collect_frames()?;

        let mut frames = Vec::with_capacity(decoded.len());
        let mut frame_delays_ms = Vec::with_capacity(decoded.len());
        for (index, frame) in decoded.into_iter().enumerate() {
            let (numer, denom) = frame.delay().numer_denom_ms();
            frame_delays_ms.push(if denom == 0 { 0 } else { numer / denom });

            let buffer = frame.into_buffer();
            if buffer.dimensions() != (width, height) {
                return Err(format!(
                    "frame {index} is {}x{}, canvas is {width}x{height}",
                    buffer.width(),
                    buffer.height()
                )
                .into());
            }
            frames.push(Frame::new(buffer.into_raw(), width, height, 4, index));
        }

        log::debug!("Decoded GIF: {width}x{height}, {} frame(s)", frames.len());
        Ok(DecodedAnimation {
            frames,
            metadata: AnimationMetadata {
                width,
                height,
                frame_delays_ms,
            },
        })
    }
}
