use crate::animation::domain::still_image_reader::StillImageReader;
use crate::shared::frame::Frame;
use crate::shared::swap_error::DynError;

/// Decodes any still format the `image` crate recognizes (PNG, JPEG, WebP,
/// the first frame of a GIF, ...) into an RGB frame.
pub struct ImageCrateReader;

impl ImageCrateReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageCrateReader {
    fn default() -> Self {
        Self::new()
    }
}

impl StillImageReader for ImageCrateReader {
    fn read(&self, bytes: &[u8]) -> Result<Frame, DynError> {
        let img = image::load_from_memory(bytes)?.to_rgb8();
        let (width, height) = img.dimensions();
        Ok(Frame::new(img.into_raw(), width, height, 3, 0))
    }
}
