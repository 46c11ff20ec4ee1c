use ndarray::ArrayView3;

/// A single animation frame: contiguous RGB or RGBA bytes in row-major order.
///
/// Frames are never mutated in place. Every transformation (alpha stripping,
/// face compositing, re-indexing) produces a new `Frame`.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns a 3-channel copy of this frame. Alpha is dropped, not blended.
    pub fn to_rgb(&self) -> Frame {
        if self.channels == 3 {
            return self.clone();
        }
        let pixels = (self.width as usize) * (self.height as usize);
        let stride = self.channels as usize;
        let mut data = Vec::with_capacity(pixels * 3);
        for px in self.data.chunks_exact(stride) {
            data.extend_from_slice(&px[..3]);
        }
        Frame::new(data, self.width, self.height, 3, self.index)
    }

    /// Same pixels, different sequence position.
    pub fn with_index(&self, index: usize) -> Frame {
        Frame {
            index,
            ..self.clone()
        }
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
