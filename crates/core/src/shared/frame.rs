use image::{GrayImage, RgbImage};
use ndarray::ArrayView3;

/// ITU-R BT.601 luma weights, the classic grayscale conversion cascades
/// were trained against.
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// One captured image: contiguous RGB bytes in row-major order.
///
/// Produced by a capture session each tick and dropped by the pipeline
/// within that same tick.
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

    /// Wraps a decoded RGB image.
    pub fn from_rgb_image(image: RgbImage, index: usize) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, 3, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
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

    /// Returns a copy carrying a different sequence index.
    pub fn with_index(&self, index: usize) -> Self {
        Self {
            index,
            ..self.clone()
        }
    }

    /// `None` when the buffer does not hold packed 3-channel pixels.
    pub fn as_ndarray(&self) -> Option<ArrayView3<'_, u8>> {
        ArrayView3::from_shape(self.shape(), &self.data).ok()
    }

    /// Colour copy for drawing on. `None` if the frame is not packed RGB.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        if self.channels != 3 {
            return None;
        }
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// Grayscale copy using BT.601 luma weights.
    pub fn to_grayscale(&self) -> Option<GrayImage> {
        if self.channels != 3 {
            return None;
        }
        let pixels = self.as_ndarray()?;
        Some(GrayImage::from_fn(self.width, self.height, |x, y| {
            let (row, col) = (y as usize, x as usize);
            let luma = LUMA_R * f32::from(pixels[[row, col, 0]])
                + LUMA_G * f32::from(pixels[[row, col, 1]])
                + LUMA_B * f32::from(pixels[[row, col, 2]]);
            image::Luma([luma.round().clamp(0.0, 255.0) as u8])
        }))
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
