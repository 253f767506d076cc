use image::{ImageBuffer, RgbImage};

use crate::error::{MediaError, Result};

/// Channel order of a 3-channel, 8-bit pixel buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Rgb,
    Bgr,
}

/// A packed 3-channel image with an explicit channel order
///
/// Face engines and video pipes speak BGR; everything facing the caller
/// speaks RGB. Switching between the two only happens through
/// [`Image::to_bgr`] and [`Image::to_rgb`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    color: ColorSpace,
    data: Vec<u8>,
}

impl Image {
    /// Wrap a packed pixel buffer, checking that its length matches the dimensions
    pub fn from_raw(width: u32, height: u32, color: ColorSpace, data: Vec<u8>) -> Result<Self> {
        let expected = Self::buffer_len(width, height);
        if data.len() != expected {
            return Err(MediaError::InvalidBuffer {
                details: format!(
                    "{}x{} needs {} bytes, got {}",
                    width, height, expected, data.len()
                ),
            }.into());
        }

        Ok(Self { width, height, color, data })
    }

    /// Create an image with every pixel set to `pixel` (given in `color` order)
    pub fn new_filled(width: u32, height: u32, color: ColorSpace, pixel: [u8; 3]) -> Self {
        let data = pixel
            .iter()
            .copied()
            .cycle()
            .take(Self::buffer_len(width, height))
            .collect();
        Self { width, height, color, data }
    }

    /// Adopt an RGB buffer from the `image` crate
    pub fn from_rgb_image(buffer: RgbImage) -> Self {
        let (width, height) = buffer.dimensions();
        Self {
            width,
            height,
            color: ColorSpace::Rgb,
            data: buffer.into_raw(),
        }
    }

    /// Number of bytes in a packed 3-channel buffer of the given size
    pub fn buffer_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Pixel at (x, y) in the buffer's own channel order
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Set the pixel at (x, y), given in the buffer's own channel order
    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: [u8; 3]) {
        let i = self.offset(x, y);
        self.data[i..i + 3].copy_from_slice(&pixel);
    }

    /// Pixel at (x, y) as RGB regardless of the buffer's channel order
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let [a, b, c] = self.pixel(x, y);
        match self.color {
            ColorSpace::Rgb => [a, b, c],
            ColorSpace::Bgr => [c, b, a],
        }
    }

    /// Reorder to BGR; a no-op when already BGR
    pub fn to_bgr(self) -> Self {
        match self.color {
            ColorSpace::Bgr => self,
            ColorSpace::Rgb => self.swap_red_blue(ColorSpace::Bgr),
        }
    }

    /// Reorder to RGB; a no-op when already RGB
    pub fn to_rgb(self) -> Self {
        match self.color {
            ColorSpace::Rgb => self,
            ColorSpace::Bgr => self.swap_red_blue(ColorSpace::Rgb),
        }
    }

    /// Convert into an `image` crate RGB buffer
    pub fn into_rgb_image(self) -> RgbImage {
        let rgb = self.to_rgb();
        // Length was checked on construction, so from_raw cannot fail here.
        ImageBuffer::from_raw(rgb.width, rgb.height, rgb.data)
            .unwrap_or_else(|| ImageBuffer::new(0, 0))
    }

    fn swap_red_blue(mut self, color: ColorSpace) -> Self {
        for px in self.data.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
        self.color = color;
        self
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        (y as usize * self.width as usize + x as usize) * 3
    }
}
