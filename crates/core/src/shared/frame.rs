use image::{RgbImage, RgbaImage};
use ndarray::ArrayView3;

/// A single camera or image frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the domain layer
/// treats pixel data as opaque.
#[derive(Clone, Debug)]
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

    pub fn from_rgb_image(img: RgbImage, index: usize) -> Self {
        let (width, height) = img.dimensions();
        Self::new(img.into_raw(), width, height, 3, index)
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

    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the pixels into an `image` buffer. `None` for non-RGB frames.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        if self.channels != 3 {
            return None;
        }
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// Opaque RGBA copy, for display surfaces that only take RGBA.
    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        if self.channels != 3 {
            return None;
        }
        let mut rgba = Vec::with_capacity(self.data.len() / 3 * 4);
        for px in self.data.chunks_exact(3) {
            rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
        }
        RgbaImage::from_raw(self.width, self.height, rgba)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.dimensions(), (2, 2));
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        let data = vec![0u8; 10]; // wrong size for 2x2x3
        Frame::new(data, 2, 2, 3, 0);
    }

    #[test]
    fn test_as_ndarray_pixel_access() {
        // 2x2 RGB: set pixel (row=1, col=0) to red
        let mut data = vec![0u8; 12];
        data[6] = 255;
        let frame = Frame::new(data, 2, 2, 3, 0);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[2, 2, 3]);
        assert_eq!(arr[[1, 0, 0]], 255);
        assert_eq!(arr[[1, 0, 1]], 0);
    }

    #[test]
    fn test_rgb_image_roundtrip_keeps_pixels() {
        let mut img = RgbImage::new(4, 3);
        img.put_pixel(3, 2, image::Rgb([10, 20, 30]));
        let frame = Frame::from_rgb_image(img, 7);
        assert_eq!(frame.dimensions(), (4, 3));
        assert_eq!(frame.index(), 7);
        let back = frame.to_rgb_image().unwrap();
        assert_eq!(back.get_pixel(3, 2).0, [10, 20, 30]);
    }

    #[test]
    fn test_rgba_copy_is_opaque() {
        let frame = Frame::new(vec![1, 2, 3, 4, 5, 6], 2, 1, 3, 0);
        let rgba = frame.to_rgba_image().unwrap();
        assert_eq!(rgba.get_pixel(0, 0).0, [1, 2, 3, 255]);
        assert_eq!(rgba.get_pixel(1, 0).0, [4, 5, 6, 255]);
    }

    #[test]
    fn test_non_rgb_frame_has_no_image_view() {
        let frame = Frame::new(vec![0u8; 4], 2, 2, 1, 0);
        assert!(frame.to_rgb_image().is_none());
        assert!(frame.to_rgba_image().is_none());
    }
}
