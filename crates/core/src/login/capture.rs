use std::io::Cursor;

use base64::Engine;
use image::{ImageFormat, RgbImage};
use thiserror::Error;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("no frame available to capture")]
    NoFrame,
    #[error("expected an RGB frame, got {0} channels")]
    UnsupportedFrame(u8),
    #[error("face region lies outside the frame")]
    EmptyRegion,
    #[error("failed to encode capture: {0}")]
    Encode(#[from] image::ImageError),
}

/// A PNG-encoded still taken from the camera feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedImage {
    png: Vec<u8>,
    width: u32,
    height: u32,
}

impl CapturedImage {
    pub fn encode(img: &RgbImage) -> Result<Self, CaptureError> {
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(Self {
            png,
            width: img.width(),
            height: img.height(),
        })
    }

    pub fn png(&self) -> &[u8] {
        &self.png
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

    /// `data:image/png;base64,...`, the form an `<img>` source accepts.
    pub fn data_url(&self) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.png)
        )
    }
}

/// Crops `frame` to `region` (or keeps it whole) and encodes it as PNG.
pub fn capture_frame(
    frame: &Frame,
    region: Option<&BoundingBox>,
) -> Result<CapturedImage, CaptureError> {
    let img = frame
        .to_rgb_image()
        .ok_or(CaptureError::UnsupportedFrame(frame.channels()))?;

    let Some(region) = region else {
        return CapturedImage::encode(&img);
    };
    let rect = region
        .to_pixel_rect(frame.width(), frame.height())
        .ok_or(CaptureError::EmptyRegion)?;
    let crop = image::imageops::crop_imm(&img, rect.x, rect.y, rect.width, rect.height).to_image();
    CapturedImage::encode(&crop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use rstest::rstest;

    fn frame(w: u32, h: u32) -> Frame {
        let img = RgbImage::from_fn(w, h, |x, y| Rgb([x as u8, y as u8, 0]));
        Frame::from_rgb_image(img, 0)
    }

    #[rstest]
    #[case(BoundingBox::new(10.0, 10.0, 50.0, 60.0), (50, 60))]
    #[case(BoundingBox::new(10.4, 9.6, 49.8, 60.2), (50, 60))]
    #[case(BoundingBox::new(180.0, 100.0, 50.0, 60.0), (20, 50))]
    #[case(BoundingBox::new(-20.0, -20.0, 50.0, 50.0), (30, 30))]
    fn test_capture_crops_to_region(#[case] region: BoundingBox, #[case] expected: (u32, u32)) {
        let captured = capture_frame(&frame(200, 150), Some(&region)).unwrap();
        assert_eq!(captured.dimensions(), expected);
    }

    #[test]
    fn test_capture_without_region_keeps_full_frame() {
        let captured = capture_frame(&frame(200, 150), None).unwrap();
        assert_eq!(captured.dimensions(), (200, 150));
    }

    #[test]
    fn test_capture_png_decodes_to_crop() {
        let region = BoundingBox::new(10.0, 20.0, 30.0, 40.0);
        let captured = capture_frame(&frame(200, 150), Some(&region)).unwrap();

        let decoded = image::load_from_memory(captured.png()).unwrap().to_rgb8();

        assert_eq!(decoded.dimensions(), (30, 40));
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([10, 20, 0]));
    }

    #[test]
    fn test_region_outside_frame_fails() {
        let region = BoundingBox::new(300.0, 300.0, 50.0, 50.0);
        let result = capture_frame(&frame(200, 150), Some(&region));
        assert!(matches!(result, Err(CaptureError::EmptyRegion)));
    }

    #[test]
    fn test_non_rgb_frame_fails() {
        let gray = Frame::new(vec![0u8; 20 * 10], 20, 10, 1, 0);
        assert!(matches!(
            capture_frame(&gray, None),
            Err(CaptureError::UnsupportedFrame(1))
        ));
    }

    #[test]
    fn test_data_url_is_base64_png() {
        let captured = capture_frame(&frame(4, 4), None).unwrap();
        let url = captured.data_url();

        let payload = url.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .unwrap();
        assert_eq!(bytes, captured.png());
    }
}
