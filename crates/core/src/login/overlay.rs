use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::detection::domain::detection::Detection;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// How detections are painted onto the overlay canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayStyle {
    pub box_color: Rgba<u8>,
    pub box_thickness: u32,
    pub landmark_color: Rgba<u8>,
    pub landmark_radius: i32,
    pub show_landmarks: bool,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            box_color: Rgba([0, 120, 255, 255]),
            box_thickness: 2,
            landmark_color: Rgba([0, 220, 120, 255]),
            landmark_radius: 1,
            show_landmarks: true,
        }
    }
}

/// Draws `detection` on a fresh transparent `display`-sized canvas.
///
/// The detection is in `frame`-sized pixel space and is rescaled to the
/// display before drawing.
pub fn render_overlay(
    display: (u32, u32),
    frame: (u32, u32),
    detection: Option<&Detection>,
    style: &OverlayStyle,
) -> RgbaImage {
    let mut canvas = RgbaImage::new(display.0, display.1);
    let Some(det) = detection else {
        return canvas;
    };

    let bbox = det.bbox.rescale(frame, display);
    draw_box(&mut canvas, &bbox, style);

    if style.show_landmarks {
        if let Some(ref lm) = det.landmarks {
            for &(x, y) in lm.rescale(frame, display).points() {
                draw_filled_circle_mut(
                    &mut canvas,
                    (x.round() as i32, y.round() as i32),
                    style.landmark_radius,
                    style.landmark_color,
                );
            }
        }
    }
    canvas
}

fn draw_box(canvas: &mut RgbaImage, bbox: &BoundingBox, style: &OverlayStyle) {
    let Some(rect) = bbox.to_pixel_rect(canvas.width(), canvas.height()) else {
        return;
    };
    // Concentric outlines, shrinking inward.
    for i in 0..style.box_thickness {
        if rect.width <= 2 * i || rect.height <= 2 * i {
            break;
        }
        let r = Rect::at((rect.x + i) as i32, (rect.y + i) as i32)
            .of_size(rect.width - 2 * i, rect.height - 2 * i);
        draw_hollow_rect_mut(canvas, r, style.box_color);
    }
}

/// Paints `overlay` over an opaque copy of `frame`.
pub fn composite(frame: &Frame, overlay: &RgbaImage) -> Option<RgbaImage> {
    let mut base = frame.to_rgba_image()?;
    image::imageops::overlay(&mut base, overlay, 0, 0);
    Some(base)
}

/// The mount point for the overlay canvas.
///
/// Holds at most one canvas; mounting replaces the previous one.
#[derive(Debug, Default)]
pub struct OverlayContainer {
    canvas: Option<RgbaImage>,
    generation: u64,
}

impl OverlayContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&mut self, canvas: RgbaImage) {
        self.canvas = Some(canvas);
        self.generation += 1;
    }

    pub fn clear(&mut self) {
        self.canvas = None;
    }

    pub fn canvas(&self) -> Option<&RgbaImage> {
        self.canvas.as_ref()
    }

    /// Count of canvases mounted so far; lets renderers skip unchanged frames.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_landmarks::{FaceLandmarks, NUM_LANDMARKS};

    fn detection(x: f64, y: f64, w: f64, h: f64) -> Detection {
        Detection::new(BoundingBox::new(x, y, w, h), 0.9)
    }

    fn is_clear(px: &Rgba<u8>) -> bool {
        px[3] == 0
    }

    #[test]
    fn test_no_detection_gives_transparent_canvas() {
        let canvas = render_overlay((64, 48), (64, 48), None, &OverlayStyle::default());

        assert_eq!(canvas.dimensions(), (64, 48));
        assert!(canvas.pixels().all(is_clear));
    }

    #[test]
    fn test_box_outline_is_drawn() {
        let style = OverlayStyle::default();
        let det = detection(10.0, 10.0, 20.0, 20.0);

        let canvas = render_overlay((64, 48), (64, 48), Some(&det), &style);

        assert_eq!(canvas.get_pixel(10, 10), &style.box_color);
        assert_eq!(canvas.get_pixel(11, 11), &style.box_color);
        assert_eq!(canvas.get_pixel(29, 20), &style.box_color);
        assert!(is_clear(canvas.get_pixel(20, 20)));
        assert!(is_clear(canvas.get_pixel(5, 5)));
    }

    #[test]
    fn test_box_rescaled_to_display() {
        let style = OverlayStyle {
            box_thickness: 1,
            ..OverlayStyle::default()
        };
        let det = detection(10.0, 10.0, 20.0, 20.0);

        let canvas = render_overlay((128, 96), (64, 48), Some(&det), &style);

        assert_eq!(canvas.get_pixel(20, 20), &style.box_color);
        assert!(is_clear(canvas.get_pixel(10, 10)));
    }

    #[test]
    fn test_landmarks_follow_toggle() {
        let mut det = detection(10.0, 10.0, 20.0, 20.0);
        det.landmarks = FaceLandmarks::new(vec![(40.0, 30.0); NUM_LANDMARKS]);
        let mut style = OverlayStyle::default();

        let shown = render_overlay((64, 48), (64, 48), Some(&det), &style);
        style.show_landmarks = false;
        let hidden = render_overlay((64, 48), (64, 48), Some(&det), &style);

        assert_eq!(shown.get_pixel(40, 30), &style.landmark_color);
        assert!(is_clear(hidden.get_pixel(40, 30)));
    }

    #[test]
    fn test_degenerate_box_draws_nothing() {
        let det = detection(70.0, 70.0, 5.0, 5.0);
        let canvas = render_overlay((64, 48), (64, 48), Some(&det), &OverlayStyle::default());
        assert!(canvas.pixels().all(is_clear));
    }

    #[test]
    fn test_composite_keeps_frame_under_clear_pixels() {
        let frame = Frame::new(vec![200u8; 8 * 8 * 3], 8, 8, 3, 0);
        let mut overlay = RgbaImage::new(8, 8);
        overlay.put_pixel(1, 1, Rgba([255, 0, 0, 255]));

        let out = composite(&frame, &overlay).unwrap();

        let under = out.get_pixel(0, 0);
        assert_eq!(under[3], 255);
        assert!((under[0] as i32 - 200).abs() <= 1);
        assert_eq!(out.get_pixel(1, 1), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_container_replaces_and_clears() {
        let mut container = OverlayContainer::new();
        container.mount(RgbaImage::new(4, 4));
        container.mount(RgbaImage::new(8, 8));

        assert_eq!(container.generation(), 2);
        assert_eq!(container.canvas().map(|c| c.dimensions()), Some((8, 8)));

        container.clear();
        assert!(container.canvas().is_none());
    }
}
