//! Drawing detection boxes onto frames.

use crate::source::types::{BoundingBox, Detection};
use image::{Rgb, RgbImage};

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: u32 = 2;

/// Copy `image` and outline every detection on the copy.
pub fn annotate(image: &RgbImage, detections: &[Detection]) -> RgbImage {
    let mut out = image.clone();
    for detection in detections {
        draw_box(&mut out, &detection.bbox);
    }
    out
}

fn draw_box(image: &mut RgbImage, bbox: &BoundingBox) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    let clamp_x = |v: f32| (v.max(0.0) as u32).min(width - 1);
    let clamp_y = |v: f32| (v.max(0.0) as u32).min(height - 1);
    let (x1, x2) = (clamp_x(bbox.x1.min(bbox.x2)), clamp_x(bbox.x1.max(bbox.x2)));
    let (y1, y2) = (clamp_y(bbox.y1.min(bbox.y2)), clamp_y(bbox.y1.max(bbox.y2)));

    for t in 0..BOX_THICKNESS {
        for x in x1..=x2 {
            image.put_pixel(x, (y1 + t).min(y2), BOX_COLOR);
            image.put_pixel(x, y2.saturating_sub(t).max(y1), BOX_COLOR);
        }
        for y in y1..=y2 {
            image.put_pixel((x1 + t).min(x2), y, BOX_COLOR);
            image.put_pixel(x2.saturating_sub(t).max(x1), y, BOX_COLOR);
        }
    }
}
