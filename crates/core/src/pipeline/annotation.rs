use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::shared::detection::Detection;

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const BOX_THICKNESS: u32 = 2;

/// Draws a rectangle outline per detection onto `image`.
///
/// Each outline is `BOX_THICKNESS` concentric one-pixel rectangles growing
/// inward; parts outside the image are clipped.
pub fn annotate(image: &mut RgbImage, detections: &[Detection]) {
    for d in detections.iter().filter(|d| d.is_valid()) {
        for inset in 0..BOX_THICKNESS as i32 {
            let (w, h) = (d.width - 2 * inset, d.height - 2 * inset);
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(d.x + inset, d.y + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(image, rect, BOX_COLOR);
        }
    }
}
