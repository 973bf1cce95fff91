// THEORY:
// Overlays a `Detection` on its working frame so a human can check what the
// estimator decided: the hull's bounding box, the reported center, the head and
// tail landmarks, and an arrow from tail to head.

use crate::core_modules::geometry::PixelPoint;
use crate::core_modules::orientation::Detection;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const CENTER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const HEAD_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const TAIL_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const ARROW_COLOR: Rgb<u8> = Rgb([0, 255, 255]);

const BOX_THICKNESS: i32 = 2;
const ARROW_THICKNESS: i32 = 3;
const CENTER_RADIUS: i32 = 5;
const LANDMARK_RADIUS: i32 = 8;
/// Arrowhead barb length as a fraction of the shaft.
const TIP_LENGTH: f32 = 0.2;

/// Draws every overlay for `detection` onto `image` in place.
pub fn annotate(image: &mut RgbImage, detection: &Detection) {
    let bbox = detection.bounding_box;
    for inset in 0..BOX_THICKNESS {
        let width = bbox.width - 2 * inset;
        let height = bbox.height - 2 * inset;
        if width <= 0 || height <= 0 {
            break;
        }
        let rect = Rect::at(bbox.x + inset, bbox.y + inset).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(image, rect, BOX_COLOR);
    }

    draw_filled_circle_mut(image, (detection.center.x, detection.center.y), CENTER_RADIUS, CENTER_COLOR);
    draw_filled_circle_mut(image, (detection.head.x, detection.head.y), LANDMARK_RADIUS, HEAD_COLOR);
    draw_filled_circle_mut(image, (detection.tail.x, detection.tail.y), LANDMARK_RADIUS, TAIL_COLOR);

    draw_arrow(image, detection.tail, detection.head, ARROW_COLOR);
}

/// A thick shaft plus two barbs at `to`. Nothing is drawn when the points coincide.
fn draw_arrow(image: &mut RgbImage, from: PixelPoint, to: PixelPoint, color: Rgb<u8>) {
    let (fx, fy) = (from.x as f32, from.y as f32);
    let (tx, ty) = (to.x as f32, to.y as f32);
    let (dx, dy) = (tx - fx, ty - fy);
    let length = (dx * dx + dy * dy).sqrt();
    if length == 0.0 {
        return;
    }

    // Unit normal, used to fatten strokes.
    let (nx, ny) = (-dy / length, dx / length);
    let barb = length * TIP_LENGTH;
    let angle = dy.atan2(dx);
    let barbs = [angle + std::f32::consts::FRAC_PI_6, angle - std::f32::consts::FRAC_PI_6]
        .map(|a| (tx - barb * a.cos(), ty - barb * a.sin()));

    let half = (ARROW_THICKNESS / 2) as f32;
    let mut offset = -half;
    while offset <= half {
        let (ox, oy) = (nx * offset, ny * offset);
        draw_line_segment_mut(image, (fx + ox, fy + oy), (tx + ox, ty + oy), color);
        for (bx, by) in barbs {
            draw_line_segment_mut(image, (tx + ox, ty + oy), (bx + ox, by + oy), color);
        }
        offset += 1.0;
    }
}
