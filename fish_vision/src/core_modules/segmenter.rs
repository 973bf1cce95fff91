// THEORY:
// The `Segmenter` is the first analytical layer. It turns a color frame into a
// binary mask of "fish-colored" pixels and cleans that mask so that the blob
// layer sees one solid region instead of a spray of speckles.
//
// Algorithm steps:
// 1.  **Normalize**: Resize to the canonical working resolution. Aspect ratio is
//     not preserved; every downstream coordinate is in working-frame pixels.
// 2.  **Threshold**: Convert each pixel to 8-bit HSV and test it against the
//     configured `ColorRange` (inclusive on all three channels).
// 3.  **Close**: Dilate the mask `iterations` times, then erode it the same number
//     of times, with a disk-shaped structuring element. This bridges thin gaps
//     (fins, specular glints) and removes isolated holes without shifting the
//     outer boundary of large regions.
//
// The segmenter is a stateless utility: no error conditions, no memory between
// frames. An all-zero mask is a perfectly valid output.

use crate::core_modules::color_range::{ColorRange, Hsv};
use crate::core_modules::frame::{FRAME_HEIGHT, FRAME_WIDTH};
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, erode};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Mask value for a pixel inside the color range.
pub const FOREGROUND: u8 = 255;

/// A binary raster, `FOREGROUND` or 0.
pub type Mask = GrayImage;

/// Shape of the morphological closing applied to every mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Closing {
    /// Full extent of the elliptical structuring element in pixels (odd).
    pub kernel_size: u8,
    /// How many times each of dilation and erosion is applied.
    pub iterations: u32,
}

impl Default for Closing {
    fn default() -> Self {
        Self {
            kernel_size: 5,
            iterations: 3,
        }
    }
}

impl Closing {
    /// Euclidean radius of the disk matching `kernel_size`.
    fn radius(&self) -> u8 {
        self.kernel_size / 2
    }

    pub fn apply(&self, mask: &Mask) -> Mask {
        let radius = self.radius();
        if radius == 0 || self.iterations == 0 {
            return mask.clone();
        }
        let mut closed = mask.clone();
        for _ in 0..self.iterations {
            closed = dilate(&closed, Norm::L2, radius);
        }
        for _ in 0..self.iterations {
            closed = erode(&closed, Norm::L2, radius);
        }
        closed
    }
}

/// Brings any frame to the working resolution.
pub fn normalize(image: &RgbImage) -> Cow<'_, RgbImage> {
    if image.dimensions() == (FRAME_WIDTH, FRAME_HEIGHT) {
        Cow::Borrowed(image)
    } else {
        Cow::Owned(imageops::resize(image, FRAME_WIDTH, FRAME_HEIGHT, FilterType::Triangle))
    }
}

/// Raw in-range test, no cleanup.
pub fn threshold(image: &RgbImage, range: &ColorRange) -> Mask {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        if range.contains(Hsv::from_rgb(r, g, b)) {
            Luma([FOREGROUND])
        } else {
            Luma([0])
        }
    })
}

/// Thresholds an already-normalized frame and closes the result.
pub fn segment_normalized(image: &RgbImage, range: &ColorRange, closing: &Closing) -> Mask {
    closing.apply(&threshold(image, range))
}

/// Full segmentation: resize, threshold, close.
pub fn segment(image: &RgbImage, range: &ColorRange, closing: &Closing) -> Mask {
    segment_normalized(&normalize(image), range, closing)
}

/// True when no pixel survived segmentation.
pub fn is_empty(mask: &Mask) -> bool {
    mask.as_raw().iter().all(|&v| v == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    const ORANGE: Rgb<u8> = Rgb([255, 100, 0]);

    #[test]
    fn output_is_always_working_resolution() {
        let small = RgbImage::new(320, 240);
        let mask = segment(&small, &ColorRange::default(), &Closing::default());
        assert_eq!(mask.dimensions(), (FRAME_WIDTH, FRAME_HEIGHT));
        assert!(is_empty(&mask));
    }

    #[test]
    fn only_in_range_pixels_are_set() {
        let mut image = RgbImage::new(FRAME_WIDTH, FRAME_HEIGHT);
        draw_filled_rect_mut(&mut image, Rect::at(100, 100).of_size(50, 40), ORANGE);
        draw_filled_rect_mut(&mut image, Rect::at(400, 300).of_size(50, 40), Rgb([0, 0, 255]));

        let mask = threshold(&image, &ColorRange::default());
        assert_eq!(mask.get_pixel(120, 120).0, [FOREGROUND]);
        assert_eq!(mask.get_pixel(420, 320).0, [0]);
        assert_eq!(mask.get_pixel(10, 10).0, [0]);
        let set = mask.as_raw().iter().filter(|&&v| v == FOREGROUND).count();
        assert_eq!(set, 50 * 40);
    }

    #[test]
    fn closing_bridges_a_thin_gap() {
        let mut image = RgbImage::new(FRAME_WIDTH, FRAME_HEIGHT);
        draw_filled_rect_mut(&mut image, Rect::at(100, 100).of_size(60, 40), ORANGE);
        draw_filled_rect_mut(&mut image, Rect::at(162, 100).of_size(60, 40), ORANGE);

        let raw = threshold(&image, &ColorRange::default());
        assert_eq!(raw.get_pixel(160, 120).0, [0]);

        let closed = Closing::default().apply(&raw);
        assert_eq!(closed.get_pixel(160, 120).0, [FOREGROUND]);
        assert_eq!(closed.get_pixel(161, 120).0, [FOREGROUND]);
        // Far from the blob nothing appears.
        assert_eq!(closed.get_pixel(400, 400).0, [0]);
    }

    #[test]
    fn closing_keeps_the_outline_of_a_solid_block() {
        let mut image = RgbImage::new(FRAME_WIDTH, FRAME_HEIGHT);
        draw_filled_rect_mut(&mut image, Rect::at(200, 200).of_size(80, 40), ORANGE);

        let closed = segment(&image, &ColorRange::default(), &Closing::default());
        assert_eq!(closed.get_pixel(200, 220).0, [FOREGROUND]);
        assert_eq!(closed.get_pixel(279, 220).0, [FOREGROUND]);
        assert_eq!(closed.get_pixel(190, 220).0, [0]);
        assert_eq!(closed.get_pixel(290, 220).0, [0]);
    }
}
