// THEORY:
// The `BlobSelector` is the Spatial Grouping Layer. It takes the cleaned mask from
// the segmenter and reduces it to exactly one candidate object, or to nothing.
//
// Key architectural principles:
// 1.  **Outer boundaries only**: Border following yields both outer borders and the
//     borders of holes. The fish is assumed to be one solid region, so holes (and
//     anything nested inside them) are discarded. What remains is one closed
//     boundary per connected region.
// 2.  **Largest wins**: Among the outer boundaries the one enclosing the largest
//     area is kept. Ties go to the first boundary in raster-scan order, which is
//     deterministic for a given mask but carries no geometric meaning.
// 3.  **Absence is a value**: An empty mask or a mask without boundaries yields
//     `None`. That is the normal "fish not in view" signal, not an error.

use crate::core_modules::geometry::{BoundingBox, PixelPoint, polygon_area};
use crate::core_modules::segmenter::Mask;
use imageproc::contours::{self, BorderType};

/// A closed outer boundary traced around one connected region of the mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    points: Vec<PixelPoint>,
}

impl Contour {
    pub fn new(points: Vec<PixelPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[PixelPoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Area enclosed by the boundary polygon.
    pub fn area(&self) -> f64 {
        polygon_area(&self.points)
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::enclosing(&self.points)
    }
}

/// Every outermost boundary in the mask, in raster-scan order.
pub fn external_contours(mask: &Mask) -> Vec<Contour> {
    contours::find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| Contour::new(c.points))
        .collect()
}

/// The outer boundary with the largest enclosed area, first one on ties.
pub fn select(mask: &Mask) -> Option<Contour> {
    largest(external_contours(mask))
}

/// Picks the maximum-area contour, keeping the earliest on ties.
pub fn largest(candidates: Vec<Contour>) -> Option<Contour> {
    let mut best: Option<(f64, Contour)> = None;
    for contour in candidates {
        let area = contour.area();
        match &best {
            Some((best_area, _)) if area <= *best_area => {}
            _ => best = Some((area, contour)),
        }
    }
    best.map(|(_, contour)| contour)
}
