// THEORY:
// The `OrientationEstimator` turns the selected boundary into the structured
// `Detection` that the control loop and the batch aggregator consume.
//
// Algorithm steps:
// 1.  **Hull**: The convex hull of the contour smooths away fin notches and tail
//     forks, leaving the extreme points that define the body's reach.
// 2.  **Box**: The axis-aligned bounding box of the hull gives the blob's extent
//     and, through `x + w/2, y + h/2`, its reported center.
// 3.  **Axis**: If the box is wider than tall the body is taken to lie along x,
//     otherwise along y. A perfect square falls to the vertical branch.
// 4.  **Landmarks**: Along the chosen axis the hull point with the largest
//     coordinate is the head and the one with the smallest is the tail. When
//     several hull points share an extreme, the first in hull order wins.
// 5.  **Heading**: `atan2` of the tail-to-head vector, in degrees, in (-180, 180].
//     Image y grows downward, so a positive heading points below the x axis.
//
// Known limitation: the axis heuristic assumes the blob's long side is the body
// axis. Near-square blobs and curled postures produce an arbitrary head/tail
// assignment; that is reported as-is rather than guessed around.

use crate::core_modules::blob_selector::Contour;
use crate::core_modules::geometry::{BoundingBox, PixelPoint};
use imageproc::geometry::convex_hull;

/// The dominant axis of a detected blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Wider than tall: head and tail are the x extremes.
    Horizontal,
    /// Taller than wide, or square: head and tail are the y extremes.
    Vertical,
}

impl Orientation {
    pub fn from_aspect_ratio(aspect_ratio: f64) -> Self {
        if aspect_ratio > 1.0 {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }

    /// `(head, tail)` along this axis, `None` for an empty hull.
    pub fn landmarks(&self, hull: &[PixelPoint]) -> Option<(PixelPoint, PixelPoint)> {
        let coordinate = |p: &PixelPoint| match self {
            Orientation::Horizontal => p.x,
            Orientation::Vertical => p.y,
        };
        let head = first_extreme(hull, |candidate, best| coordinate(candidate) > coordinate(best))?;
        let tail = first_extreme(hull, |candidate, best| coordinate(candidate) < coordinate(best))?;
        Some((head, tail))
    }
}

/// Scans `points` in order and keeps a candidate only when it strictly beats
/// the current best, so the earliest extreme survives ties.
fn first_extreme(
    points: &[PixelPoint],
    beats: impl Fn(&PixelPoint, &PixelPoint) -> bool,
) -> Option<PixelPoint> {
    points
        .iter()
        .copied()
        .reduce(|best, candidate| if beats(&candidate, &best) { candidate } else { best })
}

/// The structured result of one successful perception cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bounding_box: BoundingBox,
    pub head: PixelPoint,
    pub tail: PixelPoint,
    /// Angle of the tail-to-head vector against +x, in degrees, (-180, 180].
    pub heading_degrees: f64,
    pub center: PixelPoint,
    pub orientation: Orientation,
    pub hull: Vec<PixelPoint>,
}

/// Geometry that cannot carry an orientation. Callers treat both as "no fish".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EstimateError {
    #[error("contour has no points")]
    EmptyContour,
    #[error("degenerate bounding box {width}x{height}")]
    DegenerateGeometry { width: i32, height: i32 },
}

/// Signed angle of `head - tail` in degrees, normalized to (-180, 180].
pub fn heading_degrees(head: PixelPoint, tail: PixelPoint) -> f64 {
    let dx = f64::from(head.x - tail.x);
    let dy = f64::from(head.y - tail.y);
    let degrees = dy.atan2(dx).to_degrees();
    if degrees <= -180.0 { degrees + 360.0 } else { degrees }
}

/// Convex hull that tolerates the one- and two-point boundaries traced around
/// hairline blobs.
pub fn hull_of(points: &[PixelPoint]) -> Vec<PixelPoint> {
    if points.len() < 3 {
        let mut hull = points.to_vec();
        hull.dedup();
        return hull;
    }
    convex_hull(points)
}

pub fn estimate(contour: &Contour) -> Result<Detection, EstimateError> {
    if contour.is_empty() {
        return Err(EstimateError::EmptyContour);
    }

    let hull = hull_of(contour.points());
    let bounding_box = BoundingBox::enclosing(&hull).ok_or(EstimateError::EmptyContour)?;
    let aspect_ratio = bounding_box
        .aspect_ratio()
        .ok_or(EstimateError::DegenerateGeometry {
            width: bounding_box.width,
            height: bounding_box.height,
        })?;

    let orientation = Orientation::from_aspect_ratio(aspect_ratio);
    let (head, tail) = orientation.landmarks(&hull).ok_or(EstimateError::EmptyContour)?;

    Ok(Detection {
        bounding_box,
        head,
        tail,
        heading_degrees: heading_degrees(head, tail),
        center: bounding_box.center(),
        orientation,
        hull,
    })
}
