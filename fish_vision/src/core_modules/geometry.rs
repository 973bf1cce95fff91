// THEORY:
// Small integer geometry shared by the blob and orientation layers. Points are
// `imageproc` points so contours and hulls flow between the two crates without
// conversion. Extents are inclusive pixel counts: a blob that covers columns
// 10 through 49 has width 40.

use imageproc::point::Point;

/// An integer pixel coordinate. `y` grows downward.
pub type PixelPoint = Point<i32>;

/// An axis-aligned box, top-left corner plus inclusive extents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    /// The tightest box around `points`, or `None` for an empty slice.
    pub fn enclosing(points: &[PixelPoint]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        })
    }

    /// Width over height, or `None` when the box has no height.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.height <= 0 {
            return None;
        }
        Some(f64::from(self.width) / f64::from(self.height))
    }

    /// Box centroid with floor division on the extents.
    pub fn center(&self) -> PixelPoint {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// Absolute enclosed area of a closed polygon (shoelace formula).
pub fn polygon_area(points: &[PixelPoint]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y))
        .sum();
    twice.abs() as f64 / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enclosing_box_uses_inclusive_extents() {
        let points = [Point::new(10, 20), Point::new(49, 20), Point::new(49, 39), Point::new(10, 39)];
        let bbox = BoundingBox::enclosing(&points).unwrap();
        assert_eq!(bbox, BoundingBox { x: 10, y: 20, width: 40, height: 20 });
        assert_eq!(bbox.center(), Point::new(30, 30));
        assert_eq!(bbox.aspect_ratio(), Some(2.0));
    }

    #[test]
    fn empty_point_set_has_no_box() {
        assert_eq!(BoundingBox::enclosing(&[]), None);
    }

    #[test]
    fn zero_height_box_has_no_aspect_ratio() {
        let bbox = BoundingBox { x: 0, y: 0, width: 5, height: 0 };
        assert_eq!(bbox.aspect_ratio(), None);
    }

    #[test]
    fn shoelace_area_ignores_winding() {
        let square = [Point::new(0, 0), Point::new(4, 0), Point::new(4, 4), Point::new(0, 4)];
        let mut reversed = square;
        reversed.reverse();
        assert_eq!(polygon_area(&square), 16.0);
        assert_eq!(polygon_area(&reversed), 16.0);
        assert_eq!(polygon_area(&square[..2]), 0.0);
    }
}
