//! Straight line segment.

use super::{ShapeId, ShapeMeta, ShapeStyle, ShapeTrait, point_to_segment_dist};
use kurbo::{Affine, BezPath, Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub(crate) id: ShapeId,
    pub start: Point,
    pub end: Point,
    pub style: ShapeStyle,
    #[serde(default)]
    pub meta: ShapeMeta,
}

impl Line {
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            start,
            end,
            style: ShapeStyle::default(),
            meta: ShapeMeta::default(),
        }
    }

    pub fn length(&self) -> f64 {
        (self.end - self.start).hypot()
    }

    pub fn midpoint(&self) -> Point {
        self.start.midpoint(self.end)
    }
}

impl ShapeTrait for Line {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        Rect::from_points(self.start, self.end)
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        point_to_segment_dist(point, self.start, self.end)
            <= tolerance + self.style.stroke_width / 2.0
    }

    fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(self.start);
        path.line_to(self.end);
        path
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn meta(&self) -> &ShapeMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ShapeMeta {
        &mut self.meta
    }

    fn transform(&mut self, affine: Affine) {
        self.start = affine * self.start;
        self.end = affine * self.end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_geometry() {
        let line = Line::new(Point::new(0.0, 0.0), Point::new(30.0, 40.0));
        assert_eq!(line.length(), 50.0);
        assert_eq!(line.midpoint(), Point::new(15.0, 20.0));
        assert_eq!(line.bounds(), Rect::new(0.0, 0.0, 30.0, 40.0));
    }

    #[test]
    fn test_hit_test_uses_segment_distance() {
        let line = Line::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        assert!(line.hit_test(Point::new(50.0, 2.0), 2.0));
        assert!(!line.hit_test(Point::new(50.0, 10.0), 2.0));
    }
}
