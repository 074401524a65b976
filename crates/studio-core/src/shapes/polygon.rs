//! Closed polygon shape (regular n-gons, stars of points, triangles).

use super::{
    ShapeId, ShapeMeta, ShapeStyle, ShapeTrait, point_to_polyline_dist, points_bounds,
};
use kurbo::{Affine, BezPath, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, TAU};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub(crate) id: ShapeId,
    /// Vertices in drawing order. The outline always closes.
    pub points: Vec<Point>,
    pub style: ShapeStyle,
    #[serde(default)]
    pub meta: ShapeMeta,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            id: Uuid::new_v4(),
            points,
            style: ShapeStyle::default(),
            meta: ShapeMeta::default(),
        }
    }

    /// Regular polygon with `sides` vertices, first vertex pointing up.
    pub fn regular(center: Point, radius: f64, sides: usize) -> Self {
        let sides = sides.max(3);
        let points = (0..sides)
            .map(|i| {
                let angle = -FRAC_PI_2 + TAU * i as f64 / sides as f64;
                Point::new(
                    center.x + radius * angle.cos(),
                    center.y + radius * angle.sin(),
                )
            })
            .collect();
        Self::new(points)
    }

    /// Regular polygon inscribed in a drag rectangle.
    pub fn in_rect(rect: Rect, sides: usize) -> Self {
        let radius = rect.width().min(rect.height()) / 2.0;
        Self::regular(rect.center(), radius, sides)
    }

    fn closed_points(&self) -> Vec<Point> {
        let mut pts = self.points.clone();
        if let Some(first) = self.points.first() {
            pts.push(*first);
        }
        pts
    }
}

impl ShapeTrait for Polygon {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        points_bounds(&self.points)
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        if self.style.fill_color.is_some() && self.to_path().winding(point) != 0 {
            return true;
        }
        point_to_polyline_dist(point, &self.closed_points())
            <= tolerance + self.style.stroke_width / 2.0
    }

    fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        let mut iter = self.points.iter();
        if let Some(first) = iter.next() {
            path.move_to(*first);
            for p in iter {
                path.line_to(*p);
            }
            path.close_path();
        }
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
        for p in &mut self.points {
            *p = affine * *p;
        }
    }
}
