//! Rectangle shape.

use super::{ShapeId, ShapeMeta, ShapeStyle, ShapeTrait};
use kurbo::{Affine, BezPath, Point, Rect, RoundedRect, Shape as KurboShape};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A rectangle with optional rounded corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub(crate) id: ShapeId,
    /// Top-left corner position.
    pub position: Point,
    pub width: f64,
    pub height: f64,
    /// Corner radius (0 = sharp corners).
    #[serde(default)]
    pub corner_radius: f64,
    /// Rotation angle in radians (around center).
    #[serde(default)]
    pub rotation: f64,
    pub style: ShapeStyle,
    #[serde(default)]
    pub meta: ShapeMeta,
}

impl Rectangle {
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            width,
            height,
            corner_radius: 0.0,
            rotation: 0.0,
            style: ShapeStyle::default(),
            meta: ShapeMeta::default(),
        }
    }

    /// Create a rectangle from two corner points.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        let rect = Rect::from_points(p1, p2);
        Self::new(rect.origin(), rect.width(), rect.height())
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self::from_corners(Point::new(rect.x0, rect.y0), Point::new(rect.x1, rect.y1))
    }

    pub fn as_rect(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + self.width,
            self.position.y + self.height,
        )
    }
}

impl ShapeTrait for Rectangle {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.as_rect()
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let rect = self.as_rect();
        if self.style.fill_color.is_some() {
            rect.inflate(tolerance, tolerance).contains(point)
        } else {
            // Outline only: hit on the border
            let band = tolerance + self.style.stroke_width / 2.0;
            let outer = rect.inflate(band, band);
            let inner = rect.inflate(-band, -band);
            outer.contains(point) && !inner.contains(point)
        }
    }

    fn to_path(&self) -> BezPath {
        if self.corner_radius > 0.0 {
            RoundedRect::from_rect(self.as_rect(), self.corner_radius).to_path(0.1)
        } else {
            self.as_rect().to_path(0.1)
        }
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
        // Axis-aligned transforms only; rotation lives in `rotation`.
        let rect = affine.transform_rect_bbox(self.as_rect());
        self.position = rect.origin();
        self.width = rect.width();
        self.height = rect.height();
    }
}
